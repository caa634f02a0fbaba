//! Seeded random search over gbdt parameters, scored by k-fold RMSE.

use anyhow::{anyhow, ensure};
use gbdt::config::Config;
use gbdt::gradient_boost::GBDT;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cv::{rmse, Fold};
use super::dataset::Dataset;
use crate::model::GbdtFareModel;
use crate::request::FEATURE_COUNT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub max_depth: u32,
    pub iterations: usize,
    pub shrinkage: f32,
    pub min_leaf_size: usize,
    pub data_sample_ratio: f64,
    pub feature_sample_ratio: f64,
}

impl BoosterParams {
    pub fn to_config(&self) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(FEATURE_COUNT);
        cfg.set_loss("SquaredError");
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(self.iterations);
        cfg.set_shrinkage(self.shrinkage);
        cfg.set_min_leaf_size(self.min_leaf_size);
        cfg.set_data_sample_ratio(self.data_sample_ratio);
        cfg.set_feature_sample_ratio(self.feature_sample_ratio);
        cfg
    }

    pub fn fit(&self, dataset: &Dataset, indices: &[usize]) -> GbdtFareModel {
        let mut data = dataset.training_data(indices);
        let mut gbdt = GBDT::new(&self.to_config());
        gbdt.fit(&mut data);
        GbdtFareModel::from_gbdt(gbdt)
    }

    /// Fits on `fit_on` and returns the RMSE over `score_on`.
    pub fn score(
        &self,
        dataset: &Dataset,
        fit_on: &[usize],
        score_on: &[usize],
    ) -> anyhow::Result<f64> {
        let model = self.fit(dataset, fit_on);
        evaluate(&model, dataset, score_on)
    }
}

pub fn evaluate(
    model: &GbdtFareModel,
    dataset: &Dataset,
    indices: &[usize],
) -> anyhow::Result<f64> {
    let predicted = model.predict_batch(&dataset.test_data(indices))?;
    Ok(rmse(&predicted, &dataset.targets(indices)))
}

/// Inclusive bounds for each searched parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub max_depth: (u32, u32),
    pub iterations: (usize, usize),
    /// Sampled log-uniformly.
    pub shrinkage: (f32, f32),
    pub min_leaf_size: (usize, usize),
    /// gbdt draws its row and feature samples from an unseeded source, so
    /// both ratios must stay at 1.0 for a search to be reproducible.
    pub data_sample_ratio: (f64, f64),
    pub feature_sample_ratio: (f64, f64),
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            max_depth: (3, 8),
            iterations: (50, 300),
            shrinkage: (0.01, 0.3),
            min_leaf_size: (10, 100),
            data_sample_ratio: (1.0, 1.0),
            feature_sample_ratio: (1.0, 1.0),
        }
    }
}

impl SearchSpace {
    pub fn check(&self) -> anyhow::Result<()> {
        let (lo, hi) = self.max_depth;
        ensure!(lo >= 1 && lo <= hi, "bad max_depth bounds ({lo}, {hi})");
        let (lo, hi) = self.iterations;
        ensure!(lo >= 1 && lo <= hi, "bad iterations bounds ({lo}, {hi})");
        let (lo, hi) = self.shrinkage;
        ensure!(lo > 0.0 && lo <= hi, "bad shrinkage bounds ({lo}, {hi})");
        let (lo, hi) = self.min_leaf_size;
        ensure!(lo >= 1 && lo <= hi, "bad min_leaf_size bounds ({lo}, {hi})");
        for (name, (lo, hi)) in [
            ("data_sample_ratio", self.data_sample_ratio),
            ("feature_sample_ratio", self.feature_sample_ratio),
        ] {
            ensure!(
                lo == 1.0 && hi == 1.0,
                "{name} must be (1.0, 1.0), got ({lo}, {hi}); gbdt sampling is not seeded"
            );
        }
        Ok(())
    }

    pub fn sample(&self, rng: &mut impl Rng) -> BoosterParams {
        let (lo, hi) = self.shrinkage;
        BoosterParams {
            max_depth: rng.gen_range(self.max_depth.0..=self.max_depth.1),
            iterations: rng.gen_range(self.iterations.0..=self.iterations.1),
            shrinkage: rng.gen_range(lo.ln()..=hi.ln()).exp(),
            min_leaf_size: rng.gen_range(self.min_leaf_size.0..=self.min_leaf_size.1),
            data_sample_ratio: rng
                .gen_range(self.data_sample_ratio.0..=self.data_sample_ratio.1),
            feature_sample_ratio: rng
                .gen_range(self.feature_sample_ratio.0..=self.feature_sample_ratio.1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Trial {
    pub number: usize,
    pub params: BoosterParams,
    pub fold_rmse: Vec<f64>,
    pub mean_rmse: f64,
}

#[derive(Debug, Serialize)]
pub struct Study {
    pub trials: Vec<Trial>,
    best: usize,
}

impl Study {
    pub fn best(&self) -> &Trial {
        &self.trials[self.best]
    }
}

/// Mean validation RMSE across `folds`.
pub fn cross_validate(
    dataset: &Dataset,
    params: &BoosterParams,
    folds: &[Fold],
) -> anyhow::Result<Vec<f64>> {
    folds
        .iter()
        .map(|fold| params.score(dataset, &fold.train, &fold.valid))
        .collect()
}

/// Runs `n_trials` sampled parameter sets and keeps the lowest mean RMSE.
pub fn random_search(
    dataset: &Dataset,
    space: &SearchSpace,
    folds: &[Fold],
    n_trials: usize,
    seed: u64,
) -> anyhow::Result<Study> {
    ensure!(n_trials > 0, "need at least one trial");
    ensure!(!folds.is_empty(), "need at least one fold");
    space.check()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut trials = Vec::with_capacity(n_trials);
    for number in 0..n_trials {
        let params = space.sample(&mut rng);
        debug!(number, ?params, "trial started");
        let fold_rmse = cross_validate(dataset, &params, folds)?;
        let mean_rmse = fold_rmse.iter().sum::<f64>() / fold_rmse.len() as f64;
        info!(number, mean_rmse, "trial finished");
        trials.push(Trial {
            number,
            params,
            fold_rmse,
            mean_rmse,
        });
    }

    let best = trials
        .iter()
        .enumerate()
        .filter(|(_, t)| t.mean_rmse.is_finite())
        .min_by(|(_, a), (_, b)| a.mean_rmse.total_cmp(&b.mean_rmse))
        .map(|(i, _)| i)
        .ok_or_else(|| anyhow!("every trial produced a non-finite RMSE"))?;
    info!(
        best = trials[best].number,
        rmse = trials[best].mean_rmse,
        "search finished"
    );
    Ok(Study { trials, best })
}

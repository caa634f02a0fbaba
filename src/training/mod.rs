//! Offline training: CSV in, tuned gbdt artifact out.

pub mod cv;
pub mod dataset;
pub mod search;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, ensure, Context};
use serde::{Deserialize, Serialize};
use tracing::info;

use self::cv::{holdout_split, KFold};
use self::dataset::Dataset;
use self::search::{evaluate, random_search, BoosterParams, SearchSpace};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_path: PathBuf,
    pub max_rows: Option<usize>,
    pub n_trials: usize,
    pub n_folds: usize,
    pub seed: u64,
    /// Share of rows kept out of search and refit, scored at the end.
    pub holdout_fraction: Option<f64>,
    pub output_path: PathBuf,
    pub search_space: SearchSpace,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("taxi_data_log.csv"),
            max_rows: None,
            n_trials: 20,
            n_folds: 3,
            seed: 0,
            holdout_fraction: None,
            output_path: PathBuf::from("gbdt.model"),
            search_space: SearchSpace::default(),
        }
    }
}

impl TrainConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read training config {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid training config {}", path.display()))
    }
}

#[derive(Debug, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub trials: usize,
    pub best_params: BoosterParams,
    pub best_cv_rmse: f64,
    /// RMSE of the refit model on the rows it was trained on.
    pub train_rmse: f64,
    pub holdout_rmse: Option<f64>,
    pub output_path: PathBuf,
}

pub fn run(config: &TrainConfig) -> anyhow::Result<TrainingReport> {
    let dataset = Dataset::from_csv(&config.data_path, config.max_rows)?;
    train(&dataset, config)
}

/// Search, refit on every non-holdout row, score, save.
pub fn train(dataset: &Dataset, config: &TrainConfig) -> anyhow::Result<TrainingReport> {
    ensure!(!dataset.is_empty(), "no complete trip records to train on");

    let (fit_rows, holdout_rows) = match config.holdout_fraction {
        Some(fraction) => holdout_split(&dataset.indices(), fraction, config.seed)?,
        None => (dataset.indices(), Vec::new()),
    };

    let folds = KFold {
        n_splits: config.n_folds,
        shuffle: true,
        seed: config.seed,
    }
    .split(&fit_rows)?;
    let study = random_search(
        dataset,
        &config.search_space,
        &folds,
        config.n_trials,
        config.seed,
    )?;
    let best = study.best();

    let model = best.params.fit(dataset, &fit_rows);
    let train_rmse = evaluate(&model, dataset, &fit_rows)?;
    let holdout_rmse = if holdout_rows.is_empty() {
        None
    } else {
        Some(evaluate(&model, dataset, &holdout_rows)?)
    };
    info!(train_rmse, ?holdout_rmse, "refit finished");

    let output = config
        .output_path
        .to_str()
        .ok_or_else(|| anyhow!("output path {} is not UTF-8", config.output_path.display()))?;
    model
        .gbdt()
        .save_model(output)
        .map_err(|e| anyhow!("failed to save the model to {output}: {e}"))?;
    info!(path = output, "model saved");

    Ok(TrainingReport {
        rows: dataset.len(),
        trials: study.trials.len(),
        best_params: best.params.clone(),
        best_cv_rmse: best.mean_rmse,
        train_rmse,
        holdout_rmse,
        output_path: config.output_path.clone(),
    })
}

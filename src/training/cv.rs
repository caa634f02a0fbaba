use anyhow::ensure;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub valid: Vec<usize>,
}

/// K-fold splitter. The first `len % n_splits` folds get one extra row.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl KFold {
    pub fn split(&self, indices: &[usize]) -> anyhow::Result<Vec<Fold>> {
        ensure!(self.n_splits >= 2, "need at least 2 folds, got {}", self.n_splits);
        ensure!(
            indices.len() >= self.n_splits,
            "cannot split {} rows into {} folds",
            indices.len(),
            self.n_splits
        );

        let mut order = indices.to_vec();
        if self.shuffle {
            order.shuffle(&mut StdRng::seed_from_u64(self.seed));
        }

        let base = order.len() / self.n_splits;
        let extra = order.len() % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            let end = start + size;
            let valid = order[start..end].to_vec();
            let train = order[..start]
                .iter()
                .chain(&order[end..])
                .copied()
                .collect();
            folds.push(Fold { train, valid });
            start = end;
        }
        Ok(folds)
    }
}

/// Shuffles `indices` and carves off `fraction` of them as a test set.
pub fn holdout_split(
    indices: &[usize],
    fraction: f64,
    seed: u64,
) -> anyhow::Result<(Vec<usize>, Vec<usize>)> {
    ensure!(
        fraction > 0.0 && fraction < 1.0,
        "holdout fraction must be in (0, 1), got {fraction}"
    );
    let mut order = indices.to_vec();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = ((order.len() as f64) * fraction).ceil() as usize;
    ensure!(
        n_test < order.len(),
        "holdout of {fraction} leaves no training rows out of {}",
        order.len()
    );
    let train = order.split_off(n_test);
    Ok((train, order))
}

pub fn rmse(predicted: &[f32], actual: &[f32]) -> f64 {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return f64::NAN;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| {
            let d = f64::from(*p) - f64::from(*a);
            d * d
        })
        .sum();
    (sum / predicted.len() as f64).sqrt()
}

use std::path::Path;

use fare_server::telemetry;
use fare_server::training::{self, TrainConfig};
use tracing::info;

/// Usage: `fare-train [config.json]`
fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrainConfig::load(Path::new(&path))?,
        None => TrainConfig::default(),
    };
    info!(
        data = %config.data_path.display(),
        trials = config.n_trials,
        folds = config.n_folds,
        "training started"
    );

    let report = training::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

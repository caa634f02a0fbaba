use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, ensure};
use gbdt::decision_tree::{Data, DataVec, PredVec};
use gbdt::gradient_boost::GBDT;

use crate::error::ArtifactError;
use crate::request::FeatureRow;

/// A trained regression model: one feature row in, one fare out.
///
/// Implementations are immutable after construction and shared across
/// requests without locking.
pub trait FareModel: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> anyhow::Result<f64>;
}

/// Gradient boosted trees trained with the `gbdt` crate.
pub struct GbdtFareModel {
    model: GBDT,
}

// Representative input used to reject artifacts that decode but can't predict.
const WARMUP_ROW: FeatureRow = FeatureRow([1.0, 1.0, 1.0, 0.0, 12.0, 1.0]);

impl GbdtFareModel {
    pub fn from_gbdt(model: GBDT) -> Self {
        Self { model }
    }

    pub fn gbdt(&self) -> &GBDT {
        &self.model
    }

    /// Decodes a JSON artifact written by `GBDT::save_model` and runs a
    /// warmup prediction.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let model: GBDT = serde_json::from_slice(bytes)?;
        let model = Self::from_gbdt(model);
        model
            .predict(&WARMUP_ROW)
            .map_err(|e| ArtifactError::Malformed(e.to_string()))?;
        Ok(model)
    }

    pub fn predict_batch(&self, rows: &DataVec) -> anyhow::Result<PredVec> {
        panic::catch_unwind(AssertUnwindSafe(|| self.model.predict(rows)))
            .map_err(|cause| anyhow!("gbdt panicked: {}", panic_message(cause.as_ref())))
    }
}

impl FareModel for GbdtFareModel {
    fn predict(&self, row: &FeatureRow) -> anyhow::Result<f64> {
        let batch: DataVec = vec![Data::new_test_data(row.to_vec(), None)];
        let predicted = self.predict_batch(&batch)?;
        let value = *predicted
            .first()
            .ok_or_else(|| anyhow!("model returned no prediction"))?;
        ensure!(value.is_finite(), "model returned non-finite value {value}");
        Ok(f64::from(value))
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

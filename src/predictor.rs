use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FareError;
use crate::model::FareModel;
use crate::request::{FareRequest, RawFareRequest};
use crate::validation;

/// A predicted fare in dollars, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fare(f64);

impl Fare {
    pub fn from_raw(value: f64) -> Self {
        Fare((value * 100.0).round() / 100.0)
    }

    pub fn amount(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

enum ModelHandle {
    Ready(Arc<dyn FareModel>),
    Unavailable(String),
}

/// Turns validated requests into fares using an injected model.
pub struct Predictor {
    model: ModelHandle,
}

impl Predictor {
    pub fn new(model: Arc<dyn FareModel>) -> Self {
        Self {
            model: ModelHandle::Ready(model),
        }
    }

    /// A predictor whose model failed to load. Every prediction reports
    /// `reason` as [`FareError::ModelUnavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            model: ModelHandle::Unavailable(reason.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.model, ModelHandle::Ready(_))
    }

    pub fn predict(&self, request: &FareRequest) -> Result<Fare, FareError> {
        let model = match &self.model {
            ModelHandle::Ready(model) => model,
            ModelHandle::Unavailable(reason) => {
                return Err(FareError::ModelUnavailable(reason.clone()));
            }
        };
        let row = request.feature_row();
        let raw = model.predict(&row).map_err(|e| {
            warn!(?row, error = %e, "model call failed");
            FareError::PredictionFailed(e.to_string())
        })?;
        let fare = Fare::from_raw(raw);
        debug!(?row, %fare, "predicted");
        Ok(fare)
    }

    /// Final gate: re-validates every field before the model sees anything.
    pub fn submit(&self, raw: &RawFareRequest) -> Result<Fare, FareError> {
        let request = validation::validate(raw)?;
        self.predict(&request)
    }
}

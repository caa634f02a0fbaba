//! Error types shared by the validator, predictor and artifact loader.

use thiserror::Error;

use crate::validation::Domain;

/// Everything that can go wrong between a raw submission and a fare.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FareError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} must be {bound}")]
    OutOfDomain {
        field: &'static str,
        bound: Domain,
    },

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("prediction failed: {0}")]
    PredictionFailed(String),
}

impl FareError {
    /// Validation errors are the caller's fault and safe to show verbatim.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FareError::MissingField { .. } | FareError::OutOfDomain { .. }
        )
    }
}

/// Failure to fetch or decode a model artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch s3://{bucket}/{key}")]
    ObjectStore {
        bucket: String,
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("model artifact is not a valid gbdt model")]
    Decode(#[from] serde_json::Error),

    #[error("model artifact is malformed: {0}")]
    Malformed(String),
}

/// Bad value in the process environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let missing = FareError::MissingField { field: "weekday" };
        assert_eq!(missing.to_string(), "weekday is required");

        let out = FareError::OutOfDomain {
            field: "vendor_id",
            bound: Domain::OneOf(&[1, 2]),
        };
        assert_eq!(out.to_string(), "vendor_id must be 1 or 2");
    }

    #[test]
    fn only_field_errors_are_validation() {
        assert!(FareError::MissingField { field: "x" }.is_validation());
        assert!(!FareError::ModelUnavailable("gone".into()).is_validation());
        assert!(!FareError::PredictionFailed("nan".into()).is_validation());
    }
}

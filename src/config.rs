//! Server settings read from the process environment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::artifact::ModelLocation;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub model_location: ModelLocation,
    /// Refuse to start without a model. When false the server starts and
    /// answers predictions with "model unavailable".
    pub model_required: bool,
    pub s3_region: String,
    pub trips_csv: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_addr = var("FARE_BIND_ADDR", "127.0.0.1:3000");
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("FARE_BIND_ADDR", &bind_addr, e))?;

        let model_location = var("FARE_MODEL_LOCATION", "gbdt.model");
        let model_location: ModelLocation = model_location
            .parse()
            .map_err(|e: String| invalid("FARE_MODEL_LOCATION", &model_location, e))?;

        let model_required = var("FARE_MODEL_REQUIRED", "true");
        let model_required = parse_bool(&model_required).ok_or_else(|| {
            invalid("FARE_MODEL_REQUIRED", &model_required, "expected true or false")
        })?;

        Ok(Self {
            bind_addr,
            model_location,
            model_required,
            s3_region: var("FARE_S3_REGION", "ap-southeast-2"),
            trips_csv: lookup("FARE_TRIPS_CSV")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

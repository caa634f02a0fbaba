pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod model;
pub mod predictor;
pub mod request;
pub mod telemetry;
pub mod training;
pub mod trips;
pub mod validation;

//! HTTP routes.
//!
//! `/validate` is the per-field check a form runs on every change;
//! `/predict` and `/form/submit` are the final gate and always re-validate
//! the whole request themselves.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::error::FareError;
use crate::predictor::{Fare, Predictor};
use crate::request::RawFareRequest;
use crate::trips::{TripCountPoint, TripCounts};
use crate::validation::{self, FieldStatus, ValidationReport};

#[derive(Clone)]
pub struct AppState {
    predictor: Arc<Predictor>,
    trips: Arc<TripCounts>,
}

impl AppState {
    pub fn new(predictor: Predictor, trips: TripCounts) -> Self {
        Self {
            predictor: Arc::new(predictor),
            trips: Arc::new(trips),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/form/submit", post(submit_form))
        .route("/validate", post(validate_all))
        .route("/validate/:field", post(validate_field))
        .route("/health", get(health))
        .route("/companies", get(companies))
        .route("/companies/:company/trips", get(company_trips))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Fare(#[from] FareError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Fare(e) if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Fare(FareError::ModelUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Fare(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionBody {
    pub predicted_fare: Fare,
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<RawFareRequest>, JsonRejection>,
) -> Result<Json<PredictionBody>, ApiError> {
    let Json(raw) = payload?;
    let fare = state.predictor.submit(&raw)?;
    info!(%fare, "fare predicted");
    Ok(Json(PredictionBody {
        predicted_fare: fare,
    }))
}

/// Plain-text answer for the form's predict button: the first failing
/// check, or the fare.
pub async fn submit_form(
    State(state): State<AppState>,
    payload: Result<Json<RawFareRequest>, JsonRejection>,
) -> String {
    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => return format!("Error: {}", rejection.body_text()),
    };
    match state.predictor.submit(&raw) {
        Ok(fare) => format!("Predicted fare: {fare}"),
        Err(e) => format!("Error: {e}"),
    }
}

pub async fn validate_all(
    payload: Result<Json<RawFareRequest>, JsonRejection>,
) -> Result<Json<ValidationReport>, ApiError> {
    let Json(raw) = payload?;
    Ok(Json(validation::report(&raw)))
}

/// Body of `/validate/:field`: `{"value": ...}`.
#[derive(Debug, Default)]
pub struct FieldValue {
    pub value: Option<Value>,
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut body = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            value: body.remove("value").filter(|v| !v.is_null()),
        })
    }
}

pub async fn validate_field(
    Path(field): Path<String>,
    payload: Result<Json<FieldValue>, JsonRejection>,
) -> Result<Json<FieldStatus>, ApiError> {
    let rule = validation::rule(&field)
        .ok_or_else(|| ApiError::NotFound(format!("unknown field {field}")))?;
    let Json(body) = payload?;
    Ok(Json(FieldStatus {
        field: rule.field,
        error: validation::check_field(rule, body.value.as_ref()),
    }))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub model_loaded: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        model_loaded: state.predictor.is_ready(),
    })
}

#[derive(Debug, Serialize)]
pub struct CompanyList {
    pub companies: Vec<String>,
}

pub async fn companies(State(state): State<AppState>) -> Json<CompanyList> {
    Json(CompanyList {
        companies: state.trips.companies().map(str::to_string).collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct TripSeries {
    pub company: String,
    pub points: Vec<TripCountPoint>,
}

pub async fn company_trips(
    State(state): State<AppState>,
    Path(company): Path<String>,
) -> Result<Json<TripSeries>, ApiError> {
    let points = state
        .trips
        .series(&company)
        .ok_or_else(|| ApiError::NotFound(format!("unknown company {company}")))?
        .to_vec();
    Ok(Json(TripSeries { company, points }))
}

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Json;
use fare_server::api::{self, AppState, FieldValue};
use fare_server::model::FareModel;
use fare_server::predictor::Predictor;
use fare_server::request::{FeatureRow, RawFareRequest};
use fare_server::trips::TripCounts;
use serde_json::{json, Value};

struct FixedModel(f64);

impl FareModel for FixedModel {
    fn predict(&self, _row: &FeatureRow) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

struct BrokenModel;

impl FareModel for BrokenModel {
    fn predict(&self, _row: &FeatureRow) -> anyhow::Result<f64> {
        anyhow::bail!("model returned non-finite value NaN")
    }
}

const TRIPS: &str = "\
date,company,trip_count
2024-03-02,Yellow Cab,210
2024-03-01,Yellow Cab,180
2024-03-01,Green Taxi,40
";

fn state(predictor: Predictor) -> AppState {
    AppState::new(predictor, TripCounts::from_reader(TRIPS.as_bytes()).unwrap())
}

fn ready() -> AppState {
    state(Predictor::new(Arc::new(FixedModel(18.456))))
}

fn ride() -> Value {
    json!({
        "vendor_id": 1,
        "pickup_location_id": 10,
        "dropoff_location_id": 50,
        "weekday": 2,
        "time_of_day": 1.5,
        "passenger_count": 1
    })
}

fn body(value: Value) -> Result<Json<RawFareRequest>, JsonRejection> {
    Ok(Json(serde_json::from_value(value).unwrap()))
}

// Runs the real `Json` extractor over a raw body.
async fn extract<T>(raw: &'static str) -> Result<Json<T>, JsonRejection>
where
    T: serde::de::DeserializeOwned,
{
    let request = Request::builder()
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw))
        .unwrap();
    Json::<T>::from_request(request, &()).await
}

#[tokio::test]
async fn predict_returns_fare_rounded_to_cents() {
    let Json(out) = api::predict(State(ready()), body(ride()))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&out).unwrap(),
        json!({ "predicted_fare": 18.46 })
    );
}

#[tokio::test]
async fn predict_rejects_out_of_domain_fields() {
    let mut ride = ride();
    ride["pickup_location_id"] = json!(300);
    let err = api::predict(State(ready()), body(ride)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.to_string(), "pickup_location_id must be between 1 and 265");
}

#[tokio::test]
async fn predict_without_model_is_service_unavailable() {
    let app = state(Predictor::unavailable("failed to read model file gbdt.model"));
    let err = api::predict(State(app), body(ride())).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(err.to_string().starts_with("model unavailable"));
}

#[tokio::test]
async fn predict_surfaces_model_failures() {
    let app = state(Predictor::new(Arc::new(BrokenModel)));
    let err = api::predict(State(app), body(ride())).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        err.to_string(),
        "prediction failed: model returned non-finite value NaN"
    );
}

#[tokio::test]
async fn positional_array_bodies_are_bad_requests() {
    const ARRAY: &str = "[1,10,50,2,1.5,1]";

    let err = api::predict(State(ready()), extract(ARRAY).await)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = api::validate_all(extract(ARRAY).await).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let text = api::submit_form(State(ready()), extract(ARRAY).await).await;
    assert!(text.starts_with("Error: "), "{text}");
    assert!(!text.contains("Predicted fare"));

    let err = api::validate_field(Path("weekday".to_string()), extract("[3]").await)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn object_bodies_pass_the_extractor() {
    let body = concat!(
        r#"{"vendor_id":1,"pickup_id":10,"dropoff_id":50,"#,
        r#""weekday":2,"time_of_day":1.5,"passenger_count":1}"#
    );
    let Json(out) = api::predict(State(ready()), extract(body).await)
        .await
        .unwrap();
    assert_eq!(out.predicted_fare.amount(), 18.46);
}

#[tokio::test]
async fn form_answers_in_plain_text() {
    let text = api::submit_form(State(ready()), body(ride())).await;
    assert_eq!(text, "Predicted fare: $18.46");

    let mut bad = ride();
    bad["vendor_id"] = json!(3);
    let text = api::submit_form(State(ready()), body(bad)).await;
    assert_eq!(text, "Error: vendor_id must be 1 or 2");

    let text = api::submit_form(State(ready()), body(json!({}))).await;
    assert_eq!(text, "Error: vendor_id is required");
}

#[tokio::test]
async fn validate_reports_every_field() {
    let Json(report) = api::validate_all(body(json!({ "vendor_id": 2, "weekday": 7 })))
        .await
        .unwrap();
    let report = serde_json::to_value(&report).unwrap();
    assert_eq!(report["valid"], json!(false));
    assert_eq!(report["fields"][0], json!({ "field": "vendor_id", "error": null }));
    assert_eq!(
        report["fields"][3],
        json!({ "field": "weekday", "error": "weekday must be between 0 and 6" })
    );
}

#[tokio::test]
async fn validate_single_field_by_name_or_alias() {
    let Json(status) = api::validate_field(
        Path("pickup_id".to_string()),
        Ok(Json(FieldValue {
            value: Some(json!(265)),
        })),
    )
    .await
    .unwrap();
    assert_eq!(status.field, "pickup_location_id");
    assert_eq!(status.error, None);

    let Json(status) = api::validate_field(
        Path("time_of_day".to_string()),
        Ok(Json(FieldValue {
            value: Some(json!(24.0)),
        })),
    )
    .await
    .unwrap();
    assert_eq!(
        status.error.as_deref(),
        Some("time_of_day must be between 0 and 23.99")
    );

    let err = api::validate_field(Path("tip".to_string()), Ok(Json(FieldValue::default())))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_model_state() {
    let Json(health) = api::health(State(ready())).await;
    assert!(health.model_loaded);
    let Json(health) = api::health(State(state(Predictor::unavailable("gone")))).await;
    assert!(!health.model_loaded);
}

#[tokio::test]
async fn trip_series_per_company() {
    let Json(list) = api::companies(State(ready())).await;
    assert_eq!(list.companies, ["Green Taxi", "Yellow Cab"]);

    let Json(series) = api::company_trips(State(ready()), Path("Yellow Cab".to_string()))
        .await
        .unwrap();
    let counts: Vec<_> = series.points.iter().map(|p| p.trip_count).collect();
    assert_eq!(counts, [180, 210]);

    let err = api::company_trips(State(ready()), Path("Blue Line".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[test]
fn router_builds_with_state() {
    let _app = api::router(ready());
}

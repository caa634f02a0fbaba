use std::sync::Arc;

use anyhow::Context;
use fare_server::api::{self, AppState};
use fare_server::artifact::load_model;
use fare_server::config::Settings;
use fare_server::predictor::Predictor;
use fare_server::telemetry;
use fare_server::trips::TripCounts;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let settings = Settings::from_env()?;

    let predictor = match load_model(&settings.model_location, &settings.s3_region).await {
        Ok(model) => Predictor::new(Arc::new(model)),
        Err(e) if settings.model_required => {
            return Err(e).with_context(|| {
                format!("failed to load the model from {}", settings.model_location)
            });
        }
        Err(e) => {
            warn!(location = %settings.model_location, error = %e, "starting without a model");
            Predictor::unavailable(e.to_string())
        }
    };

    let trips = match &settings.trips_csv {
        Some(path) => TripCounts::load(path)?,
        None => TripCounts::default(),
    };

    let app = api::router(AppState::new(predictor, trips));

    info!(addr = %settings.bind_addr, "listening");
    axum::Server::bind(&settings.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

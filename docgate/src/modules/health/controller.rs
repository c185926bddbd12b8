use axum::{Json, extract::State};
use serde::Serialize;

use crate::{error::ApiError, state::AppState};

const NOT_CONFIGURED: &str = "not_configured";

#[derive(Debug, Serialize)]
pub struct Banner {
    pub message: &'static str,
    pub database: String,
    pub status: &'static str,
    pub email_service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    pub email_configured: bool,
}

pub async fn root(State(state): State<AppState>) -> Json<Banner> {
    Json(Banner {
        message: "MongoDB API is running",
        database: state.database.clone(),
        status: "healthy",
        email_service: state.mailer.transport_name().unwrap_or(NOT_CONFIGURED),
    })
}

/// Pings the store; any failure is a 503.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthReport>, ApiError> {
    state
        .store
        .ping()
        .await
        .map_err(|e| ApiError::service_unavailable(anyhow::anyhow!("Database connection failed: {e}")))?;

    Ok(Json(HealthReport {
        status: "healthy",
        database: "connected",
        email_configured: state.mailer.is_configured(),
    }))
}

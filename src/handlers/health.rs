use axum::{extract::State, Json};
use crate::{models::HealthResponse, AppState};
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint
///
/// The saved states catalog is loaded before the listener is bound, so a
/// server that answers is ready for participants.
pub async fn ready_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let participants = state.room.participants().await.len();
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("Room is open with {} participant(s)", participants),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

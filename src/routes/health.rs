use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub is_generating: bool,
    pub credentials_configured: bool,
}

/// GET /health — liveness plus queue and credential state.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let credentials = state.credentials.load().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        is_generating: state.queue.is_generating(),
        credentials_configured: credentials.has_bearer_token(),
    })
}

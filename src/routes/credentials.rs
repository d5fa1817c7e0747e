use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::models::credentials::{Credentials, CredentialsStatus};

/// GET /api/v1/credentials — Which secrets are set. Never echoes them.
pub async fn get_credentials(State(state): State<AppState>) -> Json<CredentialsStatus> {
    let credentials = state.credentials.load().await;
    Json(CredentialsStatus::from(&credentials))
}

/// PUT /api/v1/credentials — Replace the saved credentials.
pub async fn save_credentials(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<CredentialsStatus>, StatusCode> {
    let status = CredentialsStatus::from(&credentials);
    state.credentials.save(credentials).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to save credentials");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(status))
}

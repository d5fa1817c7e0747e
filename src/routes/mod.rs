pub mod credentials;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod reference_image;

use axum::routing::{get, post, put};
use axum::Router;

use crate::app_state::AppState;

/// All application routes except `/metrics`, which carries its own state.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/v1/jobs",
            get(jobs::list_jobs)
                .post(jobs::submit_jobs)
                .delete(jobs::clear_jobs),
        )
        .route("/api/v1/jobs/retry", post(jobs::retry_failed))
        .route("/api/v1/jobs/{job_id}/download", get(jobs::download_image))
        .route(
            "/api/v1/reference-image",
            put(reference_image::select_reference_image)
                .delete(reference_image::remove_reference_image),
        )
        .route(
            "/api/v1/credentials",
            get(credentials::get_credentials).put(credentials::save_credentials),
        )
        .with_state(state)
}

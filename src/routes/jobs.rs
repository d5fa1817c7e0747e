use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{JobsResponse, RetryResponse, SubmitRequest, SubmitResponse};
use crate::models::job::QueueStats;
use crate::services::export::Artifact;
use crate::services::queue::QueueError;

/// GET /api/v1/jobs — Current gallery, most recent batch first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobsResponse> {
    let jobs = state.queue.snapshot().await;
    Json(JobsResponse {
        is_generating: state.queue.is_generating(),
        stats: QueueStats::from_jobs(&jobs),
        jobs,
    })
}

/// POST /api/v1/jobs — Submit one job per non-blank prompt line.
///
/// Uses the selected reference image and the saved credentials. Answers
/// 412 when no bearer token is configured so the caller can ask for one.
pub async fn submit_jobs(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), StatusCode> {
    request.validate().map_err(|e| {
        tracing::debug!(error = %e, "Rejected submit request");
        StatusCode::UNPROCESSABLE_ENTITY
    })?;

    let credentials = state.credentials.load().await;
    let reference_image = state.reference_image.read().await.clone();
    let lines: Vec<&str> = request.prompts.lines().collect();

    let dispatch = state
        .queue
        .submit(&lines, reference_image, request.aspect_ratio, credentials)
        .await
        .map_err(|e| match e {
            QueueError::MissingBearerToken => StatusCode::PRECONDITION_FAILED,
            QueueError::EmptyBatch => StatusCode::BAD_REQUEST,
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            batch_id: dispatch.batch_ids[0],
            job_ids: dispatch.job_ids,
        }),
    ))
}

/// POST /api/v1/jobs/retry — Re-run every failed job.
pub async fn retry_failed(State(state): State<AppState>) -> Json<RetryResponse> {
    let job_ids = match state.queue.retry_failed().await {
        Some(dispatch) => dispatch.job_ids,
        None => Vec::new(),
    };
    Json(RetryResponse { job_ids })
}

/// DELETE /api/v1/jobs — Clear the gallery.
pub async fn clear_jobs(State(state): State<AppState>) -> StatusCode {
    state.queue.clear().await;
    StatusCode::NO_CONTENT
}

/// GET /api/v1/jobs/{job_id}/download — Image file of a successful job.
pub async fn download_image(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let job = state.queue.job(job_id).await.ok_or(StatusCode::NOT_FOUND)?;
    let artifact = Artifact::from_job(&job).map_err(|e| {
        tracing::debug!(job_id = %job_id, error = %e, "Download unavailable");
        StatusCode::CONFLICT
    })?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, artifact.image.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.image.bytes,
    ))
}

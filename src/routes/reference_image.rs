use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::models::api::ReferenceImageResponse;
use crate::models::image::ReferenceImage;

/// PUT /api/v1/reference-image — Select the subject image for the next batches.
pub async fn select_reference_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ReferenceImageResponse>, StatusCode> {
    let mut image_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        if field.name() == Some("image") {
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            image_data = Some(data.to_vec());
        }
    }

    let image_data = image_data.ok_or(StatusCode::BAD_REQUEST)?;
    let image =
        ReferenceImage::from_bytes(image_data).map_err(|_| StatusCode::UNSUPPORTED_MEDIA_TYPE)?;

    let response = ReferenceImageResponse {
        mime_type: image.mime_type().to_string(),
        size_bytes: image.len(),
    };
    tracing::info!(mime_type = %response.mime_type, size_bytes = response.size_bytes, "Reference image selected");

    *state.reference_image.write().await = Some(image);
    Ok(Json(response))
}

/// DELETE /api/v1/reference-image — Cancel the image selection.
pub async fn remove_reference_image(State(state): State<AppState>) -> StatusCode {
    state.reference_image.write().await.take();
    StatusCode::NO_CONTENT
}

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::models::credentials::Credentials;
use crate::models::generation::{
    AspectRatio, ClientContext, ImageModelSettings, MediaHandle, MediaInput, RecipeMediaInput,
    RecipeRequest, TextToImageRequest, UploadMediaEnvelope, UploadMediaInput, UploadMediaRequest,
};
use crate::models::image::ReferenceImage;

const UPLOAD_PATH: &str = "/upload";
const GENERATE_PATH: &str = "/generate";

const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

const TOOL_BACKBONE: &str = "BACKBONE";
const TEXT_TO_IMAGE_MODEL: &str = "IMAGEN_3_5";
const RECIPE_MODEL: &str = "GEM_PIX";
const MEDIA_CATEGORY_SUBJECT: &str = "MEDIA_CATEGORY_SUBJECT";
const MEDIA_CATEGORY_BOARD: &str = "MEDIA_CATEGORY_BOARD";

/// Where the upload response carries the media handle.
pub const UPLOAD_ID_POINTER: &str = "/result/data/json/result/uploadMediaGenerationId";
/// First generated image in the raw Whisk response.
pub const ENCODED_IMAGE_POINTER: &str = "/imagePanels/0/generatedImages/0/encodedImage";
/// Flattened image field returned by the proxy.
pub const PROXY_IMAGE_POINTER: &str = "/image";

/// The three remote operations the job queue drives.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn upload_reference_image(
        &self,
        image: &ReferenceImage,
        credentials: &Credentials,
    ) -> Result<MediaHandle, WhiskError>;

    async fn generate_text_only(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        credentials: &Credentials,
    ) -> Result<String, WhiskError>;

    async fn generate_with_reference(
        &self,
        prompt: &str,
        media: &MediaHandle,
        aspect_ratio: AspectRatio,
        credentials: &Credentials,
    ) -> Result<String, WhiskError>;
}

/// Client for the Whisk proxy (`/upload` and `/generate`).
pub struct WhiskClient {
    http: Client,
    base_url: String,
}

impl WhiskClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        credentials: &Credentials,
    ) -> Result<Response, WhiskError> {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&credentials.bearer_token)
            .header(SESSION_TOKEN_HEADER, &credentials.session_token)
            .json(body)
            .send()
            .await
            .map_err(WhiskError::Http)
    }
}

#[async_trait]
impl ImageGenerator for WhiskClient {
    async fn upload_reference_image(
        &self,
        image: &ReferenceImage,
        credentials: &Credentials,
    ) -> Result<MediaHandle, WhiskError> {
        let payload = upload_payload(image, credentials, session_id());

        tracing::debug!(
            mime_type = image.mime_type(),
            size_bytes = image.len(),
            "Uploading reference image"
        );

        let response = self.post(UPLOAD_PATH, &payload, credentials).await?;
        let body = read_json(response, "Upload").await?;
        extract_media_handle(&body)
    }

    async fn generate_text_only(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        credentials: &Credentials,
    ) -> Result<String, WhiskError> {
        let payload = text_to_image_payload(prompt, aspect_ratio, credentials, session_id());
        let response = self.post(GENERATE_PATH, &payload, credentials).await?;
        let body = read_json(response, "Generation").await?;
        extract_image(&body)
    }

    async fn generate_with_reference(
        &self,
        prompt: &str,
        media: &MediaHandle,
        aspect_ratio: AspectRatio,
        credentials: &Credentials,
    ) -> Result<String, WhiskError> {
        let payload = recipe_payload(prompt, media, aspect_ratio, credentials, session_id());
        let response = self.post(GENERATE_PATH, &payload, credentials).await?;
        let body = read_json(response, "Recipe generation").await?;
        extract_image(&body)
    }
}

/// Per-call correlation id: current Unix time in milliseconds.
fn session_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

pub fn upload_payload<'a>(
    image: &ReferenceImage,
    credentials: &'a Credentials,
    session_id: String,
) -> UploadMediaEnvelope<'a> {
    UploadMediaEnvelope {
        json: UploadMediaRequest {
            client_context: ClientContext {
                workflow_id: &credentials.workflow_id,
                tool: None,
                session_id,
            },
            upload_media_input: UploadMediaInput {
                media_category: MEDIA_CATEGORY_SUBJECT,
                raw_bytes: image.to_data_uri(),
                caption: String::new(),
            },
        },
    }
}

pub fn text_to_image_payload<'a>(
    prompt: &'a str,
    aspect_ratio: AspectRatio,
    credentials: &'a Credentials,
    session_id: String,
) -> TextToImageRequest<'a> {
    TextToImageRequest {
        client_context: ClientContext {
            workflow_id: &credentials.workflow_id,
            tool: Some(TOOL_BACKBONE),
            session_id,
        },
        image_model_settings: ImageModelSettings {
            image_model: TEXT_TO_IMAGE_MODEL,
            aspect_ratio,
        },
        prompt,
        media_category: MEDIA_CATEGORY_BOARD,
    }
}

pub fn recipe_payload<'a>(
    prompt: &'a str,
    media: &'a MediaHandle,
    aspect_ratio: AspectRatio,
    credentials: &'a Credentials,
    session_id: String,
) -> RecipeRequest<'a> {
    RecipeRequest {
        client_context: ClientContext {
            workflow_id: &credentials.workflow_id,
            tool: Some(TOOL_BACKBONE),
            session_id,
        },
        image_model_settings: ImageModelSettings {
            image_model: RECIPE_MODEL,
            aspect_ratio,
        },
        user_instruction: prompt,
        recipe_media_inputs: vec![RecipeMediaInput {
            caption: media.as_str(),
            media_input: MediaInput {
                media_category: MEDIA_CATEGORY_SUBJECT,
                media_generation_id: media.as_str(),
            },
        }],
    }
}

/// Reads a JSON body, turning non-2xx responses into `Rejected`.
///
/// A rejected call reports the body's `error` field, or the status text when
/// the body is not JSON. Failing both it reports `"<operation> failed: <status>"`.
async fn read_json(response: Response, operation: &str) -> Result<Value, WhiskError> {
    let status = response.status();
    if !status.is_success() {
        let body: Option<Value> = response.json().await.ok();
        let reason = match &body {
            Some(body) => body.get("error").and_then(Value::as_str),
            None => status.canonical_reason(),
        };
        let message = reason
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} failed: {}", operation, status.as_u16()));
        return Err(WhiskError::Rejected { status: status.as_u16(), message });
    }

    response.json().await.map_err(WhiskError::Http)
}

pub fn extract_media_handle(body: &Value) -> Result<MediaHandle, WhiskError> {
    body.pointer(UPLOAD_ID_POINTER)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(|id| MediaHandle(id.to_string()))
        .ok_or(WhiskError::MalformedUpload)
}

pub fn extract_image(body: &Value) -> Result<String, WhiskError> {
    [ENCODED_IMAGE_POINTER, PROXY_IMAGE_POINTER]
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .filter(|image| !image.is_empty())
        .map(str::to_string)
        .ok_or(WhiskError::MissingImage)
}

#[derive(Debug, thiserror::Error)]
pub enum WhiskError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to parse upload response structure")]
    MalformedUpload,

    #[error("No image data returned from proxy")]
    MissingImage,
}

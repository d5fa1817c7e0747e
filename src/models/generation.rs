use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output image shape accepted by the Whisk image models.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "IMAGE_ASPECT_RATIO_LANDSCAPE", alias = "landscape")]
    #[strum(to_string = "IMAGE_ASPECT_RATIO_LANDSCAPE", serialize = "landscape")]
    Landscape,
    #[serde(rename = "IMAGE_ASPECT_RATIO_PORTRAIT", alias = "portrait")]
    #[strum(to_string = "IMAGE_ASPECT_RATIO_PORTRAIT", serialize = "portrait")]
    Portrait,
    #[serde(rename = "IMAGE_ASPECT_RATIO_SQUARE", alias = "square")]
    #[strum(to_string = "IMAGE_ASPECT_RATIO_SQUARE", serialize = "square")]
    Square,
}

/// Identifier returned by the upload call, reused for a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Wire shapes for the Whisk proxy.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext<'a> {
    pub workflow_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<&'static str>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageModelSettings {
    pub image_model: &'static str,
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Serialize)]
pub struct UploadMediaEnvelope<'a> {
    pub json: UploadMediaRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaRequest<'a> {
    pub client_context: ClientContext<'a>,
    pub upload_media_input: UploadMediaInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaInput {
    pub media_category: &'static str,
    /// Reference image as a `data:` URI.
    pub raw_bytes: String,
    pub caption: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToImageRequest<'a> {
    pub client_context: ClientContext<'a>,
    pub image_model_settings: ImageModelSettings,
    pub prompt: &'a str,
    pub media_category: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest<'a> {
    pub client_context: ClientContext<'a>,
    pub image_model_settings: ImageModelSettings,
    pub user_instruction: &'a str,
    pub recipe_media_inputs: Vec<RecipeMediaInput<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMediaInput<'a> {
    pub caption: &'a str,
    pub media_input: MediaInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInput<'a> {
    pub media_category: &'static str,
    pub media_generation_id: &'a str,
}

use std::path::Path;

use base64::Engine;
use image::ImageFormat;

const DATA_IMAGE_PREFIX: &str = "data:image";
const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Makes a generated payload directly renderable.
///
/// The API returns bare base64 for JPEG output; anything already carrying a
/// `data:image` header is kept as is.
pub fn normalize_image_payload(payload: &str) -> String {
    if payload.starts_with(DATA_IMAGE_PREFIX) {
        payload.to_string()
    } else {
        format!("{JPEG_DATA_URI_PREFIX}{payload}")
    }
}

/// A reference (subject) image selected for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ReferenceImage {
    /// Accepts raw file bytes, sniffing the format from magic bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImageDataError> {
        if bytes.is_empty() {
            return Err(ImageDataError::Empty);
        }
        let format = image::guess_format(&bytes).map_err(|_| ImageDataError::UnknownFormat)?;
        Ok(Self { bytes, format })
    }

    /// Reads and sniffs an image file.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ImageDataError> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(bytes)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:<mime>;base64,<bytes>`, the form the upload endpoint expects.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Bytes recovered from a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn from_data_uri(uri: &str) -> Result<Self, ImageDataError> {
        let rest = uri.strip_prefix("data:").ok_or(ImageDataError::NotDataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageDataError::NotDataUri)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(ImageDataError::NotBase64)?
            .to_string();

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(ImageDataError::Decode)?;

        Ok(Self { mime_type, bytes })
    }

    /// File extension for the MIME type, `jpg` when unknown.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(&self.mime_type)
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("jpg")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageDataError {
    #[error("Image data is empty")]
    Empty,

    #[error("Unrecognized image format")]
    UnknownFormat,

    #[error("Value is not a data URI")]
    NotDataUri,

    #[error("Data URI is not base64-encoded")]
    NotBase64,

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),
}

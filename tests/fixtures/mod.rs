//! Shared test data

#![allow(dead_code)]

use whisk_batch::models::credentials::Credentials;

/// Smallest byte sequence `image::guess_format` recognises as PNG.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Bare base64 as the API returns it for JPEG output ("ABC").
pub const RAW_JPEG_BASE64: &str = "QUJD";

pub fn credentials() -> Credentials {
    credentials_with_token("ya29.test-token")
}

pub fn credentials_with_token(token: &str) -> Credentials {
    Credentials {
        bearer_token: token.to_string(),
        session_token: "session-cookie".to_string(),
        workflow_id: "workflow-1".to_string(),
    }
}

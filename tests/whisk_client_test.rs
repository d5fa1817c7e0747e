//! WhiskClient against an in-process stub of the proxy

mod fixtures;
mod helpers;

use axum::http::StatusCode;
use fixtures::*;
use helpers::StubProxy;
use whisk_batch::models::generation::{AspectRatio, MediaHandle};
use whisk_batch::models::image::ReferenceImage;
use whisk_batch::services::whisk::{ImageGenerator, WhiskClient, WhiskError};

const UPLOAD_OK: &str =
    r#"{"result":{"data":{"json":{"result":{"uploadMediaGenerationId":"media-abc"}}}}}"#;
const GENERATE_OK: &str =
    r#"{"imagePanels":[{"generatedImages":[{"encodedImage":"QUJD"},{"encodedImage":"REVG"}]}]}"#;

#[tokio::test]
async fn test_upload_sends_credentials_and_returns_handle() {
    let stub = StubProxy::spawn((StatusCode::OK, UPLOAD_OK), (StatusCode::OK, GENERATE_OK)).await;
    let client = WhiskClient::new(&stub.base_url);
    let image = ReferenceImage::from_bytes(PNG_BYTES.to_vec()).unwrap();

    let handle = client
        .upload_reference_image(&image, &credentials())
        .await
        .expect("upload succeeds");
    assert_eq!(handle, MediaHandle("media-abc".to_string()));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/upload");
    assert_eq!(request.authorization.as_deref(), Some("Bearer ya29.test-token"));
    assert_eq!(request.session_token.as_deref(), Some("session-cookie"));

    let context = &request.body["json"]["clientContext"];
    assert_eq!(context["workflowId"], "workflow-1");
    assert!(context["sessionId"].as_str().unwrap().parse::<i64>().is_ok());
    assert_eq!(
        request.body["json"]["uploadMediaInput"]["rawBytes"],
        image.to_data_uri()
    );
}

#[tokio::test]
async fn test_upload_without_handle_is_malformed() {
    let stub = StubProxy::spawn((StatusCode::OK, r#"{"result":{}}"#), (StatusCode::OK, GENERATE_OK)).await;
    let client = WhiskClient::new(&stub.base_url);
    let image = ReferenceImage::from_bytes(PNG_BYTES.to_vec()).unwrap();

    let err = client
        .upload_reference_image(&image, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, WhiskError::MalformedUpload));
    assert_eq!(err.to_string(), "Failed to parse upload response structure");
}

#[tokio::test]
async fn test_rejected_upload_reports_proxy_error() {
    let stub = StubProxy::spawn(
        (StatusCode::UNAUTHORIZED, r#"{"error":"Session expired"}"#),
        (StatusCode::OK, GENERATE_OK),
    )
    .await;
    let client = WhiskClient::new(&stub.base_url);
    let image = ReferenceImage::from_bytes(PNG_BYTES.to_vec()).unwrap();

    let err = client
        .upload_reference_image(&image, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, WhiskError::Rejected { status: 401, .. }));
    assert_eq!(err.to_string(), "Session expired");
}

#[tokio::test]
async fn test_text_only_generation_returns_first_image() {
    let stub = StubProxy::spawn((StatusCode::OK, UPLOAD_OK), (StatusCode::OK, GENERATE_OK)).await;
    let client = WhiskClient::new(&format!("{}/", stub.base_url));

    let image = client
        .generate_text_only("a lighthouse", AspectRatio::Portrait, &credentials())
        .await
        .expect("generation succeeds");
    assert_eq!(image, "QUJD");

    let body = &stub.requests()[0].body;
    assert_eq!(body["prompt"], "a lighthouse");
    assert_eq!(body["imageModelSettings"]["imageModel"], "IMAGEN_3_5");
    assert_eq!(body["imageModelSettings"]["aspectRatio"], "IMAGE_ASPECT_RATIO_PORTRAIT");
    assert_eq!(body["clientContext"]["tool"], "BACKBONE");
}

#[tokio::test]
async fn test_reference_generation_accepts_proxy_image_field() {
    let stub = StubProxy::spawn((StatusCode::OK, UPLOAD_OK), (StatusCode::OK, r#"{"image":"R0lG"}"#)).await;
    let client = WhiskClient::new(&stub.base_url);
    let media = MediaHandle("media-abc".to_string());

    let image = client
        .generate_with_reference("a knight", &media, AspectRatio::Square, &credentials())
        .await
        .expect("generation succeeds");
    assert_eq!(image, "R0lG");

    let request = &stub.requests()[0];
    assert_eq!(request.path, "/generate");
    assert_eq!(request.body["imageModelSettings"]["imageModel"], "GEM_PIX");
    assert_eq!(request.body["userInstruction"], "a knight");
    assert_eq!(
        request.body["recipeMediaInputs"][0]["mediaInput"]["mediaGenerationId"],
        "media-abc"
    );
}

#[tokio::test]
async fn test_generation_without_image_fails() {
    let stub = StubProxy::spawn((StatusCode::OK, UPLOAD_OK), (StatusCode::OK, r#"{"imagePanels":[]}"#)).await;
    let client = WhiskClient::new(&stub.base_url);

    let err = client
        .generate_text_only("empty", AspectRatio::Landscape, &credentials())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No image data returned from proxy");
}

#[tokio::test]
async fn test_non_json_error_reports_status_text() {
    let stub = StubProxy::spawn(
        (StatusCode::BAD_GATEWAY, "upstream unavailable"),
        (StatusCode::BAD_GATEWAY, "upstream unavailable"),
    )
    .await;
    let client = WhiskClient::new(&stub.base_url);
    let image = ReferenceImage::from_bytes(PNG_BYTES.to_vec()).unwrap();

    let upload_err = client
        .upload_reference_image(&image, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(upload_err, WhiskError::Rejected { status: 502, .. }));
    assert_eq!(upload_err.to_string(), "Bad Gateway");

    let text_err = client
        .generate_text_only("x", AspectRatio::Landscape, &credentials())
        .await
        .unwrap_err();
    assert_eq!(text_err.to_string(), "Bad Gateway");
}

#[tokio::test]
async fn test_json_error_without_message_falls_back_to_status_code() {
    let stub = StubProxy::spawn(
        (StatusCode::BAD_GATEWAY, r#"{"detail":"upstream"}"#),
        (StatusCode::BAD_GATEWAY, r#"{"error":""}"#),
    )
    .await;
    let client = WhiskClient::new(&stub.base_url);
    let image = ReferenceImage::from_bytes(PNG_BYTES.to_vec()).unwrap();
    let media = MediaHandle("media-abc".to_string());

    let upload_err = client
        .upload_reference_image(&image, &credentials())
        .await
        .unwrap_err();
    assert_eq!(upload_err.to_string(), "Upload failed: 502");

    let text_err = client
        .generate_text_only("x", AspectRatio::Landscape, &credentials())
        .await
        .unwrap_err();
    assert_eq!(text_err.to_string(), "Generation failed: 502");

    let recipe_err = client
        .generate_with_reference("x", &media, AspectRatio::Landscape, &credentials())
        .await
        .unwrap_err();
    assert_eq!(recipe_err.to_string(), "Recipe generation failed: 502");
}

#[tokio::test]
async fn test_unreachable_proxy_is_http_error() {
    // Nothing listens on port 9 of localhost in the test environment.
    let client = WhiskClient::new("http://127.0.0.1:9/api");
    let err = client
        .generate_text_only("x", AspectRatio::Landscape, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, WhiskError::Http(_)));
    assert!(err.to_string().starts_with("HTTP request failed"));
}

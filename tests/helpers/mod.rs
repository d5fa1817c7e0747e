//! Test doubles for the Whisk API

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use whisk_batch::models::credentials::Credentials;
use whisk_batch::models::generation::{AspectRatio, MediaHandle};
use whisk_batch::models::image::ReferenceImage;
use whisk_batch::services::whisk::{ImageGenerator, WhiskError};

/// A call observed by [`MockGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { bearer_token: String },
    TextOnly { prompt: String, aspect_ratio: AspectRatio },
    WithReference { prompt: String, media: String },
}

/// Scripted [`ImageGenerator`].
///
/// Each prompt has a queue of outcomes consumed one per call; once it runs
/// dry the prompt succeeds with `img-<prompt>`. Uploads work the same way and
/// default to the handle `media-1`.
#[derive(Default)]
pub struct MockGenerator {
    calls: Mutex<Vec<Call>>,
    outcomes: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    uploads: Mutex<VecDeque<Result<String, String>>>,
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks every generate call until the test releases a permit.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn script(self, prompt: &str, outcome: Result<&str, &str>) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .entry(prompt.to_string())
            .or_default()
            .push_back(outcome.map(str::to_string).map_err(str::to_string));
        self
    }

    pub fn script_upload(self, outcome: Result<&str, &str>) -> Self {
        self.uploads
            .lock()
            .unwrap()
            .push_back(outcome.map(str::to_string).map_err(str::to_string));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Upload { .. }))
            .count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn generate(&self, call: Call, prompt: &str) -> Result<String, WhiskError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get_mut(prompt)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(format!("img-{prompt}")));

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome.map_err(rejected)
    }
}

fn rejected(message: String) -> WhiskError {
    WhiskError::Rejected { status: 500, message }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn upload_reference_image(
        &self,
        _image: &ReferenceImage,
        credentials: &Credentials,
    ) -> Result<MediaHandle, WhiskError> {
        self.calls.lock().unwrap().push(Call::Upload {
            bearer_token: credentials.bearer_token.clone(),
        });
        let outcome = self
            .uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("media-1".to_string()));
        outcome.map(MediaHandle).map_err(rejected)
    }

    async fn generate_text_only(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        _credentials: &Credentials,
    ) -> Result<String, WhiskError> {
        let call = Call::TextOnly {
            prompt: prompt.to_string(),
            aspect_ratio,
        };
        self.generate(call, prompt).await
    }

    async fn generate_with_reference(
        &self,
        prompt: &str,
        media: &MediaHandle,
        _aspect_ratio: AspectRatio,
        _credentials: &Credentials,
    ) -> Result<String, WhiskError> {
        let call = Call::WithReference {
            prompt: prompt.to_string(),
            media: media.as_str().to_string(),
        };
        self.generate(call, prompt).await
    }
}

/// A request received by the stub proxy.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: &'static str,
    pub authorization: Option<String>,
    pub session_token: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct StubState {
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    upload: (StatusCode, String),
    generate: (StatusCode, String),
}

/// In-process stand-in for the Whisk proxy.
pub struct StubProxy {
    pub base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubProxy {
    /// Serves `/api/upload` and `/api/generate` with fixed raw responses.
    pub async fn spawn(upload: (StatusCode, &str), generate: (StatusCode, &str)) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            captured: captured.clone(),
            upload: (upload.0, upload.1.to_string()),
            generate: (generate.0, generate.1.to_string()),
        };

        let app = Router::new()
            .route("/api/upload", post(stub_upload))
            .route("/api/generate", post(stub_generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            captured,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

fn capture(state: &StubState, path: &'static str, headers: &HeaderMap, body: Value) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.captured.lock().unwrap().push(CapturedRequest {
        path,
        authorization: header("authorization"),
        session_token: header("x-session-token"),
        body,
    });
}

async fn stub_upload(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    capture(&state, "/upload", &headers, body);
    state.upload.clone()
}

async fn stub_generate(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    capture(&state, "/generate", &headers, body);
    state.generate.clone()
}

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::generation::AspectRatio;
use crate::models::job::{BatchId, GenerationJob, JobId, QueueStats};

/// Request to submit a batch of prompts, one per line.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[garde(length(min = 1, max = 100_000))]
    pub prompts: String,

    #[garde(skip)]
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

/// Response after a batch has been accepted.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub batch_id: BatchId,
    pub job_ids: Vec<JobId>,
}

/// Response for a retry of failed jobs.
#[derive(Debug, Serialize, Deserialize)]
pub struct RetryResponse {
    pub job_ids: Vec<JobId>,
}

/// Snapshot of the gallery.
#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub is_generating: bool,
    pub stats: QueueStats,
    pub jobs: Vec<GenerationJob>,
}

/// Response after selecting a reference image.
#[derive(Debug, Serialize)]
pub struct ReferenceImageResponse {
    pub mime_type: String,
    pub size_bytes: usize,
}

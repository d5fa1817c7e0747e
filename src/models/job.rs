use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JobId = Uuid;
pub type BatchId = Uuid;

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// One prompt's tracked generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationJob {
    pub id: JobId,
    pub batch_id: BatchId,
    pub prompt: String,
    pub status: JobStatus,
    /// Renderable `data:image/...;base64,` URI, present iff `status == Success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    /// Failure reason when failed, or a progress note while processing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Creates a pending job. `prompt` is stored trimmed.
    pub fn new(batch_id: BatchId, prompt: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            prompt: prompt.trim().to_string(),
            status: JobStatus::Pending,
            image_data: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Applies a state change addressed to this job.
    pub fn apply(&mut self, event: JobEvent) {
        match event {
            JobEvent::Started { note, .. } => {
                self.status = JobStatus::Processing;
                self.image_data = None;
                self.error_message = note;
            }
            JobEvent::Succeeded { image_data, .. } => {
                self.status = JobStatus::Success;
                self.image_data = Some(image_data);
                self.error_message = None;
            }
            JobEvent::Failed { reason, .. } => {
                self.status = JobStatus::Failed;
                self.image_data = None;
                self.error_message = Some(reason);
            }
            JobEvent::Requeued { .. } => {
                // Only failed jobs are re-admitted.
                if self.status == JobStatus::Failed {
                    self.status = JobStatus::Pending;
                    self.error_message = None;
                }
            }
        }
    }
}

/// A discrete state change for a single job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started { job_id: JobId, note: Option<String> },
    Succeeded { job_id: JobId, image_data: String },
    Failed { job_id: JobId, reason: String },
    Requeued { job_id: JobId },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Started { job_id, .. }
            | Self::Succeeded { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Requeued { job_id } => *job_id,
        }
    }
}

/// Status counters for the visible collection.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub success: usize,
    pub failed: usize,
}

impl QueueStats {
    pub fn from_jobs(jobs: &[GenerationJob]) -> Self {
        jobs.iter().fold(
            Self {
                total: jobs.len(),
                ..Self::default()
            },
            |mut stats, job| {
                match job.status {
                    JobStatus::Pending => stats.pending += 1,
                    JobStatus::Processing => stats.processing += 1,
                    JobStatus::Success => stats.success += 1,
                    JobStatus::Failed => stats.failed += 1,
                }
                stats
            },
        )
    }
}

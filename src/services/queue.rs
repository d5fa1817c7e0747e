use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::credentials::Credentials;
use crate::models::generation::{AspectRatio, MediaHandle};
use crate::models::image::{normalize_image_payload, ReferenceImage};
use crate::models::job::{BatchId, GenerationJob, JobEvent, JobId, JobStatus, QueueStats};
use crate::services::whisk::{ImageGenerator, WhiskError};

pub const UPLOADING_SUBJECT_NOTE: &str = "Uploading subject...";
pub const SUBJECT_UPLOAD_FAILED: &str = "Subject upload failed";
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Everything a batch was submitted with, kept for retries.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub reference_image: Option<ReferenceImage>,
    pub aspect_ratio: AspectRatio,
    pub credentials: Credentials,
}

/// A job as handed to the processing loop.
#[derive(Debug, Clone)]
struct WorkItem {
    id: JobId,
    prompt: String,
}

/// Handle to a spawned processing run.
#[derive(Debug)]
pub struct Dispatch {
    pub batch_ids: Vec<BatchId>,
    pub job_ids: Vec<JobId>,
    task: JoinHandle<()>,
}

impl Dispatch {
    /// Waits until every job in this dispatch has been attempted.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Batch processing task aborted");
        }
    }
}

/// Owns the job collection and drives batches through the generator one job
/// at a time.
///
/// Overlapping dispatches are not refused: callers are expected to check
/// [`JobQueue::is_generating`] before submitting.
pub struct JobQueue {
    jobs: RwLock<Vec<GenerationJob>>,
    contexts: RwLock<HashMap<BatchId, Arc<BatchContext>>>,
    generator: Arc<dyn ImageGenerator>,
    in_flight: AtomicUsize,
    generating: watch::Sender<bool>,
}

impl JobQueue {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        let (generating, _) = watch::channel(false);
        Self {
            jobs: RwLock::new(Vec::new()),
            contexts: RwLock::new(HashMap::new()),
            generator,
            in_flight: AtomicUsize::new(0),
            generating,
        }
    }

    /// Creates one pending job per non-blank line and starts processing them
    /// in the background.
    pub async fn submit<S: AsRef<str>>(
        self: &Arc<Self>,
        prompt_lines: &[S],
        reference_image: Option<ReferenceImage>,
        aspect_ratio: AspectRatio,
        credentials: Credentials,
    ) -> Result<Dispatch, QueueError> {
        if !credentials.has_bearer_token() {
            return Err(QueueError::MissingBearerToken);
        }

        let batch_id = Uuid::new_v4();
        let new_jobs: Vec<GenerationJob> = prompt_lines
            .iter()
            .map(|line| line.as_ref())
            .filter(|line: &&str| !line.trim().is_empty())
            .map(|line| GenerationJob::new(batch_id, line))
            .collect();

        if new_jobs.is_empty() {
            return Err(QueueError::EmptyBatch);
        }

        let items: Vec<WorkItem> = new_jobs
            .iter()
            .map(|job| WorkItem { id: job.id, prompt: job.prompt.clone() })
            .collect();
        let job_ids: Vec<JobId> = items.iter().map(|item| item.id).collect();

        let context = Arc::new(BatchContext {
            reference_image,
            aspect_ratio,
            credentials,
        });
        {
            let mut jobs = self.jobs.write().await;
            self.contexts.write().await.insert(batch_id, context.clone());
            let older = std::mem::take(&mut *jobs);
            *jobs = new_jobs.into_iter().chain(older).collect();
        }

        metrics::counter!("whisk_jobs_submitted_total").increment(job_ids.len() as u64);
        tracing::info!(
            batch_id = %batch_id,
            jobs = job_ids.len(),
            with_reference = context.reference_image.is_some(),
            aspect_ratio = %context.aspect_ratio,
            "Batch submitted"
        );

        let task = self.spawn(vec![(batch_id, context, items)]);
        Ok(Dispatch {
            batch_ids: vec![batch_id],
            job_ids,
            task,
        })
    }

    /// Re-admits every failed job and processes them again with the context
    /// of the batch they were submitted in. Returns `None` when nothing failed.
    pub async fn retry_failed(self: &Arc<Self>) -> Option<Dispatch> {
        let groups = {
            let mut jobs = self.jobs.write().await;
            let contexts = self.contexts.read().await;

            let mut groups: Vec<(BatchId, Arc<BatchContext>, Vec<WorkItem>)> = Vec::new();
            for job in jobs.iter_mut().filter(|j| j.status == JobStatus::Failed) {
                let Some(context) = contexts.get(&job.batch_id) else {
                    tracing::warn!(job_id = %job.id, batch_id = %job.batch_id, "No context for failed job, skipping");
                    continue;
                };

                job.apply(JobEvent::Requeued { job_id: job.id });
                let item = WorkItem { id: job.id, prompt: job.prompt.clone() };
                match groups.iter_mut().find(|(batch_id, _, _)| *batch_id == job.batch_id) {
                    Some((_, _, items)) => items.push(item),
                    None => groups.push((job.batch_id, context.clone(), vec![item])),
                }
            }
            groups
        };

        if groups.is_empty() {
            return None;
        }

        let batch_ids = groups.iter().map(|(batch_id, _, _)| *batch_id).collect();
        let job_ids: Vec<JobId> = groups
            .iter()
            .flat_map(|(_, _, items)| items.iter().map(|item| item.id))
            .collect();

        tracing::info!(jobs = job_ids.len(), "Retrying failed jobs");

        let task = self.spawn(groups);
        Some(Dispatch {
            batch_ids,
            job_ids,
            task,
        })
    }

    /// Empties the visible collection. A running loop keeps going but its
    /// updates no longer land anywhere.
    pub async fn clear(&self) {
        let mut jobs = self.jobs.write().await;
        let removed = jobs.len();
        jobs.clear();
        self.contexts.write().await.clear();
        drop(jobs);
        tracing::info!(removed, "Job collection cleared");
    }

    /// Jobs, most recent batch first.
    pub async fn snapshot(&self) -> Vec<GenerationJob> {
        self.jobs.read().await.clone()
    }

    pub async fn job(&self, id: JobId) -> Option<GenerationJob> {
        self.jobs.read().await.iter().find(|j| j.id == id).cloned()
    }

    pub async fn stats(&self) -> QueueStats {
        QueueStats::from_jobs(&self.jobs.read().await)
    }

    pub fn is_generating(&self) -> bool {
        *self.generating.borrow()
    }

    /// Follows the generating flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.generating.subscribe()
    }

    fn spawn(self: &Arc<Self>, groups: Vec<(BatchId, Arc<BatchContext>, Vec<WorkItem>)>) -> JoinHandle<()> {
        let guard = GeneratingGuard::enter(self.clone());
        let queue = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            for (batch_id, context, items) in groups {
                queue.process_batch(batch_id, &context, items).await;
                queue.release_context(batch_id).await;
            }
        })
    }

    async fn process_batch(&self, batch_id: BatchId, context: &BatchContext, items: Vec<WorkItem>) {
        let credentials = &context.credentials;

        let media = match &context.reference_image {
            Some(image) => {
                for item in &items {
                    self.apply(JobEvent::Started {
                        job_id: item.id,
                        note: Some(UPLOADING_SUBJECT_NOTE.to_string()),
                    })
                    .await;
                }

                match self.generator.upload_reference_image(image, credentials).await {
                    Ok(handle) => {
                        tracing::info!(batch_id = %batch_id, "Reference image uploaded");
                        Some(handle)
                    }
                    Err(e) => {
                        tracing::error!(batch_id = %batch_id, error = %e, "Failed to upload reference image");
                        metrics::counter!("whisk_reference_uploads_failed_total").increment(1);
                        for item in &items {
                            self.fail(item.id, SUBJECT_UPLOAD_FAILED.to_string()).await;
                        }
                        return;
                    }
                }
            }
            None => None,
        };

        for item in items {
            self.apply(JobEvent::Started { job_id: item.id, note: None }).await;

            let start = Instant::now();
            let result = self.generate(&item.prompt, media.as_ref(), context).await;
            metrics::histogram!("whisk_generation_seconds").record(start.elapsed().as_secs_f64());

            match result {
                Ok(payload) => {
                    tracing::info!(
                        job_id = %item.id,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Image generated"
                    );
                    metrics::counter!("whisk_jobs_succeeded_total").increment(1);
                    self.apply(JobEvent::Succeeded {
                        job_id: item.id,
                        image_data: normalize_image_payload(&payload),
                    })
                    .await;
                }
                Err(e) => {
                    tracing::warn!(job_id = %item.id, error = %e, "Image generation failed");
                    self.fail(item.id, failure_reason(&e)).await;
                }
            }
        }
    }

    /// Forgets a batch's context once none of its visible jobs can be retried.
    async fn release_context(&self, batch_id: BatchId) {
        let jobs = self.jobs.read().await;
        let settled = jobs
            .iter()
            .filter(|j| j.batch_id == batch_id)
            .all(|j| j.status == JobStatus::Success);
        if settled && self.contexts.write().await.remove(&batch_id).is_some() {
            tracing::debug!(batch_id = %batch_id, "Batch context released");
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        media: Option<&MediaHandle>,
        context: &BatchContext,
    ) -> Result<String, WhiskError> {
        match media {
            Some(handle) => {
                self.generator
                    .generate_with_reference(prompt, handle, context.aspect_ratio, &context.credentials)
                    .await
            }
            None => {
                self.generator
                    .generate_text_only(prompt, context.aspect_ratio, &context.credentials)
                    .await
            }
        }
    }

    async fn fail(&self, job_id: JobId, reason: String) {
        metrics::counter!("whisk_jobs_failed_total").increment(1);
        self.apply(JobEvent::Failed { job_id, reason }).await;
    }

    /// Applies an event to the job it addresses; ids no longer in the
    /// collection are ignored.
    async fn apply(&self, event: JobEvent) {
        let job_id = event.job_id();
        let mut jobs = self.jobs.write().await;
        match jobs.iter_mut().find(|j| j.id == job_id) {
            Some(job) => job.apply(event),
            None => tracing::debug!(job_id = %job_id, "Dropping update for removed job"),
        }
    }
}

/// Keeps the generating flag raised while at least one dispatch is running.
struct GeneratingGuard {
    queue: Arc<JobQueue>,
}

impl GeneratingGuard {
    fn enter(queue: Arc<JobQueue>) -> Self {
        let running = queue.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!("whisk_batches_in_flight").set(running as f64);
        queue.generating.send_replace(true);
        Self { queue }
    }
}

impl Drop for GeneratingGuard {
    fn drop(&mut self) {
        let running = self.queue.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::gauge!("whisk_batches_in_flight").set(running as f64);
        if running == 0 {
            self.queue.generating.send_replace(false);
        }
    }
}

fn failure_reason(error: &WhiskError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}

/// Registers descriptions for the queue's metrics.
pub fn describe_metrics() {
    metrics::describe_counter!("whisk_jobs_submitted_total", "Total generation jobs submitted");
    metrics::describe_counter!("whisk_jobs_succeeded_total", "Total generation jobs that produced an image");
    metrics::describe_counter!("whisk_jobs_failed_total", "Total generation jobs that failed");
    metrics::describe_counter!(
        "whisk_reference_uploads_failed_total",
        "Reference image uploads that failed a whole batch"
    );
    metrics::describe_gauge!("whisk_batches_in_flight", "Dispatches currently being processed");
    metrics::describe_histogram!("whisk_generation_seconds", "Time spent in a single generate call");
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Bearer token is not configured")]
    MissingBearerToken,

    #[error("No non-blank prompt lines were submitted")]
    EmptyBatch,
}

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use whisk_batch::{
    config::AppConfig,
    models::{image::ReferenceImage, job::JobStatus},
    services::{
        credentials::CredentialStore,
        export,
        queue::{JobQueue, QueueError},
        whisk::WhiskClient,
    },
};

/// Reads prompts from stdin (one per line), runs them as one batch and writes
/// every generated image to the export directory.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let credentials = CredentialStore::open(&config.credentials_path)
        .await
        .expect("Failed to open credential store")
        .load()
        .await;

    let reference_image = match &config.reference_image_path {
        Some(path) => Some(
            ReferenceImage::read(path)
                .await
                .expect("Failed to load reference image"),
        ),
        None => None,
    };

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .expect("Failed to read prompts from stdin");
    let lines: Vec<&str> = input.lines().collect();

    let queue = Arc::new(JobQueue::new(Arc::new(WhiskClient::new(&config.whisk_api_base))));

    let dispatch = match queue
        .submit(&lines, reference_image, config.aspect_ratio, credentials)
        .await
    {
        Ok(dispatch) => dispatch,
        Err(QueueError::MissingBearerToken) => {
            tracing::error!(
                path = %config.credentials_path.display(),
                "No bearer token saved; configure credentials first"
            );
            return ExitCode::FAILURE;
        }
        Err(QueueError::EmptyBatch) => {
            tracing::warn!("No prompts on stdin, nothing to do");
            return ExitCode::SUCCESS;
        }
    };

    tracing::info!(jobs = dispatch.job_ids.len(), "Batch running");
    dispatch.finished().await;

    let mut failed = 0;
    for job in queue.snapshot().await {
        match job.status {
            JobStatus::Success => match export::export_job(&job, &config.export_dir).await {
                Ok(path) => tracing::info!(job_id = %job.id, path = %path.display(), "Saved image"),
                Err(e) => {
                    failed += 1;
                    tracing::error!(job_id = %job.id, error = %e, "Failed to save image");
                }
            },
            _ => {
                failed += 1;
                tracing::warn!(
                    job_id = %job.id,
                    prompt = %job.prompt,
                    error = job.error_message.as_deref().unwrap_or_default(),
                    "Job did not produce an image"
                );
            }
        }
    }

    let stats = queue.stats().await;
    tracing::info!(success = stats.success, failed = stats.failed, "Batch complete");

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

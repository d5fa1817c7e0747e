use std::path::{Path, PathBuf};

use crate::models::image::{DecodedImage, ImageDataError};
use crate::models::job::{GenerationJob, JobId, JobStatus};

const PROMPT_PREFIX_CHARS: usize = 20;

/// `<id>_<prompt prefix>.<ext>`, with the prefix reduced to ASCII alphanumerics.
pub fn artifact_file_name(job: &GenerationJob, extension: &str) -> String {
    let prefix: String = job
        .prompt
        .chars()
        .take(PROMPT_PREFIX_CHARS)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}.{}", job.id, prefix, extension)
}

/// A successful job's image, ready to be written or served.
#[derive(Debug)]
pub struct Artifact {
    pub file_name: String,
    pub image: DecodedImage,
}

impl Artifact {
    pub fn from_job(job: &GenerationJob) -> Result<Self, ExportError> {
        let data = match (&job.status, &job.image_data) {
            (JobStatus::Success, Some(data)) => data,
            _ => return Err(ExportError::NotReady(job.id)),
        };
        let image = DecodedImage::from_data_uri(data)?;
        Ok(Self {
            file_name: artifact_file_name(job, image.extension()),
            image,
        })
    }
}

/// Writes a successful job's image into `dir`, returning the file path.
pub async fn export_job(job: &GenerationJob, dir: &Path) -> Result<PathBuf, ExportError> {
    let artifact = Artifact::from_job(job)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&artifact.file_name);
    tokio::fs::write(&path, &artifact.image.bytes).await?;

    tracing::debug!(job_id = %job.id, path = %path.display(), "Image exported");
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Job {0} has no image to export")]
    NotReady(JobId),

    #[error("Stored image is unreadable: {0}")]
    Image(#[from] ImageDataError),

    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

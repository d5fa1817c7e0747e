use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::image::ReferenceImage;
use crate::services::{credentials::CredentialStore, queue::JobQueue};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub credentials: Arc<CredentialStore>,
    /// Reference image selected for the next submission.
    pub reference_image: Arc<RwLock<Option<ReferenceImage>>>,
}

impl AppState {
    pub fn new(queue: Arc<JobQueue>, credentials: CredentialStore) -> Self {
        Self {
            queue,
            credentials: Arc::new(credentials),
            reference_image: Arc::new(RwLock::new(None)),
        }
    }
}

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::models::credentials::Credentials;

/// Single-record store for the user's credentials, backed by a JSON file.
pub struct CredentialStore {
    path: PathBuf,
    current: RwLock<Credentials>,
}

impl CredentialStore {
    /// Opens the store, reading the saved record if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialStoreError> {
        let path = path.into();
        let current = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(CredentialStoreError::Parse)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No saved credentials, starting empty");
                Credentials::default()
            }
            Err(e) => return Err(CredentialStoreError::Io(e)),
        };

        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last saved record, or all-empty if nothing was ever saved.
    pub async fn load(&self) -> Credentials {
        self.current.read().await.clone()
    }

    /// Overwrites the saved record. Subsequent `load` calls see it at once.
    pub async fn save(&self, credentials: Credentials) -> Result<(), CredentialStoreError> {
        let mut current = self.current.write().await;

        let payload = serde_json::to_vec_pretty(&credentials).map_err(CredentialStoreError::Parse)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        *current = credentials;
        tracing::info!(
            path = %self.path.display(),
            bearer_token_set = current.has_bearer_token(),
            "Credentials saved"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential record is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

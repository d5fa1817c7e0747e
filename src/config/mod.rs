use std::path::PathBuf;

use serde::Deserialize;

use crate::models::generation::AspectRatio;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Unused by the batch runner.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the Whisk proxy exposing `/upload` and `/generate`
    pub whisk_api_base: String,

    /// JSON file holding the saved credentials record
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Directory that exported images are written to
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Aspect ratio used by the batch runner
    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Reference image attached to every job of a batch run (optional)
    #[serde(default)]
    pub reference_image_path: Option<PathBuf>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("whisk_config.json")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("downloads")
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

//! Application configuration.
//!
//! Reads `picpost.toml`:
//!
//! ```toml
//! data-dir = "./data"
//! public-base-url = "http://localhost:8080/blobs"
//!
//! [composer]
//! collection = "posts"
//! step-timeout-ms = 30000
//! ```

use std::path::{Path, PathBuf};

use picpost_compose::ComposerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppConfig {
    /// Holds `posts.redb` and the `blobs/` directory.
    pub data_dir: PathBuf,

    /// Prefix of the public URL handed out for uploaded images.
    pub public_base_url: String,

    pub composer: ComposerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            public_base_url: "http://localhost:8080/blobs".to_string(),
            composer: ComposerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.composer.validate()?;
        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("posts.redb")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid composer config: {0}")]
    Invalid(String),

    #[error("failed to parse composer config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Composer settings, usually the `[composer]` table of the app config.
///
/// ```toml
/// [composer]
/// collection = "posts"
/// image-key = "posts/{id}/image"
/// step-timeout-ms = 30000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ComposerConfig {
    /// Document collection posts are written to.
    pub collection: String,
    /// Blob key template for a post's image. `{id}` is the post id.
    pub image_key: String,
    /// Upper bound for each external call of a submission.
    pub step_timeout_ms: u64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            collection: "posts".to_string(),
            image_key: "posts/{id}/image".to_string(),
            step_timeout_ms: 30_000,
        }
    }
}

impl ComposerConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ComposerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.is_empty() || self.collection.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "collection must be a single non-empty name, got {:?}",
                self.collection
            )));
        }
        if !self.image_key.contains("{id}") {
            return Err(ConfigError::Invalid(format!(
                "image-key must contain {{id}}, got {:?}",
                self.image_key
            )));
        }
        if self.step_timeout_ms == 0 {
            return Err(ConfigError::Invalid("step-timeout-ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn image_key_for(&self, post_id: &str) -> String {
        self.image_key.replace("{id}", post_id)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

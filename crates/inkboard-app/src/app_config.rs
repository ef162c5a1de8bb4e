//! Application configuration.

use crate::replay::{ReplayError, ReplayResult};
use inkboard_core::EngineConfig;
use inkboard_core::store::DEFAULT_AUTHOR;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shell settings plus the engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// CSS background color.
    pub background: String,
    /// Author tag for new strokes.
    pub author: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background: "#fafafa".to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> ReplayResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReplayError::Parse(e.to_string()))?;
        config.engine.validate()?;
        if config.width == 0 || config.height == 0 {
            return Err(ReplayError::Parse(format!(
                "surface size must be positive, got {}x{}",
                config.width, config.height
            )));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded app config from {}", path.display());
        Ok(config)
    }
}

/// Viewer settings loaded from TOML
use lathe3d_core::RevolutionParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::renderer::DEFAULT_EDGE_RAMP;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Parameters used when re-revolving the scene's profile curve
    pub revolution: RevolutionParams,
    /// Degrees turned per arrow-key press
    pub rotation_step: f64,
    /// Near-plane shift per zoom key press
    pub zoom_step: f64,
    /// Characters for edges, far to near
    pub edge_ramp: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            revolution: RevolutionParams::default(),
            rotation_step: 3.0,
            zoom_step: 0.1,
            edge_ramp: DEFAULT_EDGE_RAMP.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

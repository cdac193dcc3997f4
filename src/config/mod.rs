//! Configuration types for the PIV pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for profile export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Separator between exported values
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Output directory for exported profiles
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_separator() -> String {
    crate::core::writers::DEFAULT_SEPARATOR.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(crate::core::writers::DEFAULT_OUTPUT_DIR)
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            output_dir: default_output_dir(),
        }
    }
}

/// Configuration for PNG rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Plot width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Plot height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Margin fraction added on both sides of the autoscaled value axis
    #[serde(default = "default_autoscale_margin")]
    pub autoscale_margin: f64,
}

fn default_width() -> u32 {
    crate::visualization::DEFAULT_WIDTH
}

fn default_height() -> u32 {
    crate::visualization::DEFAULT_HEIGHT
}

fn default_autoscale_margin() -> f64 {
    crate::processors::profile::AUTOSCALE_MARGIN
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            autoscale_margin: default_autoscale_margin(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

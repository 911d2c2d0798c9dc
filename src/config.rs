use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use bandlight::{AnalysisConfig, ColorMapping};

use crate::report::OutputFormat;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub color: ColorMapping,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub channel: usize,
    /// Samples between block starts; the FFT size when unset
    #[serde(default)]
    pub hop_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// `bandlight.toml` in the working directory, then the per-user config.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("bandlight.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("bandlight").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("bandlight").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

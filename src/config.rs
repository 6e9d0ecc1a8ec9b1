//! File-based configuration
//!
//! A single JSON file carries the risk, exit, and indicator settings. Every
//! section falls back to its defaults when omitted, so a minimal deployment
//! can run with an empty object.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::exits::ExitEngineConfig;
use crate::indicators::IndicatorConfig;
use crate::sizing::RiskConfig;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub exits: ExitEngineConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

//! TOML configuration file support.
//!
//! Reader settings and a default filter chain can live in a config file:
//!
//! ```toml
//! # mzaccess.toml
//! [reader]
//! accept_only_ms_level = "2-"
//! ignore_zero_intensity_points = true
//! use_index_cache = false
//!
//! [filters]
//! chain = ["scanTime [600,1200]", "mzWindow [100,2000]"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use mzaccess::source::ListConfig;

/// Root configuration structure for mzaccess.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// List construction settings.
    #[serde(default)]
    pub reader: ListConfig,

    /// Filter chain applied to every opened run.
    #[serde(default)]
    pub filters: FilterConfig,
}

/// Filter commands, applied in order.
#[derive(Debug, Default, Deserialize)]
pub struct FilterConfig {
    /// Commands in the filter command language.
    #[serde(default)]
    pub chain: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

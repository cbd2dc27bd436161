//! Command line configuration.
//!
//! Read from `./spanbind.toml`, falling back to
//! `<config dir>/spanbind/config.toml`:
//!
//! ```toml
//! database_url = "sqlite::memory:;lenient=true"
//! format = "json"
//! log = "spanbind=debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const FILE_NAME: &str = "spanbind.toml";

/// How the command line tool prints results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Connection URI, properties included.
    pub database_url: Option<String>,
    pub format: Option<OutputFormat>,
    /// `tracing` filter directive.
    pub log: Option<String>,
}

impl CliConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Files consulted by [`CliConfig::load`], in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("spanbind").join("config.toml"));
        }
        paths
    }

    /// Load the first config file that exists, or the defaults.
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

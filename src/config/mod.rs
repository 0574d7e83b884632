//! Configuration handling for pagechunks
//!
//! Parses and manages pagechunks.toml configuration files.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::plugins::page_chunks::check_manifest_filename;

pub use schema::*;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    pub project: ProjectConfig,

    /// Entry points for bundling
    #[serde(default)]
    pub entry: EntryConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Page chunk settings
    #[serde(default)]
    pub pages: PagesConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", canonical_path.display()))?;

        // Set root directory to the directory containing the config file
        config.root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        config.validate()?;

        Ok(config)
    }

    /// Create a default configuration rooted at `root`
    pub fn default_config(root: impl Into<PathBuf>) -> Self {
        Self {
            project: ProjectConfig {
                name: "my-app".to_string(),
                version: "0.1.0".to_string(),
            },
            entry: EntryConfig::default(),
            output: OutputConfig::default(),
            pages: PagesConfig::default(),
            root: root.into(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.entry.is_empty() && !self.pages.enabled {
            anyhow::bail!("At least one entrypoint must be specified when pages are disabled");
        }

        if self.pages.enabled {
            check_manifest_filename(&self.pages.manifest)?;
        }

        for (name, specifier) in self.entry.named() {
            let full_path = self.root.join(&specifier);
            if !full_path.exists() {
                anyhow::bail!(
                    "Entrypoint '{}' points to non-existent file: {}",
                    name,
                    full_path.display()
                );
            }
        }

        Ok(())
    }

    /// Get the absolute output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.dir)
    }
}

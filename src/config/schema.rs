//! Configuration schema definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Project metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Build entry points
///
/// A bare string is a single unnamed entry. A table maps entry names to
/// specifiers and is the only shape plugins can register entries into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryConfig {
    Single(String),
    Named(BTreeMap<String, String>),
}

impl Default for EntryConfig {
    fn default() -> Self {
        EntryConfig::Named(BTreeMap::new())
    }
}

impl EntryConfig {
    /// Entry names paired with their specifiers
    ///
    /// A single entry is reported under the name `main`.
    pub fn named(&self) -> Vec<(String, String)> {
        match self {
            EntryConfig::Single(specifier) => vec![("main".to_string(), specifier.clone())],
            EntryConfig::Named(map) => map
                .iter()
                .map(|(name, specifier)| (name.clone(), specifier.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            EntryConfig::Single(_) => false,
            EntryConfig::Named(map) => map.is_empty(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Hash assets for cache busting
    #[serde(default = "default_true")]
    pub hash: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            hash: true,
        }
    }
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_true() -> bool {
    true
}

/// Page chunk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Split pages and emit a manifest
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directories scanned for page modules, relative to the project root
    #[serde(default = "default_pages_dirs")]
    pub dirs: Vec<String>,

    /// Filename of the emitted manifest
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Globs a file must match to be a page
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Globs that exclude a file from being a page
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dirs: default_pages_dirs(),
            manifest: default_manifest(),
            include: default_include(),
            exclude: default_exclude(),
        }
    }
}

fn default_pages_dirs() -> Vec<String> {
    vec!["src/pages".to_string()]
}

fn default_manifest() -> String {
    "pages-manifest.json".to_string()
}

fn default_include() -> Vec<String> {
    vec!["**/*.{js,jsx,ts,tsx,mjs}".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/*.test.*".to_string(),
        "**/*.spec.*".to_string(),
        "**/__tests__/**".to_string(),
    ]
}

//! Page discovery
//!
//! Turns configured page directories into the set of page modules, each
//! keyed by a logical name derived from its path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::PageChunksError;
use crate::utils::path_to_module_id;

/// A discovered page module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Manifest key, e.g. `catalog` for `pages/catalog/index.js`
    pub name: String,

    /// Absolute path of the page source
    pub path: PathBuf,
}

/// All pages of one build, ordered by logical name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet {
    entries: BTreeMap<String, PageEntry>,
}

impl PageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page, rejecting a second page with the same logical name
    pub fn insert(&mut self, entry: PageEntry) -> Result<(), PageChunksError> {
        if let Some(existing) = self.entries.get(&entry.name) {
            return Err(PageChunksError::NameCollision {
                name: entry.name,
                first: existing.path.clone(),
                second: entry.path,
            });
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PageEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Page directories validated at registration time
///
/// Existence is only checked when the directories are scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDirs {
    dirs: Vec<PathBuf>,
}

impl PageDirs {
    /// Validate configured directories and make them absolute against `root`
    pub fn new<S: AsRef<str>>(root: &Path, dirs: &[S]) -> Result<Self, PageChunksError> {
        if dirs.is_empty() {
            return Err(PageChunksError::NoPageDirs);
        }

        let dirs = dirs
            .iter()
            .map(|dir| {
                let dir = dir.as_ref();
                if dir.trim().is_empty() || dir.contains('\0') {
                    return Err(PageChunksError::InvalidPageDir(dir.to_string()));
                }
                let path = Path::new(dir);
                Ok(if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dirs })
    }

    /// Directories that are already absolute, e.g. decoded from the entry reference
    pub fn from_paths(dirs: Vec<PathBuf>) -> Result<Self, PageChunksError> {
        if dirs.is_empty() {
            return Err(PageChunksError::NoPageDirs);
        }
        Ok(Self { dirs })
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.dirs
    }
}

/// Include/exclude globs deciding which files are pages
#[derive(Debug, Clone)]
pub struct PageFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PageFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: build_glob_set(include)?,
            exclude: build_glob_set(exclude)?,
        })
    }

    /// Match a path relative to its page root, using `/` separators
    pub fn is_match(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

fn build_glob_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid page glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

/// Scan every page directory and collect the page set
pub fn resolve(dirs: &PageDirs, filter: &PageFilter) -> Result<PageSet> {
    let mut pages = PageSet::new();

    for root in dirs.as_slice() {
        if !root.is_dir() {
            return Err(PageChunksError::MissingPageDir(root.clone()).into());
        }

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            if !filter.is_match(&path_to_module_id(relative)) {
                continue;
            }

            if let Err(err) = fs::read_to_string(path) {
                warn!("Skipping page {}: {}", path.display(), err);
                continue;
            }

            let Some(name) = logical_name(relative) else {
                warn!("Skipping page {}: cannot derive a page name", path.display());
                continue;
            };

            debug!("Discovered page '{}' at {}", name, path.display());
            pages.insert(PageEntry {
                name,
                path: path.to_path_buf(),
            })?;
        }
    }

    Ok(pages)
}

/// Derive a page's logical name from its path relative to the page root
///
/// The extension is dropped, separators become `/`, and a trailing `index`
/// segment names its directory.
pub fn logical_name(relative: &Path) -> Option<String> {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    let file = segments.pop()?;
    let stem = Path::new(&file)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())?;

    if stem != "index" || segments.is_empty() {
        segments.push(stem);
    }

    Some(segments.join("/"))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

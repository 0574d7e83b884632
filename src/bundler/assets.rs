//! In-memory output assets
//!
//! Rendering fills this set; emit hooks may add and remove entries before it
//! is written to disk.

use std::collections::BTreeMap;

use super::ChunkId;

/// Who produced an output asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Rendered from a chunk
    Chunk(ChunkId),
    /// Emitted by a plugin, identified by plugin name
    Plugin(String),
}

/// A single file in the build output
#[derive(Debug, Clone)]
pub struct OutputAsset {
    pub content: String,
    pub origin: AssetOrigin,
}

impl OutputAsset {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// All assets of a build keyed by output filename
#[derive(Debug, Default)]
pub struct OutputAssets {
    assets: BTreeMap<String, OutputAsset>,
}

impl OutputAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an asset, returning the one it replaced
    pub fn insert(
        &mut self,
        filename: impl Into<String>,
        content: impl Into<String>,
        origin: AssetOrigin,
    ) -> Option<OutputAsset> {
        self.assets.insert(
            filename.into(),
            OutputAsset {
                content: content.into(),
                origin,
            },
        )
    }

    pub fn remove(&mut self, filename: &str) -> Option<OutputAsset> {
        self.assets.remove(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&OutputAsset> {
        self.assets.get(filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.assets.contains_key(filename)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputAsset)> {
        self.assets.iter().map(|(name, asset)| (name.as_str(), asset))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

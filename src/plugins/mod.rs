//! Plugin system for pagechunks
//!
//! Provides a Rollup-style plugin API for hooking into the build phases:
//! options, module resolution and loading, and the emit phase.

pub mod page_chunks;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::bundler::{ChunkGraph, OutputAssets};
use crate::config::EntryConfig;

pub use page_chunks::PageChunksPlugin;

/// Plugin hook context
pub struct PluginContext {
    /// Project root directory
    pub root: PathBuf,
}

/// Result of a resolve hook
pub enum ResolveResult {
    /// Continue to next plugin
    Skip,
    /// Resolved module id
    Resolved(String),
}

/// Result of a load hook
pub enum LoadResult {
    /// Continue to next plugin
    Skip,
    /// Loaded content
    Loaded {
        content: String,
        /// Optional loader type (js, css, json, etc.)
        loader: Option<String>,
    },
}

/// Plugin trait - implement this to hook into a build
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name for logging and debugging
    fn name(&self) -> &str;

    /// Called before entry points are resolved; may register entries
    async fn options(&self, _entry: &mut EntryConfig, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Called when the build starts
    async fn build_start(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Called when the build ends
    async fn build_end(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Resolve an import specifier to a module id
    /// Return ResolveResult::Skip to let other plugins handle it
    async fn resolve_id(
        &self,
        _specifier: &str,
        _importer: Option<&Path>,
        _ctx: &PluginContext,
    ) -> Result<ResolveResult> {
        Ok(ResolveResult::Skip)
    }

    /// Load the content of a module
    /// Return LoadResult::Skip to let other plugins handle it
    async fn load(&self, _id: &str, _ctx: &PluginContext) -> Result<LoadResult> {
        Ok(LoadResult::Skip)
    }

    /// Called once after chunks are rendered and before assets are written
    async fn generate_bundle(
        &self,
        _chunks: &ChunkGraph,
        _assets: &mut OutputAssets,
        _ctx: &PluginContext,
    ) -> Result<()> {
        Ok(())
    }
}

/// Plugin manager
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
    context: PluginContext,
}

impl PluginManager {
    /// Create a new plugin manager
    pub fn new(root: PathBuf) -> Self {
        Self {
            plugins: Vec::new(),
            context: PluginContext { root },
        }
    }

    /// Register a plugin
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        debug!("Registering plugin: {}", plugin.name());
        self.plugins.push(plugin);
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run options hooks
    pub async fn run_options(&self, entry: &mut EntryConfig) -> Result<()> {
        for plugin in &self.plugins {
            plugin.options(entry, &self.context).await?;
        }
        Ok(())
    }

    /// Run build_start hooks
    pub async fn run_build_start(&self) -> Result<()> {
        for plugin in &self.plugins {
            plugin.build_start(&self.context).await?;
        }
        Ok(())
    }

    /// Run build_end hooks
    pub async fn run_build_end(&self) -> Result<()> {
        for plugin in &self.plugins {
            plugin.build_end(&self.context).await?;
        }
        Ok(())
    }

    /// Run resolve_id hooks
    pub async fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&Path>,
    ) -> Result<Option<String>> {
        for plugin in &self.plugins {
            match plugin.resolve_id(specifier, importer, &self.context).await? {
                ResolveResult::Skip => continue,
                ResolveResult::Resolved(id) => return Ok(Some(id)),
            }
        }
        Ok(None)
    }

    /// Run load hooks
    pub async fn load(&self, id: &str) -> Result<Option<(String, Option<String>)>> {
        for plugin in &self.plugins {
            match plugin.load(id, &self.context).await? {
                LoadResult::Skip => continue,
                LoadResult::Loaded { content, loader } => {
                    return Ok(Some((content, loader)));
                }
            }
        }
        Ok(None)
    }

    /// Run generate_bundle hooks in registration order
    pub async fn run_generate_bundle(
        &self,
        chunks: &ChunkGraph,
        assets: &mut OutputAssets,
    ) -> Result<()> {
        for plugin in &self.plugins {
            plugin.generate_bundle(chunks, assets, &self.context).await?;
        }
        Ok(())
    }
}

//! Page chunk splitting
//!
//! Registers a generated entry that dynamically imports every page, lets
//! the bundler split each page into its own chunk, and at emit time
//! replaces the generated entry's files with a manifest mapping page names
//! to their chunk files.

mod binder;
mod manifest;
mod pages;
mod virtual_entry;
mod walker;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{LoadResult, Plugin, PluginContext, ResolveResult};
use crate::bundler::{ChunkGraph, OutputAssets};
use crate::config::{EntryConfig, PagesConfig};
use crate::error::PageChunksError;

pub use binder::register;
pub use manifest::{check_manifest_filename, finalize, PageManifest};
pub use pages::{logical_name, resolve, PageDirs, PageEntry, PageFilter, PageSet};
pub use virtual_entry::{decode_reference, encode_reference, synthesize};
pub use walker::{find_root, walk};

/// Entry name of the generated pages module
pub const ENTRY_NAME: &str = "__pages_entry__";

const PLUGIN_NAME: &str = "page-chunks";

/// Splits every page into its own chunk and emits a page manifest
pub struct PageChunksPlugin {
    config: PagesConfig,
    filter: PageFilter,

    /// Pages resolved by the current build; cleared when a build starts
    pages: Mutex<Option<PageSet>>,
}

impl PageChunksPlugin {
    pub fn new(config: PagesConfig) -> Result<Self> {
        check_manifest_filename(&config.manifest)?;
        let filter = PageFilter::new(&config.include, &config.exclude)?;
        Ok(Self {
            config,
            filter,
            pages: Mutex::new(None),
        })
    }

    /// Resolve the page set for the configured directories without building
    pub fn discover(&self, root: &Path) -> Result<PageSet> {
        let dirs = PageDirs::new(root, &self.config.dirs)?;
        resolve(&dirs, &self.filter)
    }
}

#[async_trait]
impl Plugin for PageChunksPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    async fn options(&self, entry: &mut EntryConfig, ctx: &PluginContext) -> Result<()> {
        let dirs = PageDirs::new(&ctx.root, &self.config.dirs)?;
        register(entry, ENTRY_NAME, &encode_reference(&dirs))?;
        Ok(())
    }

    async fn build_start(&self, _ctx: &PluginContext) -> Result<()> {
        *self.pages.lock() = None;
        Ok(())
    }

    async fn resolve_id(
        &self,
        specifier: &str,
        _importer: Option<&Path>,
        _ctx: &PluginContext,
    ) -> Result<ResolveResult> {
        Ok(match virtual_entry::resolve_reference(specifier) {
            Some(id) => ResolveResult::Resolved(id),
            None => ResolveResult::Skip,
        })
    }

    async fn load(&self, id: &str, _ctx: &PluginContext) -> Result<LoadResult> {
        let Some(dirs) = decode_reference(id)? else {
            return Ok(LoadResult::Skip);
        };

        let dirs = PageDirs::from_paths(dirs)?;
        let pages = resolve(&dirs, &self.filter)?;
        info!("Discovered {} page(s)", pages.len());

        let content = synthesize(&pages);
        *self.pages.lock() = Some(pages);

        Ok(LoadResult::Loaded {
            content,
            loader: Some("js".to_string()),
        })
    }

    async fn generate_bundle(
        &self,
        chunks: &ChunkGraph,
        assets: &mut OutputAssets,
        _ctx: &PluginContext,
    ) -> Result<()> {
        let (_, root) = find_root(chunks, ENTRY_NAME)?;
        let pages = self
            .pages
            .lock()
            .take()
            .ok_or(PageChunksError::PagesNotResolved)?;

        let manifest = walk(chunks, ENTRY_NAME, &pages)?;
        finalize(assets, root, &manifest, &self.config.manifest, PLUGIN_NAME)?;

        debug!("Wrote {} with {} page(s)", self.config.manifest, manifest.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::bundler::{AssetOrigin, Chunk};

    fn plugin(dirs: &[&str]) -> PageChunksPlugin {
        PageChunksPlugin::new(PagesConfig {
            dirs: dirs.iter().map(|d| d.to_string()).collect(),
            ..PagesConfig::default()
        })
        .unwrap()
    }

    fn ctx(root: &Path) -> PluginContext {
        PluginContext {
            root: root.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_options_registers_pages_entry() {
        let plugin = plugin(&["src/pages"]);
        let mut entry = EntryConfig::Named(BTreeMap::new());
        plugin.options(&mut entry, &ctx(Path::new("/app"))).await.unwrap();

        let named = entry.named();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].0, ENTRY_NAME);
        assert_eq!(
            decode_reference(&virtual_entry::resolve_reference(&named[0].1).unwrap())
                .unwrap()
                .unwrap(),
            vec![PathBuf::from("/app/src/pages")]
        );
    }

    #[tokio::test]
    async fn test_options_rejects_single_entry() {
        let plugin = plugin(&["src/pages"]);
        let mut entry = EntryConfig::Single("src/index.js".into());
        let err = plugin.options(&mut entry, &ctx(Path::new("/app"))).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PageChunksError>(),
            Some(PageChunksError::EntryNotExtensible(_))
        ));
    }

    #[tokio::test]
    async fn test_options_rejects_empty_dirs() {
        let plugin = plugin(&[]);
        let mut entry = EntryConfig::default();
        let err = plugin.options(&mut entry, &ctx(Path::new("/app"))).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PageChunksError>(),
            Some(PageChunksError::NoPageDirs)
        ));
    }

    #[tokio::test]
    async fn test_generate_bundle_without_load_is_invariant_violation() {
        let plugin = plugin(&["src/pages"]);
        let mut chunks = ChunkGraph::new();
        chunks.add_chunk(Chunk::entry(ENTRY_NAME.into(), vec![0]).with_files(["e.js"]));
        let mut assets = OutputAssets::new();
        assets.insert("e.js", "", AssetOrigin::Chunk(0));

        let err = plugin
            .generate_bundle(&chunks, &mut assets, &ctx(Path::new("/app")))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PageChunksError>(),
            Some(PageChunksError::PagesNotResolved)
        ));
        assert!(assets.contains("e.js"));
    }

    #[tokio::test]
    async fn test_missing_root_chunk_is_reported_first() {
        let plugin = plugin(&["src/pages"]);
        let mut assets = OutputAssets::new();
        let err = plugin
            .generate_bundle(&ChunkGraph::new(), &mut assets, &ctx(Path::new("/app")))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PageChunksError>(),
            Some(PageChunksError::MissingRootChunk(_))
        ));
    }

    #[tokio::test]
    async fn test_load_scans_and_build_start_resets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pages")).unwrap();
        std::fs::write(dir.path().join("pages/home.js"), "export default 1;").unwrap();

        let plugin = plugin(&["pages"]);
        let ctx = ctx(dir.path());
        let mut entry = EntryConfig::default();
        plugin.options(&mut entry, &ctx).await.unwrap();

        let specifier = entry.named()[0].1.clone();
        let id = match plugin.resolve_id(&specifier, None, &ctx).await.unwrap() {
            ResolveResult::Resolved(id) => id,
            ResolveResult::Skip => panic!("pages entry was not resolved"),
        };
        let content = match plugin.load(&id, &ctx).await.unwrap() {
            LoadResult::Loaded { content, .. } => content,
            LoadResult::Skip => panic!("pages entry was not loaded"),
        };

        assert!(content.contains("chunkName: \"home\""));
        assert!(plugin.pages.lock().is_some());

        plugin.build_start(&ctx).await.unwrap();
        assert!(plugin.pages.lock().is_none());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/pages/catalog")).unwrap();
        std::fs::write(dir.path().join("src/pages/catalog/index.js"), "").unwrap();

        let pages = plugin(&["src/pages"]).discover(dir.path()).unwrap();
        assert_eq!(pages.names().collect::<Vec<_>>(), vec!["catalog"]);
    }
}

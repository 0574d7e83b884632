//! Core bundler implementation
//!
//! Builds the module graph from the configured entries, splits it into
//! chunks at dynamic imports, renders the chunks into an in-memory asset
//! set, hands that set to the plugins' emit hooks, and writes it out.

mod assets;
mod chunk;
mod graph;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::cli::BuildOptions;
use crate::config::{Config, EntryConfig};
use crate::plugins::{PageChunksPlugin, PluginManager};
use crate::resolver::{rewrite_dynamic_imports, Resolver};
use crate::utils::{hash_filename, path_to_module_id, sanitize_file_name};

pub use assets::{AssetOrigin, OutputAsset, OutputAssets};
pub use chunk::{Chunk, ChunkGraph, ChunkId, ChunkType};
pub use graph::{Dependency, Edge, ImportKind, Module, ModuleGraph, ModuleId, ModuleType};

/// Result of a build operation
#[derive(Debug)]
pub struct BuildResult {
    /// Files in the final output
    pub bundles: Vec<BundleInfo>,

    /// Chunks produced by the build
    pub chunks: ChunkGraph,

    /// The final asset set, after emit hooks ran
    pub assets: OutputAssets,
}

/// Information about a generated bundle
#[derive(Debug)]
pub struct BundleInfo {
    /// Output file path
    pub output_path: PathBuf,

    /// Bundle size in bytes
    pub size: usize,
}

/// The main bundler
pub struct Bundler {
    /// Project configuration
    config: Arc<Config>,

    /// Build options
    options: BuildOptions,

    /// Module resolver
    resolver: Resolver,

    /// Registered plugins
    plugins: PluginManager,

    /// Module graph of the current build
    graph: Arc<RwLock<ModuleGraph>>,
}

impl Bundler {
    /// Create a new bundler instance with the built-in plugins the config enables
    pub fn new(config: Config, options: BuildOptions) -> Result<Self> {
        let config = Arc::new(config);
        let mut plugins = PluginManager::new(config.root.clone());

        if config.pages.enabled {
            plugins.register(Arc::new(PageChunksPlugin::new(config.pages.clone())?));
        }

        Ok(Self {
            config,
            options,
            resolver: Resolver::new(),
            plugins,
            graph: Arc::new(RwLock::new(ModuleGraph::new())),
        })
    }

    /// Get the absolute output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.options
            .outdir
            .clone()
            .unwrap_or_else(|| self.config.output_dir())
    }

    /// Build the project
    pub async fn build(&self) -> Result<BuildResult> {
        let start = Instant::now();

        // Nothing carries over from a previous build
        *self.graph.write() = ModuleGraph::new();

        // 1. Let plugins register entries before anything is resolved
        let mut entry = self.config.entry.clone();
        self.plugins.run_options(&mut entry).await?;
        self.plugins.run_build_start().await?;

        // 2. Build the module graph from entrypoints
        info!("Building module graph...");
        let entries = self.build_module_graph(&entry).await?;

        // 3. Split into chunks
        info!("Generating chunks...");
        let mut chunks = self.generate_chunks(&entries);

        // 4. Render chunks into memory
        info!("Rendering {} chunk(s)...", chunks.len());
        let mut assets = self.render_chunks(&mut chunks)?;

        // 5. Emit phase
        self.plugins.run_generate_bundle(&chunks, &mut assets).await?;

        // 6. Write output
        let bundles = if self.options.write {
            info!("Writing bundles...");
            self.write_assets(&assets)?
        } else {
            self.describe_assets(&assets)
        };

        self.plugins.run_build_end().await?;

        debug!("Build completed in {:?}", start.elapsed());

        Ok(BuildResult {
            bundles,
            chunks,
            assets,
        })
    }

    /// Build the module graph by traversing from entrypoints
    async fn build_module_graph(&self, entry: &EntryConfig) -> Result<Vec<(String, ModuleId)>> {
        let mut entries = Vec::new();

        for (name, specifier) in entry.named() {
            debug!("Processing entrypoint: {} -> {:?}", name, specifier);

            let id = match self.plugins.resolve_id(&specifier, None).await? {
                Some(id) => id,
                None => path_to_module_id(&self.config.root.join(&specifier)),
            };

            let module_id = self
                .process_module(id)
                .await
                .with_context(|| format!("Failed to build entrypoint '{}'", name))?;
            entries.push((name, module_id));
        }

        Ok(entries)
    }

    /// Process a single module and its dependencies
    ///
    /// Uses Box::pin for async recursion to avoid infinite type size issues
    async fn process_module(&self, id: String) -> Result<ModuleId> {
        let is_virtual = id.starts_with('\0');

        let (id, path) = if is_virtual {
            (id, None)
        } else {
            let canonical_path = fs::canonicalize(&id)
                .with_context(|| format!("Failed to resolve module path: {}", id))?;
            (path_to_module_id(&canonical_path), Some(canonical_path))
        };

        // Check if already processed
        {
            let graph = self.graph.read();
            if let Some(existing) = graph.get_module_id(&id) {
                return Ok(existing);
            }
        }

        let (source, module_type) = self.load_module(&id, path.as_deref()).await?;
        let dependencies = self.resolver.extract_dependencies(&source, &module_type);

        let module = Module {
            id: id.clone(),
            path: path.clone(),
            source,
            module_type,
        };

        let module_id = {
            let mut graph = self.graph.write();
            graph.add_module(module)
        };

        for dep in dependencies {
            let target = match self.plugins.resolve_id(&dep.specifier, path.as_deref()).await? {
                Some(target) => Some(target),
                None => self
                    .resolver
                    .resolve(&dep.specifier, path.as_deref())?
                    .map(|resolved| path_to_module_id(&resolved)),
            };

            let Some(target) = target else {
                debug!("Leaving '{}' unresolved in {}", dep.specifier, id);
                continue;
            };

            let dep_id = Box::pin(self.process_module(target)).await?;

            let mut graph = self.graph.write();
            graph.add_dependency(
                module_id,
                Edge {
                    target: dep_id,
                    kind: dep.kind,
                    specifier: dep.specifier,
                    chunk_name: dep.chunk_name,
                },
            );
        }

        Ok(module_id)
    }

    /// Load module source through plugins, falling back to disk
    async fn load_module(&self, id: &str, path: Option<&Path>) -> Result<(String, ModuleType)> {
        if let Some((content, loader)) = self.plugins.load(id).await? {
            let module_type = loader
                .as_deref()
                .map(ModuleType::from_extension)
                .or_else(|| path.map(Module::detect_type))
                .unwrap_or(ModuleType::JavaScript);
            return Ok((content, module_type));
        }

        let Some(path) = path else {
            anyhow::bail!("No plugin could load virtual module {:?}", id);
        };

        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read module: {}", path.display()))?;
        Ok((source, Module::detect_type(path)))
    }

    /// Split the module graph into chunks
    ///
    /// Every entry gets a chunk of its statically reachable modules. Every
    /// dynamically imported module gets one async chunk, shared by all
    /// importers, and becomes a child of each importing chunk.
    fn generate_chunks(&self, entries: &[(String, ModuleId)]) -> ChunkGraph {
        let graph = self.graph.read();
        let mut chunks = ChunkGraph::new();
        let mut split_point_to_chunk: HashMap<ModuleId, ChunkId> = HashMap::new();
        let mut explicitly_named: HashSet<ChunkId> = HashSet::new();
        let mut queue = VecDeque::new();

        for (name, entry_id) in entries {
            let module_ids = graph.get_static_reachable(*entry_id);
            queue.push_back(chunks.add_chunk(Chunk::entry(name.clone(), module_ids)));
        }

        while let Some(chunk_id) = queue.pop_front() {
            let module_ids = chunks
                .get(chunk_id)
                .map(|chunk| chunk.module_ids.clone())
                .unwrap_or_default();

            for module_id in module_ids {
                for edge in graph.dynamic_imports(module_id) {
                    let child = match split_point_to_chunk.get(&edge.target) {
                        Some(&existing) => {
                            // An annotated import names the chunk over a file stem
                            if let Some(name) = &edge.chunk_name {
                                if explicitly_named.insert(existing) {
                                    if let Some(chunk) = chunks.get_mut(existing) {
                                        chunk.name = name.clone();
                                    }
                                } else if let Some(chunk) = chunks.get(existing) {
                                    if &chunk.name != name {
                                        warn!(
                                            "Ignoring chunkName \"{}\" for '{}': chunk is already named \"{}\"",
                                            name, edge.specifier, chunk.name
                                        );
                                    }
                                }
                            }
                            existing
                        }
                        None => {
                            let name = match &edge.chunk_name {
                                Some(name) => name.clone(),
                                None => graph
                                    .get_module(edge.target)
                                    .map(Module::stem)
                                    .unwrap_or_else(|| "chunk".to_string()),
                            };
                            let module_ids = graph.get_static_reachable(edge.target);
                            let created = chunks.add_chunk(Chunk::async_chunk(name, module_ids));
                            if edge.chunk_name.is_some() {
                                explicitly_named.insert(created);
                            }
                            split_point_to_chunk.insert(edge.target, created);
                            queue.push_back(created);
                            created
                        }
                    };
                    chunks.add_child(chunk_id, child);
                }
            }
        }

        debug!("Generated {} chunk(s) from {} module(s)", chunks.len(), graph.len());

        chunks
    }

    /// Render every chunk into the asset set, children before parents
    fn render_chunks(&self, chunks: &mut ChunkGraph) -> Result<OutputAssets> {
        let graph = self.graph.read();
        let mut assets = OutputAssets::new();
        let mut split_files: HashMap<ModuleId, String> = HashMap::new();

        for chunk_id in chunks.post_order() {
            let Some(chunk) = chunks.get(chunk_id) else {
                continue;
            };

            let mut code = String::new();
            let mut css = String::new();

            if chunk.chunk_type == ChunkType::Entry {
                code.push_str(RUNTIME_HEADER);
            }

            for &module_id in &chunk.module_ids {
                let Some(module) = graph.get_module(module_id) else {
                    continue;
                };

                match module.module_type {
                    ModuleType::Css => {
                        css.push_str(&format!("/* {} */\n{}\n", module.id, module.source));
                    }
                    ModuleType::Json => {
                        code.push_str(&wrap_module(
                            &module.id,
                            &format!("module.exports = {};", module.source.trim()),
                        ));
                    }
                    _ => {
                        let body = rewrite_dynamic_imports(&module.source, |specifier| {
                            let edge = graph.dynamic_imports(module_id).find(|e| e.specifier == specifier)?;
                            let file = split_files.get(&edge.target)?;
                            let target = graph.get_module(edge.target)?;
                            Some(format!(
                                "__pagechunks_load__({}, {})",
                                js_string(file),
                                js_string(&target.id)
                            ))
                        });
                        code.push_str(&wrap_module(&module.id, &body));
                    }
                }
            }

            if chunk.chunk_type == ChunkType::Entry {
                if let Some(entry_module) = chunk.entry_module().and_then(|id| graph.get_module(id)) {
                    code.push_str(&format!(
                        "\n// Execute entry point\n__pagechunks_require__({});\n",
                        js_string(&entry_module.id)
                    ));
                }
            }

            let base = sanitize_file_name(&chunk.name);
            let mut files = Vec::new();

            let js_file = self.unique_filename(&assets, &base, code.as_bytes(), "js");
            assets.insert(js_file.clone(), code, AssetOrigin::Chunk(chunk_id));
            files.push(js_file.clone());

            if !css.is_empty() {
                let css_file = self.unique_filename(&assets, &base, css.as_bytes(), "css");
                assets.insert(css_file.clone(), css, AssetOrigin::Chunk(chunk_id));
                files.push(css_file);
            }

            if let Some(entry_module) = chunk.entry_module() {
                split_files.insert(entry_module, js_file);
            }

            debug!("Rendered chunk '{}' -> {:?}", chunk.name, files);

            if let Some(chunk) = chunks.get_mut(chunk_id) {
                chunk.files = files;
            }
        }

        Ok(assets)
    }

    /// Pick an output filename that no rendered asset uses yet
    fn unique_filename(&self, assets: &OutputAssets, base: &str, content: &[u8], ext: &str) -> String {
        let make = |base: &str| {
            if self.config.output.hash {
                hash_filename(base, content, ext)
            } else {
                format!("{}.{}", base, ext)
            }
        };

        let mut filename = make(base);
        let mut count = 1;
        while assets.contains(&filename) {
            count += 1;
            filename = make(&format!("{}{}", base, count));
        }
        filename
    }

    /// Write assets to disk
    fn write_assets(&self, assets: &OutputAssets) -> Result<Vec<BundleInfo>> {
        let output_dir = self.output_dir();

        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

        let mut bundles = Vec::new();
        for (filename, asset) in assets.iter() {
            let output_path = output_dir.join(filename);
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            fs::write(&output_path, &asset.content)
                .with_context(|| format!("Failed to write bundle: {}", output_path.display()))?;

            bundles.push(BundleInfo {
                output_path,
                size: asset.size(),
            });
        }

        Ok(bundles)
    }

    /// Describe where assets would be written, without writing them
    fn describe_assets(&self, assets: &OutputAssets) -> Vec<BundleInfo> {
        let output_dir = self.output_dir();
        assets
            .iter()
            .map(|(filename, asset)| BundleInfo {
                output_path: output_dir.join(filename),
                size: asset.size(),
            })
            .collect()
    }
}

/// Module runtime included in every entry chunk
const RUNTIME_HEADER: &str = r#"// pagechunks runtime
(function() {
  var modules = window.__pagechunks_modules__ = window.__pagechunks_modules__ || {};
  var cache = {};

  function require(moduleId) {
    if (cache[moduleId]) {
      return cache[moduleId].exports;
    }

    var module = { exports: {} };
    cache[moduleId] = module;

    var moduleFn = modules[moduleId];
    if (moduleFn) {
      moduleFn(module, module.exports, require);
    }

    return module.exports;
  }

  function load(file, moduleId) {
    return import("./" + file).then(function() {
      return require(moduleId);
    });
  }

  window.__pagechunks_require__ = require;
  window.__pagechunks_load__ = load;
})();
"#;

fn wrap_module(id: &str, body: &str) -> String {
    format!(
        "\n(window.__pagechunks_modules__ = window.__pagechunks_modules__ || {{}})[{}] = function(module, exports, require) {{\n{}\n}};\n",
        js_string(id),
        body
    )
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::PagesConfig;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config(root: &Path, entries: &[(&str, &str)]) -> Config {
        let mut config = Config::default_config(root);
        config.pages.enabled = false;
        config.entry = EntryConfig::Named(
            entries
                .iter()
                .map(|(name, path)| (name.to_string(), path.to_string()))
                .collect::<BTreeMap<_, _>>(),
        );
        config
    }

    fn in_memory() -> BuildOptions {
        BuildOptions {
            outdir: None,
            write: false,
        }
    }

    #[tokio::test]
    async fn test_dynamic_imports_become_child_chunks() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "import './util';\nconst about = () => import('./about');\n");
        write(dir.path(), "src/util.js", "export const x = 1;");
        write(dir.path(), "src/about.js", "import './about.css';\nexport default 'about';");
        write(dir.path(), "src/about.css", "h1 { color: red; }");

        let bundler = Bundler::new(config(dir.path(), &[("main", "src/index.js")]), in_memory()).unwrap();
        let result = bundler.build().await.unwrap();

        let (main_id, main) = result.chunks.find_by_name("main").unwrap();
        assert_eq!(main.chunk_type, ChunkType::Entry);
        assert_eq!(main.len(), 2);

        let children = result.chunks.children(main_id);
        assert_eq!(children.len(), 1);
        let about = children[0].1;
        assert_eq!(about.name, "about");
        assert_eq!(about.files.len(), 2);
        assert!(about.files[0].ends_with(".js"));
        assert!(about.files[1].ends_with(".css"));

        let main_code = &result.assets.get(&main.files[0]).unwrap().content;
        assert!(main_code.contains(&format!("__pagechunks_load__(\"{}\"", about.files[0])));
        assert!(!main_code.contains("import('./about')"));
    }

    #[tokio::test]
    async fn test_shared_split_point_is_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.js", "import('./lazy');");
        write(dir.path(), "src/b.js", "import('./lazy');");
        write(dir.path(), "src/lazy.js", "export default 1;");

        let bundler = Bundler::new(
            config(dir.path(), &[("a", "src/a.js"), ("b", "src/b.js")]),
            in_memory(),
        )
        .unwrap();
        let result = bundler.build().await.unwrap();

        assert_eq!(result.chunks.len(), 3);
        let (a, _) = result.chunks.find_by_name("a").unwrap();
        let (b, _) = result.chunks.find_by_name("b").unwrap();
        assert_eq!(
            result.chunks.children(a)[0].0,
            result.chunks.children(b)[0].0
        );
    }

    #[tokio::test]
    async fn test_first_chunk_name_annotation_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/index.js",
            "import('./lazy');\nimport(/* chunkName: \"first\" */ './lazy');\nimport(/* chunkName: \"second\" */ './lazy');",
        );
        write(dir.path(), "src/lazy.js", "export default 1;");

        let bundler = Bundler::new(config(dir.path(), &[("main", "src/index.js")]), in_memory()).unwrap();
        let result = bundler.build().await.unwrap();

        assert_eq!(result.chunks.len(), 2);
        assert!(result.chunks.find_by_name("first").is_some());
        assert!(result.chunks.find_by_name("second").is_none());
        assert!(result.chunks.find_by_name("lazy").is_none());
    }

    #[tokio::test]
    async fn test_unhashed_names_are_made_unique() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "import('./x/index'); import('./y/index');");
        write(dir.path(), "src/x/index.js", "1");
        write(dir.path(), "src/y/index.js", "2");

        let mut config = config(dir.path(), &[("main", "src/index.js")]);
        config.output.hash = false;
        let result = Bundler::new(config, in_memory()).unwrap().build().await.unwrap();

        let names: Vec<&str> = result.assets.filenames().collect();
        assert_eq!(names, vec!["index.js", "index2.js", "main.js"]);
    }

    #[tokio::test]
    async fn test_pages_build_writes_manifest_and_drops_entry() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/pages/home.js", "export default 'home';");
        write(dir.path(), "src/pages/catalog/index.js", "export default 'catalog';");

        let mut config = Config::default_config(dir.path());
        config.pages = PagesConfig::default();

        let bundler = Bundler::new(config, BuildOptions::default()).unwrap();
        let result = bundler.build().await.unwrap();

        let (_, root) = result.chunks.find_by_name("__pages_entry__").unwrap();
        for file in &root.files {
            assert!(!result.assets.contains(file));
            assert!(!dir.path().join("dist").join(file).exists());
        }

        let manifest: BTreeMap<String, String> = serde_json::from_str(
            &fs::read_to_string(dir.path().join("dist/pages-manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.keys().collect::<Vec<_>>(), vec!["catalog", "home"]);
        for file in manifest.values() {
            assert!(dir.path().join("dist").join(file).is_file());
        }
    }

    #[tokio::test]
    async fn test_rebuild_starts_clean() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/pages/home.js", "export default 'home';");

        let bundler = Bundler::new(Config::default_config(dir.path()), in_memory()).unwrap();
        let first = bundler.build().await.unwrap();

        write(dir.path(), "src/pages/pricing.js", "export default 'pricing';");
        let second = bundler.build().await.unwrap();

        let manifest = |result: &BuildResult| -> BTreeMap<String, String> {
            serde_json::from_str(&result.assets.get("pages-manifest.json").unwrap().content).unwrap()
        };
        assert_eq!(manifest(&first).len(), 1);
        assert_eq!(manifest(&second).keys().collect::<Vec<_>>(), vec!["home", "pricing"]);
    }

    #[tokio::test]
    async fn test_single_entry_with_pages_fails_before_building() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "");
        write(dir.path(), "src/pages/home.js", "");

        let mut config = Config::default_config(dir.path());
        config.entry = EntryConfig::Single("src/index.js".into());

        let err = Bundler::new(config, BuildOptions::default())
            .unwrap()
            .build()
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::PageChunksError>(),
            Some(crate::error::PageChunksError::EntryNotExtensible(_))
        ));
        assert!(!dir.path().join("dist").exists());
    }
}

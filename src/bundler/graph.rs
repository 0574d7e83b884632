//! Module graph data structures

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Unique identifier for a module
pub type ModuleId = usize;

/// Types of modules the bundler can handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleType {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
    Css,
    Json,
    Unknown,
}

impl ModuleType {
    /// Determine module type from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => ModuleType::JavaScript,
            "ts" | "mts" | "cts" => ModuleType::TypeScript,
            "jsx" => ModuleType::Jsx,
            "tsx" => ModuleType::Tsx,
            "css" => ModuleType::Css,
            "json" => ModuleType::Json,
            _ => ModuleType::Unknown,
        }
    }

    /// Check if this is a JavaScript-like module
    pub fn is_js_like(&self) -> bool {
        matches!(
            self,
            ModuleType::JavaScript
                | ModuleType::TypeScript
                | ModuleType::Jsx
                | ModuleType::Tsx
        )
    }
}

/// How a dependency is imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import x from`, `export … from`, `require()`
    Static,
    /// `import()` - a split point
    Dynamic,
}

/// An import found in a module's source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The specifier as written
    pub specifier: String,

    pub kind: ImportKind,

    /// Name from a `/* chunkName: "…" */` annotation on a dynamic import
    pub chunk_name: Option<String>,
}

impl Dependency {
    pub fn new(specifier: impl Into<String>, kind: ImportKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            chunk_name: None,
        }
    }
}

/// A module in the dependency graph
#[derive(Debug, Clone)]
pub struct Module {
    /// Stable id: the absolute path for files, a `\0`-prefixed id for virtual modules
    pub id: String,

    /// Path on disk; `None` for virtual modules
    pub path: Option<PathBuf>,

    /// Original source code
    pub source: String,

    /// Module type
    pub module_type: ModuleType,
}

impl Module {
    /// Detect module type from path
    pub fn detect_type(path: &Path) -> ModuleType {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(ModuleType::from_extension)
            .unwrap_or(ModuleType::Unknown)
    }

    /// Short name used when a chunk has no explicit name
    pub fn stem(&self) -> String {
        match &self.path {
            Some(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "chunk".to_string()),
            None => "virtual".to_string(),
        }
    }
}

/// A resolved edge between two modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub target: ModuleId,
    pub kind: ImportKind,
    pub specifier: String,
    pub chunk_name: Option<String>,
}

/// The module dependency graph
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// All modules indexed by their ID
    modules: HashMap<ModuleId, Module>,

    /// Map from module id string to module ID
    key_to_id: HashMap<String, ModuleId>,

    /// Dependency edges in source order
    edges: HashMap<ModuleId, Vec<Edge>>,

    /// Next available module ID
    next_id: ModuleId,
}

impl ModuleGraph {
    /// Create a new empty module graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the graph
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        if let Some(&id) = self.key_to_id.get(&module.id) {
            return id;
        }

        let id = self.next_id;
        self.next_id += 1;

        self.key_to_id.insert(module.id.clone(), id);
        self.modules.insert(id, module);
        self.edges.insert(id, Vec::new());

        id
    }

    /// Add a dependency edge between modules
    pub fn add_dependency(&mut self, from: ModuleId, edge: Edge) {
        if let Some(deps) = self.edges.get_mut(&from) {
            if !deps.contains(&edge) {
                deps.push(edge);
            }
        }
    }

    /// Get module ID from its id string
    pub fn get_module_id(&self, key: &str) -> Option<ModuleId> {
        self.key_to_id.get(key).copied()
    }

    /// Get a module by ID
    pub fn get_module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    /// Get all modules reachable from `start` through static imports (BFS)
    pub fn get_static_reachable(&self, start: ModuleId) -> Vec<ModuleId> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        queue.push_back(start);
        visited.insert(start);

        while let Some(id) = queue.pop_front() {
            result.push(id);

            for edge in self.edges_of(id) {
                if edge.kind == ImportKind::Static && visited.insert(edge.target) {
                    queue.push_back(edge.target);
                }
            }
        }

        result
    }

    /// Outgoing edges of a module
    pub fn edges_of(&self, id: ModuleId) -> &[Edge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dynamic import edges of a module
    pub fn dynamic_imports(&self, id: ModuleId) -> impl Iterator<Item = &Edge> {
        self.edges_of(id)
            .iter()
            .filter(|edge| edge.kind == ImportKind::Dynamic)
    }

    /// Total number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

//! Chunk generation for code splitting

use super::ModuleId;

/// Index of a chunk within its [`ChunkGraph`]
pub type ChunkId = usize;

/// Type of chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkType {
    /// Entry point chunk - loaded immediately
    Entry,
    /// Async chunk - loaded on demand via dynamic import
    Async,
}

/// A chunk is a group of modules that will be bundled together
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk name (used for output filename)
    pub name: String,

    /// Type of chunk
    pub chunk_type: ChunkType,

    /// Module IDs included in this chunk, entry module first
    pub module_ids: Vec<ModuleId>,

    /// Emitted filenames; the JS file always comes first
    pub files: Vec<String>,

    /// Chunks split off from this one by dynamic imports, in discovery order
    pub children: Vec<ChunkId>,
}

impl Chunk {
    /// Create a new entry chunk
    pub fn entry(name: String, module_ids: Vec<ModuleId>) -> Self {
        Self {
            name,
            chunk_type: ChunkType::Entry,
            module_ids,
            files: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a new async chunk
    pub fn async_chunk(name: String, module_ids: Vec<ModuleId>) -> Self {
        Self {
            name,
            chunk_type: ChunkType::Async,
            module_ids,
            files: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attach emitted filenames
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Check if chunk is empty
    pub fn is_empty(&self) -> bool {
        self.module_ids.is_empty()
    }

    /// Number of modules in chunk
    pub fn len(&self) -> usize {
        self.module_ids.len()
    }

    /// The module the chunk was created for
    pub fn entry_module(&self) -> Option<ModuleId> {
        self.module_ids.first().copied()
    }
}

/// All chunks of a build and their split relationships
#[derive(Debug, Default, Clone)]
pub struct ChunkGraph {
    chunks: Vec<Chunk>,
}

impl ChunkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return its id
    pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkId {
        self.chunks.push(chunk);
        self.chunks.len() - 1
    }

    /// Record that `child` was split off from `parent`
    pub fn add_child(&mut self, parent: ChunkId, child: ChunkId) {
        if let Some(chunk) = self.chunks.get_mut(parent) {
            if !chunk.children.contains(&child) {
                chunk.children.push(child);
            }
        }
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn get_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.chunks.get_mut(id)
    }

    /// Find the first chunk with the given name
    pub fn find_by_name(&self, name: &str) -> Option<(ChunkId, &Chunk)> {
        self.chunks
            .iter()
            .enumerate()
            .find(|(_, chunk)| chunk.name == name)
    }

    /// Direct split children of a chunk
    pub fn children(&self, id: ChunkId) -> Vec<(ChunkId, &Chunk)> {
        self.get(id)
            .map(|chunk| {
                chunk
                    .children
                    .iter()
                    .filter_map(|&child| self.get(child).map(|c| (child, c)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Chunk ids ordered so every child comes before its parents
    pub fn post_order(&self) -> Vec<ChunkId> {
        let mut visited = vec![false; self.chunks.len()];
        let mut order = Vec::with_capacity(self.chunks.len());

        for root in 0..self.chunks.len() {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            // (chunk, next child index)
            let mut stack = vec![(root, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (id, next) = *top;
                let children = &self.chunks[id].children;
                if next < children.len() {
                    let child = children[next];
                    top.1 += 1;
                    if !visited[child] {
                        visited[child] = true;
                        stack.push((child, 0));
                    }
                } else {
                    order.push(id);
                    stack.pop();
                }
            }
        }

        order
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

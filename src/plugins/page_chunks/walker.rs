//! Recovers the page manifest from the chunk graph
//!
//! Only the direct split children of the root chunk are pages. Dynamic
//! imports nested inside a page belong to that page.

use std::collections::BTreeSet;

use tracing::debug;

use super::manifest::PageManifest;
use super::pages::PageSet;
use crate::bundler::{Chunk, ChunkGraph, ChunkId};
use crate::error::PageChunksError;

/// Locate the root chunk registered under `entry_name`
pub fn find_root<'a>(
    chunks: &'a ChunkGraph,
    entry_name: &str,
) -> Result<(ChunkId, &'a Chunk), PageChunksError> {
    chunks
        .find_by_name(entry_name)
        .ok_or_else(|| PageChunksError::MissingRootChunk(entry_name.to_string()))
}

/// Map every page chunk to its primary file and check it against `pages`
///
/// A chunk's first file is the manifest value. Auxiliary files such as
/// extracted CSS are not represented.
pub fn walk(chunks: &ChunkGraph, entry_name: &str, pages: &PageSet) -> Result<PageManifest, PageChunksError> {
    let (root_id, _) = find_root(chunks, entry_name)?;

    let mut manifest = PageManifest::new();
    for (_, child) in chunks.children(root_id) {
        let Some(file) = child.files.first() else {
            return Err(PageChunksError::ChunkWithoutFiles(child.name.clone()));
        };
        if manifest.insert(child.name.clone(), file.clone()).is_some() {
            return Err(PageChunksError::DuplicateChunk(child.name.clone()));
        }
        debug!("Page '{}' -> {}", child.name, file);
    }

    let expected: BTreeSet<&str> = pages.names().collect();
    let found: BTreeSet<&str> = manifest.names().collect();
    if expected != found {
        return Err(PageChunksError::ChunkSetMismatch {
            missing: expected.difference(&found).map(|s| s.to_string()).collect(),
            extra: found.difference(&expected).map(|s| s.to_string()).collect(),
        });
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::super::pages::PageEntry;
    use super::*;

    const ENTRY: &str = "__pages_entry__";

    fn pages(names: &[&str]) -> PageSet {
        let mut set = PageSet::new();
        for name in names {
            set.insert(PageEntry {
                name: name.to_string(),
                path: PathBuf::from(format!("/pages/{}.js", name)),
            })
            .unwrap();
        }
        set
    }

    /// Root chunk plus one child per `(name, files)`
    fn graph(children: Vec<(&str, Vec<&str>)>) -> ChunkGraph {
        let mut graph = ChunkGraph::new();
        let root = graph.add_chunk(Chunk::entry(ENTRY.into(), vec![0]).with_files(["entry.xyz.js"]));
        for (i, (name, files)) in children.into_iter().enumerate() {
            let child = graph.add_chunk(Chunk::async_chunk(name.to_string(), vec![i + 1]).with_files(files));
            graph.add_child(root, child);
        }
        graph
    }

    #[test]
    fn test_walk_scenario() {
        let chunks = graph(vec![("home", vec!["home.abc123.js"]), ("catalog", vec!["catalog.def456.js"])]);
        let manifest = walk(&chunks, ENTRY, &pages(&["home", "catalog"])).unwrap();

        assert_eq!(manifest.get("home"), Some("home.abc123.js"));
        assert_eq!(manifest.get("catalog"), Some("catalog.def456.js"));
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_first_file_is_primary() {
        let chunks = graph(vec![("home", vec!["home.1.js", "home.1.css"])]);
        let manifest = walk(&chunks, ENTRY, &pages(&["home"])).unwrap();
        assert_eq!(manifest.get("home"), Some("home.1.js"));
    }

    #[test]
    fn test_missing_page_chunk() {
        let chunks = graph(vec![("home", vec!["home.abc123.js"])]);
        let err = walk(&chunks, ENTRY, &pages(&["home", "pricing"])).unwrap_err();

        match err {
            PageChunksError::ChunkSetMismatch { missing, extra } => {
                assert_eq!(missing, vec!["pricing".to_string()]);
                assert!(extra.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_chunk() {
        let chunks = graph(vec![("home", vec!["home.js"]), ("about", vec!["about.js"])]);
        let err = walk(&chunks, ENTRY, &pages(&["home"])).unwrap_err();
        assert!(matches!(
            err,
            PageChunksError::ChunkSetMismatch { ref missing, ref extra }
                if missing.is_empty() && extra == &vec!["about".to_string()]
        ));
    }

    #[test]
    fn test_missing_root_chunk() {
        let chunks = graph(vec![]);
        let err = walk(&chunks, "__other__", &pages(&[])).unwrap_err();
        assert!(matches!(err, PageChunksError::MissingRootChunk(ref name) if name == "__other__"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_empty_pages_yield_empty_manifest() {
        let manifest = walk(&graph(vec![]), ENTRY, &pages(&[])).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_nested_splits_are_ignored() {
        let mut chunks = graph(vec![("home", vec!["home.js"])]);
        let (home, _) = chunks.find_by_name("home").unwrap();
        let nested = chunks.add_chunk(Chunk::async_chunk("carousel".into(), vec![9]).with_files(["carousel.js"]));
        chunks.add_child(home, nested);

        let manifest = walk(&chunks, ENTRY, &pages(&["home"])).unwrap();
        assert_eq!(manifest.names().collect::<Vec<_>>(), vec!["home"]);
    }

    #[test]
    fn test_duplicate_and_fileless_chunks() {
        let chunks = graph(vec![("home", vec!["a.js"]), ("home", vec!["b.js"])]);
        assert!(matches!(
            walk(&chunks, ENTRY, &pages(&["home"])),
            Err(PageChunksError::DuplicateChunk(_))
        ));

        let chunks = graph(vec![("home", vec![])]);
        assert!(matches!(
            walk(&chunks, ENTRY, &pages(&["home"])),
            Err(PageChunksError::ChunkWithoutFiles(_))
        ));
    }
}

//! The page manifest and the emit-phase asset rewrite

use std::collections::BTreeMap;
use std::path::{Component, Path};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::bundler::{AssetOrigin, Chunk, OutputAssets};
use crate::error::PageChunksError;

/// Logical page name → emitted filename, ordered by page name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageManifest(BTreeMap<String, String>);

impl PageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page, returning the previous filename for that name
    pub fn insert(&mut self, name: String, file: String) -> Option<String> {
        self.0.insert(name, file)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize as a JSON object indented with four spaces
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Check that a manifest filename stays inside the output directory
pub fn check_manifest_filename(filename: &str) -> Result<(), PageChunksError> {
    let path = Path::new(filename);
    let inside = !filename.trim().is_empty()
        && !filename.ends_with('/')
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)));

    if inside {
        Ok(())
    } else {
        Err(PageChunksError::InvalidManifestFilename(filename.to_string()))
    }
}

/// Drop the root chunk's files from the output and add the manifest
///
/// All checks run before the asset set is touched. A manifest previously
/// written by `owner` may be replaced, so running this twice is harmless;
/// any other asset at `filename` is a collision.
pub fn finalize(
    assets: &mut OutputAssets,
    root: &Chunk,
    manifest: &PageManifest,
    filename: &str,
    owner: &str,
) -> Result<()> {
    let ours = AssetOrigin::Plugin(owner.to_string());
    if let Some(existing) = assets.get(filename) {
        let is_root_file = root.files.iter().any(|file| file == filename);
        if existing.origin != ours && !is_root_file {
            return Err(PageChunksError::ManifestCollision(filename.to_string()).into());
        }
    }

    let json = manifest.to_json()?;

    for file in &root.files {
        if assets.remove(file).is_some() {
            debug!("Removed synthetic entry asset {}", file);
        }
    }
    assets.insert(filename, json, ours);

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const OWNER: &str = "page-chunks";

    fn manifest(pairs: &[(&str, &str)]) -> PageManifest {
        let mut manifest = PageManifest::new();
        for (name, file) in pairs {
            manifest.insert(name.to_string(), file.to_string());
        }
        manifest
    }

    fn scenario_assets() -> (OutputAssets, Chunk) {
        let mut assets = OutputAssets::new();
        assets.insert("home.abc123.js", "home", AssetOrigin::Chunk(1));
        assets.insert("catalog.def456.js", "catalog", AssetOrigin::Chunk(2));
        assets.insert("entry.xyz.js", "glue", AssetOrigin::Chunk(0));
        let root = Chunk::entry("__pages_entry__".into(), vec![0]).with_files(["entry.xyz.js"]);
        (assets, root)
    }

    #[test]
    fn test_json_is_stable_and_indented() {
        let a = manifest(&[("home", "home.abc123.js"), ("catalog", "catalog.def456.js")]);
        let b = manifest(&[("catalog", "catalog.def456.js"), ("home", "home.abc123.js")]);

        let json = a.to_json().unwrap();
        assert_eq!(
            json,
            "{\n    \"catalog\": \"catalog.def456.js\",\n    \"home\": \"home.abc123.js\"\n}"
        );
        assert_eq!(json, b.to_json().unwrap());
        assert_eq!(PageManifest::new().to_json().unwrap(), "{}");
    }

    #[test]
    fn test_manifest_filename_must_stay_in_output() {
        for ok in ["pages-manifest.json", "meta/pages-manifest.json", "./routes.json"] {
            assert!(check_manifest_filename(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "  ", "/etc/pages.json", "../pages.json", "meta/../../x.json", "meta/"] {
            assert!(
                matches!(check_manifest_filename(bad), Err(PageChunksError::InvalidManifestFilename(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_finalize_scenario() {
        let (mut assets, root) = scenario_assets();
        let pages = manifest(&[("home", "home.abc123.js"), ("catalog", "catalog.def456.js")]);

        finalize(&mut assets, &root, &pages, "pages-manifest.json", OWNER).unwrap();

        assert_eq!(
            assets.filenames().collect::<Vec<_>>(),
            vec!["catalog.def456.js", "home.abc123.js", "pages-manifest.json"]
        );
        let written: serde_json::Value =
            serde_json::from_str(&assets.get("pages-manifest.json").unwrap().content).unwrap();
        assert_eq!(
            written,
            serde_json::json!({"home": "home.abc123.js", "catalog": "catalog.def456.js"})
        );
    }

    #[test]
    fn test_finalize_twice_is_idempotent() {
        let (mut assets, root) = scenario_assets();
        let pages = manifest(&[("home", "home.abc123.js")]);

        finalize(&mut assets, &root, &pages, "pages-manifest.json", OWNER).unwrap();
        let once: Vec<(String, String)> = assets
            .iter()
            .map(|(name, asset)| (name.to_string(), asset.content.clone()))
            .collect();

        finalize(&mut assets, &root, &pages, "pages-manifest.json", OWNER).unwrap();
        let twice: Vec<(String, String)> = assets
            .iter()
            .map(|(name, asset)| (name.to_string(), asset.content.clone()))
            .collect();

        assert_eq!(once, twice);
        assert!(!assets.contains("entry.xyz.js"));
    }

    #[test]
    fn test_collision_leaves_assets_untouched() {
        let (mut assets, root) = scenario_assets();
        let err = finalize(&mut assets, &root, &PageManifest::new(), "home.abc123.js", OWNER).unwrap_err();

        let err = err.downcast_ref::<PageChunksError>().unwrap();
        assert!(matches!(err, PageChunksError::ManifestCollision(name) if name == "home.abc123.js"));
        assert!(err.is_configuration());
        assert!(assets.contains("entry.xyz.js"));
        assert_eq!(assets.get("home.abc123.js").unwrap().content, "home");
    }

    #[test]
    fn test_removes_every_root_file() {
        let (mut assets, _) = scenario_assets();
        assets.insert("entry.xyz.css", "body{}", AssetOrigin::Chunk(0));
        let root = Chunk::entry("__pages_entry__".into(), vec![0]).with_files(["entry.xyz.js", "entry.xyz.css"]);

        finalize(&mut assets, &root, &PageManifest::new(), "pages-manifest.json", OWNER).unwrap();

        assert!(!assets.contains("entry.xyz.js"));
        assert!(!assets.contains("entry.xyz.css"));
        assert_eq!(assets.get("pages-manifest.json").unwrap().content, "{}");
    }
}

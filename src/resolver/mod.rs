//! Module resolution
//!
//! Extracts import specifiers from source and resolves them to file paths.

use std::path::{Path, PathBuf};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::bundler::{Dependency, ImportKind, ModuleType};

/// Regex patterns for extracting imports
static IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:import|export)\s+(?:(?:\{[^}]*\}|\*\s+as\s+\w+|\w+)\s+from\s+)?["']([^"']+)["']|require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap()
});

/// `import(/* chunkName: "name" */ "specifier")`, annotation optional
static DYNAMIC_IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s*\(\s*(?:/\*\s*chunkName:\s*"((?:[^"\\]|\\.)*)"\s*\*/\s*)?(?:"((?:[^"\\]|\\.)*)"|'([^'\\]*)')\s*\)"#).unwrap()
});

const EXTENSIONS: [&str; 7] = ["js", "ts", "jsx", "tsx", "mjs", "cjs", "json"];

/// Module resolver
#[derive(Debug, Default)]
pub struct Resolver;

impl Resolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self
    }

    /// Extract static and dynamic dependencies from source code
    pub fn extract_dependencies(&self, source: &str, module_type: &ModuleType) -> Vec<Dependency> {
        if !module_type.is_js_like() {
            return Vec::new();
        }

        let mut dependencies: Vec<Dependency> = Vec::new();

        for cap in IMPORT_REGEX.captures_iter(source) {
            if let Some(specifier) = cap.get(1).or_else(|| cap.get(2)) {
                let dep = Dependency::new(specifier.as_str(), ImportKind::Static);
                if !dependencies.contains(&dep) {
                    dependencies.push(dep);
                }
            }
        }

        for cap in DYNAMIC_IMPORT_REGEX.captures_iter(source) {
            if let Some(specifier) = dynamic_specifier(&cap) {
                let dep = Dependency {
                    specifier,
                    kind: ImportKind::Dynamic,
                    chunk_name: cap.get(1).and_then(|m| decode_literal(m.as_str())),
                };
                if !dependencies.contains(&dep) {
                    dependencies.push(dep);
                }
            }
        }

        debug!("Found {} dependencies", dependencies.len());

        dependencies
    }

    /// Resolve an import specifier to an absolute file path
    ///
    /// Bare specifiers, and relative ones without an on-disk importer, are
    /// left unresolved.
    pub fn resolve(&self, specifier: &str, from: Option<&Path>) -> Result<Option<PathBuf>> {
        if Path::new(specifier).is_absolute() {
            return Ok(self.resolve_relative(specifier, Path::new("/")));
        }

        if !specifier.starts_with('.') {
            debug!("Skipping bare specifier: {}", specifier);
            return Ok(None);
        }

        let Some(from) = from else {
            debug!("Cannot resolve '{}' without an importer on disk", specifier);
            return Ok(None);
        };

        let base_dir = from.parent().unwrap_or(Path::new("."));
        let resolved = self.resolve_relative(specifier, base_dir);

        debug!("Resolved '{}' from '{}' to {:?}", specifier, from.display(), resolved);

        Ok(resolved)
    }

    /// Resolve a path relative to a directory
    fn resolve_relative(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let target = base_dir.join(specifier);

        if target.is_file() {
            return Some(target);
        }

        for ext in &EXTENSIONS {
            let with_ext = target.with_extension(ext);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }

        if target.is_dir() {
            for ext in &EXTENSIONS {
                let index = target.join(format!("index.{}", ext));
                if index.is_file() {
                    return Some(index);
                }
            }
        }

        None
    }
}

/// Rewrite every `import()` whose specifier `replace` knows about
pub fn rewrite_dynamic_imports<F>(source: &str, replace: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    DYNAMIC_IMPORT_REGEX
        .replace_all(source, |cap: &Captures<'_>| {
            dynamic_specifier(cap)
                .and_then(|specifier| replace(&specifier))
                .unwrap_or_else(|| cap[0].to_string())
        })
        .into_owned()
}

/// Decode the specifier literal of a dynamic import match
fn dynamic_specifier(cap: &Captures<'_>) -> Option<String> {
    if let Some(double) = cap.get(2) {
        decode_literal(double.as_str())
    } else {
        cap.get(3).map(|single| single.as_str().to_string())
    }
}

/// Unescape the body of a double-quoted literal, which may carry JSON-style escapes
fn decode_literal(body: &str) -> Option<String> {
    serde_json::from_str(&format!("\"{}\"", body)).ok()
}

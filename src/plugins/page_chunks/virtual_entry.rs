//! The synthetic pages entry
//!
//! The entry never exists on disk. It is addressed by a query-string
//! reference carrying the page directories, and its source is generated
//! when the bundler loads it.

use std::path::PathBuf;

use url::form_urlencoded;

use super::pages::{PageDirs, PageSet};
use crate::error::PageChunksError;

/// Specifier registered as the pages entry
pub const VIRTUAL_PREFIX: &str = "virtual:pagechunks-pages";

/// Module id the specifier resolves to; the NUL byte keeps it off disk
pub const RESOLVED_PREFIX: &str = "\0virtual:pagechunks-pages";

const DIR_PARAM: &str = "dir";

/// Build the entry specifier for a set of page directories
pub fn encode_reference(dirs: &PageDirs) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for dir in dirs.as_slice() {
        query.append_pair(DIR_PARAM, &dir.to_string_lossy());
    }
    format!("{}?{}", VIRTUAL_PREFIX, query.finish())
}

/// Map an entry specifier to its resolved virtual id, if it is ours
pub fn resolve_reference(specifier: &str) -> Option<String> {
    specifier
        .strip_prefix(VIRTUAL_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('?'))
        .map(|rest| format!("{}{}", RESOLVED_PREFIX, rest))
}

/// Recover the page directories from a resolved virtual id
///
/// Returns `Ok(None)` for ids that do not belong to the pages entry.
pub fn decode_reference(id: &str) -> Result<Option<Vec<PathBuf>>, PageChunksError> {
    let Some(rest) = id.strip_prefix(RESOLVED_PREFIX) else {
        return Ok(None);
    };
    if !rest.is_empty() && !rest.starts_with('?') {
        return Ok(None);
    }

    let query = rest.trim_start_matches('?');
    let mut dirs = Vec::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key != DIR_PARAM {
            return Err(PageChunksError::InvalidVirtualReference(format!(
                "unknown parameter '{}'",
                key
            )));
        }
        dirs.push(PathBuf::from(value.into_owned()));
    }

    if dirs.is_empty() {
        return Err(PageChunksError::InvalidVirtualReference(
            "no page directories".to_string(),
        ));
    }

    Ok(Some(dirs))
}

/// Generate the entry source: one annotated `import()` per page
///
/// Names and paths are emitted as literals so every page is a static split
/// point. An empty page set yields an empty export.
pub fn synthesize(pages: &PageSet) -> String {
    if pages.is_empty() {
        return "// Generated by pagechunks: no pages found.\nexport default {};\n".to_string();
    }

    let mut source = String::from("// Generated by pagechunks. Do not edit.\nexport default {\n");
    for page in pages.iter() {
        let name = js_string(&page.name);
        source.push_str(&format!(
            "    {}: () => import(/* chunkName: {} */ {}),\n",
            name,
            name.replace("*/", "*\\/"),
            js_string(&page.path.to_string_lossy())
        ));
    }
    source.push_str("};\n");
    source
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

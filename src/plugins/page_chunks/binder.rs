//! Registers the pages entry in the build's entry configuration

use tracing::debug;

use crate::config::EntryConfig;
use crate::error::PageChunksError;

/// Add `name → specifier` to the named entry table
///
/// A single unnamed entry cannot take another entry, and an existing entry
/// under `name` is never replaced.
pub fn register(entry: &mut EntryConfig, name: &str, specifier: &str) -> Result<(), PageChunksError> {
    match entry {
        EntryConfig::Single(_) => Err(PageChunksError::EntryNotExtensible(name.to_string())),
        EntryConfig::Named(entries) => {
            if entries.contains_key(name) {
                return Err(PageChunksError::EntryNameTaken(name.to_string()));
            }
            debug!("Registering entry '{}' -> {:?}", name, specifier);
            entries.insert(name.to_string(), specifier.to_string());
            Ok(())
        }
    }
}

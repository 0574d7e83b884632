//! Error types for the page chunk pipeline
//!
//! Configuration errors are raised before or at build start and mean the
//! user has to fix their setup. Invariant violations are raised at emit
//! time and mean the build graph no longer agrees with the discovered pages.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the page chunk pipeline
#[derive(Debug, Error)]
pub enum PageChunksError {
    /// No page directories were configured
    #[error("At least one pages directory must be configured")]
    NoPageDirs,

    /// A configured directory entry is not a usable directory reference
    #[error("Invalid pages directory {0:?}")]
    InvalidPageDir(String),

    /// A configured directory does not exist when it is scanned
    #[error("Pages directory does not exist: {}", .0.display())]
    MissingPageDir(PathBuf),

    /// Two page files derive the same logical name
    #[error(
        "Page name '{name}' is derived from both {} and {}",
        first.display(),
        second.display()
    )]
    NameCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The build entry is a single unnamed entry
    #[error("The build entry must be a named table of entrypoints to register '{0}'")]
    EntryNotExtensible(String),

    /// Another entry already uses the pages entry name
    #[error("Entry name '{0}' is already in use")]
    EntryNameTaken(String),

    /// The manifest filename does not name a file inside the output directory
    #[error("Invalid manifest filename {0:?}: expected a relative path inside the output directory")]
    InvalidManifestFilename(String),

    /// The manifest filename would overwrite unrelated build output
    #[error("Manifest filename '{0}' collides with an existing output asset")]
    ManifestCollision(String),

    /// The virtual entry reference could not be decoded
    #[error("Invalid virtual pages reference: {0}")]
    InvalidVirtualReference(String),

    /// The root chunk for the pages entry is absent from the chunk graph
    #[error("Could not find the '{0}' entry chunk in the build output")]
    MissingRootChunk(String),

    /// The split children of the root chunk differ from the discovered pages
    #[error(
        "Page chunks do not match discovered pages (missing: [{}], extra: [{}])",
        missing.join(", "),
        extra.join(", ")
    )]
    ChunkSetMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Two split children share one name
    #[error("More than one chunk is named '{0}'")]
    DuplicateChunk(String),

    /// A split child produced no output files
    #[error("Chunk '{0}' has no emitted files")]
    ChunkWithoutFiles(String),

    /// The emit hook ran without the virtual entry ever being loaded
    #[error("The pages entry chunk exists but no page set was resolved for this build")]
    PagesNotResolved,
}

impl PageChunksError {
    /// Whether this error is a user-facing configuration problem
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoPageDirs
                | Self::InvalidPageDir(_)
                | Self::MissingPageDir(_)
                | Self::NameCollision { .. }
                | Self::EntryNotExtensible(_)
                | Self::EntryNameTaken(_)
                | Self::InvalidManifestFilename(_)
                | Self::ManifestCollision(_)
                | Self::InvalidVirtualReference(_)
        )
    }

    /// Whether this error means the build graph broke an internal invariant
    pub fn is_invariant_violation(&self) -> bool {
        !self.is_configuration()
    }
}

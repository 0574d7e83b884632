//! pagechunks library
//!
//! Splits every page of a web application into its own chunk during a
//! build and emits a manifest mapping page names to their files.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod plugins;
pub mod resolver;
pub mod utils;

pub use bundler::Bundler;
pub use cli::Cli;
pub use config::Config;
pub use error::PageChunksError;

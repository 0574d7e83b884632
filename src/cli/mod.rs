//! Command-line interface for pagechunks
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `build`: Build the project and emit the page manifest
//! - `pages`: List the pages that would be split
//! - `init`: Project scaffolding

mod build;
mod init;
mod pages;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

pub use build::{BuildCommand, BuildOptions};
pub use init::InitCommand;
pub use pages::PagesCommand;

/// pagechunks - split every page of an app into its own chunk
#[derive(Parser, Debug)]
#[command(name = "pagechunks")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to pagechunks.toml config file
    #[arg(short, long, global = true, default_value = "pagechunks.toml", env = "PAGECHUNKS_CONFIG")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the project and write the page manifest
    Build(BuildCommand),

    /// List discovered pages without building
    Pages(PagesCommand),

    /// Initialize a new project
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Commands::Build(cmd) => cmd.execute(&self.config).await,
            Commands::Pages(cmd) => cmd.execute(&self.config).await,
            Commands::Init(cmd) => cmd.execute().await,
        }
    }
}

/// Print the pagechunks banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "pagechunks".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

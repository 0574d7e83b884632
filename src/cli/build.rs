//! Build command implementation

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::bundler::Bundler;
use crate::config::Config;
use crate::utils::{format_duration, format_size, relative_path};

/// Build the project
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Output directory
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Filename of the emitted page manifest
    #[arg(short, long)]
    pub manifest: Option<String>,

    /// Page directory, replaces the configured ones (repeatable)
    #[arg(short, long = "pages-dir")]
    pub pages_dir: Vec<String>,

    /// Run the whole build without writing anything to disk
    #[arg(long)]
    pub dry_run: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let start = Instant::now();

        info!("Loading configuration from {}", config_path);
        let mut config = Config::load(config_path)?;
        self.apply_overrides(&mut config);

        let root = config.root.clone();
        let manifest = config.pages.enabled.then(|| config.pages.manifest.clone());

        eprintln!("{} Building project...", "→".blue());

        let bundler = Bundler::new(config, self.into())?;
        let result = bundler.build().await?;

        eprintln!(
            "\n{} {} {} file(s) in {}\n",
            "✓".green().bold(),
            if self.dry_run { "Would write" } else { "Wrote" },
            result.bundles.len(),
            format_duration(start.elapsed())
        );

        for bundle in &result.bundles {
            let path = relative_path(&root, &bundle.output_path)
                .unwrap_or_else(|| bundle.output_path.display().to_string());
            eprintln!(
                "  {} {} {}",
                "•".dimmed(),
                path.cyan(),
                format_size(bundle.size).dimmed()
            );
        }

        if let Some(manifest) = manifest {
            eprintln!("\n  {} page manifest: {}", "→".dimmed(), manifest.cyan());
        }

        eprintln!();

        Ok(())
    }

    /// Command line flags win over the config file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(manifest) = &self.manifest {
            config.pages.manifest = manifest.clone();
        }
        if !self.pages_dir.is_empty() {
            config.pages.dirs = self.pages_dir.clone();
        }
    }
}

/// Build options derived from command arguments
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Overrides the configured output directory
    pub outdir: Option<PathBuf>,

    /// Write assets to disk once the build finishes
    pub write: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            outdir: None,
            write: true,
        }
    }
}

impl From<&BuildCommand> for BuildOptions {
    fn from(cmd: &BuildCommand) -> Self {
        Self {
            outdir: cmd.outdir.clone(),
            write: !cmd.dry_run,
        }
    }
}

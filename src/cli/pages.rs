//! Pages command implementation

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::plugins::PageChunksPlugin;
use crate::utils::relative_path;

/// List the pages that a build would split into chunks
#[derive(Args, Debug)]
pub struct PagesCommand {
    /// Page directory, replaces the configured ones (repeatable)
    #[arg(short, long = "pages-dir")]
    pub pages_dir: Vec<String>,
}

impl PagesCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let mut config = Config::load(config_path)?;
        if !self.pages_dir.is_empty() {
            config.pages.dirs = self.pages_dir.clone();
        }

        let plugin = PageChunksPlugin::new(config.pages.clone())?;
        let pages = plugin.discover(&config.root)?;

        if pages.is_empty() {
            eprintln!("{} No pages found", "!".yellow());
            return Ok(());
        }

        eprintln!("{} {} page(s)\n", "✓".green().bold(), pages.len());
        for page in pages.iter() {
            let path = relative_path(&config.root, &page.path)
                .unwrap_or_else(|| page.path.display().to_string());
            println!("{}\t{}", page.name, path);
        }

        Ok(())
    }
}

//! Project initialization command

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

/// Initialize a new project
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Project name / directory
    #[arg(default_value = ".")]
    pub name: String,

    /// Overwrite files that already exist
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(&self) -> Result<()> {
        let project_dir = Path::new(&self.name);

        eprintln!("{} Initializing new project...\n", "→".blue());

        if self.name != "." {
            fs::create_dir_all(project_dir).context("Failed to create project directory")?;
        }

        let files = [
            ("pagechunks.toml", self.generate_config()),
            ("src/index.js", MAIN_SOURCE.to_string()),
            ("src/pages/home.js", HOME_PAGE.to_string()),
            ("src/pages/catalog/index.js", CATALOG_PAGE.to_string()),
        ];

        for (relative, content) in files {
            self.write_file(project_dir, relative, &content)?;
        }

        eprintln!("\n{} Project initialized successfully!\n", "✓".green().bold());

        eprintln!("  Next steps:");
        if self.name != "." {
            eprintln!("    {} cd {}", "→".dimmed(), self.name.cyan());
        }
        eprintln!("    {} pagechunks build", "→".dimmed());
        eprintln!();

        Ok(())
    }

    fn write_file(&self, project_dir: &Path, relative: &str, content: &str) -> Result<()> {
        let path = project_dir.join(relative);

        if path.exists() && !self.force {
            eprintln!("  {} Skipped {} (exists)", "•".dimmed(), relative.yellow());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        eprintln!("  {} Created {}", "✓".green(), relative.cyan());

        Ok(())
    }

    fn generate_config(&self) -> String {
        format!(
            r#"# pagechunks configuration

[project]
name = "{name}"
version = "0.1.0"

[entry]
main = "src/index.js"

[output]
dir = "dist"
hash = true

[pages]
dirs = ["src/pages"]
manifest = "pages-manifest.json"
"#,
            name = if self.name == "." { "my-app" } else { &self.name },
        )
    }
}

const MAIN_SOURCE: &str = r#"async function render(name) {
  const manifest = await fetch('/pages-manifest.json').then((res) => res.json());
  const page = await import(`./${manifest[name]}`);
  document.querySelector('#app').textContent = page.default;
}

render(location.hash.slice(1) || 'home');
"#;

const HOME_PAGE: &str = r#"export default 'Home';
"#;

const CATALOG_PAGE: &str = r#"export default 'Catalog';
"#;

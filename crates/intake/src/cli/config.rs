//! `config show` and `config init`

use crate::cli::load_config;
use crate::cli::error::HelpfulError;
use anyhow::{Context, Result};
use intake::IntakeConfig;
use std::path::Path;

/// Print the effective configuration as TOML
pub fn run_show(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let source = if path.exists() { "file" } else { "defaults" };
    println!("# {} ({})", path.display(), source);
    print!("{}", toml::to_string_pretty(&config).context("Failed to render configuration")?);
    Ok(())
}

/// Write the default configuration to `path`
pub fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(HelpfulError::new(format!("Config already exists: {}", path.display()))
            .with_tries(["intake config init --force"])
            .into());
    }
    IntakeConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

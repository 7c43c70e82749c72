//! Command-line interface for the intake engine
//!
//! Every command works on the JSON catalog: it is loaded once at start and
//! written back after commands that change it.

pub mod config;
pub mod dataset;
pub mod error;
pub mod output;
pub mod report;
pub mod scan;

use crate::cli::error::HelpfulError;
use anyhow::{Context, Result};
use intake::{config::default_config_path, IntakeConfig, MemoryStore};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loaded configuration and catalog for one CLI run
pub struct Session {
    pub config: IntakeConfig,
    pub config_path: PathBuf,
    pub catalog_path: PathBuf,
    pub store: MemoryStore,
}

impl Session {
    /// Load config (defaults when the file is absent) and the catalog.
    ///
    /// `catalog` overrides the catalog path from the config file.
    pub fn open(catalog: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let config_path = config.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let config = load_config(&config_path)?;
        let catalog_path = catalog
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&config.catalog_path));

        let store = MemoryStore::load(&catalog_path)
            .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
        debug!("Loaded {} nodes from {}", store.len(), catalog_path.display());

        Ok(Self {
            config,
            config_path,
            catalog_path,
            store,
        })
    }

    /// Write the catalog back to disk
    pub fn save(&self) -> Result<()> {
        self.store
            .save(&self.catalog_path)
            .with_context(|| format!("Failed to save catalog {}", self.catalog_path.display()))?;
        debug!("Saved {} nodes to {}", self.store.len(), self.catalog_path.display());
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<IntakeConfig> {
    IntakeConfig::load_or_default(path)
        .map_err(|e| HelpfulError::invalid_config(path, &e.to_string()).into())
}

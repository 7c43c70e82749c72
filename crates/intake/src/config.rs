//! Configuration for the intake engine
//!
//! Vocabulary, wave whitelist, filename rules and per-experiment file-count
//! rules are plain data so the classifier and checker can be built from any
//! table, not only the cohort defaults below.

use crate::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for intake scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Path of the JSON catalog holding the namespace and its attributes
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Recognised experiment-type codes (exact, case-sensitive)
    #[serde(default = "default_experiment_types")]
    pub experiment_types: Vec<String>,

    /// Waves a dataset may carry without a dataset error
    #[serde(default = "default_accepted_waves")]
    pub accepted_waves: Vec<String>,

    /// Allowed characters for object and collection names
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,

    /// Version written when no version token was found
    #[serde(default = "default_version")]
    pub default_version: String,

    /// Experiment-type specific checks
    #[serde(default = "default_experiment_rules")]
    pub experiment_rules: Vec<ExperimentRule>,
}

/// File-count checks for one experiment type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRule {
    pub experiment_type: String,
    #[serde(default)]
    pub file_counts: Vec<FileCountRule>,
}

/// Expected number of objects whose dataset-relative path matches `pattern`.
///
/// A bound of `-1` is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCountRule {
    pub pattern: String,
    #[serde(default = "open_bound")]
    pub min: i64,
    #[serde(default = "open_bound")]
    pub max: i64,
}

impl FileCountRule {
    pub fn new(pattern: &str, min: i64, max: i64) -> Self {
        Self {
            pattern: pattern.to_string(),
            min,
            max,
        }
    }
}

fn open_bound() -> i64 {
    -1
}

fn default_catalog_path() -> String {
    intake_logging::intake_home()
        .join("catalog.json")
        .to_string_lossy()
        .to_string()
}

fn default_experiment_types() -> Vec<String> {
    [
        "pci",
        "echo",
        "facehouse",
        "faceemo",
        "coherence",
        "infprogap",
        "infsgaze",
        "infpop",
        "chprogap",
        "chantigap",
        "chsgaze",
        "pciconflict",
        "pcivacation",
        "peabody",
        "discount",
        "cyberball",
        "trustgame",
        "other",
        "inhibmockscan",
        "chdualet",
        "functionalmri",
        "infdualet",
        "vrbartbeta",
        "infdualetbeta",
        "infpeabody",
        "mockscan",
        "mriscan",
        "structural",
        "ruleswitch",
        "vrbart",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_accepted_waves() -> Vec<String> {
    ["20w", "30w", "0m", "5m", "10m", "3y", "6y", "9y", "12y", "15y"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_filename_pattern() -> String {
    "^[a-zA-Z0-9_.-]+$".to_string()
}

fn default_version() -> String {
    "Raw".to_string()
}

fn default_experiment_rules() -> Vec<ExperimentRule> {
    vec![ExperimentRule {
        experiment_type: "echo".to_string(),
        file_counts: vec![
            FileCountRule::new(r"/I[0-9]{7}$", 13, -1),
            FileCountRule::new(r"/I[0-9]{7}\.raw$", 7, 7),
            FileCountRule::new(r"/I[0-9]{7}\.dcm$", 6, 6),
            FileCountRule::new(r"/I[0-9]{7}\.vol$", 6, 6),
        ],
    }]
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            experiment_types: default_experiment_types(),
            accepted_waves: default_accepted_waves(),
            filename_pattern: default_filename_pattern(),
            default_version: default_version(),
            experiment_rules: default_experiment_rules(),
        }
    }
}

impl IntakeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| IntakeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| IntakeError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rules for an experiment type, if any are configured
    pub fn rules_for(&self, experiment_type: &str) -> Option<&ExperimentRule> {
        self.experiment_rules
            .iter()
            .find(|rule| rule.experiment_type == experiment_type)
    }
}

/// Default config file: `<intake home>/config.toml`
pub fn default_config_path() -> PathBuf {
    intake_logging::intake_home().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IntakeConfig::default();
        assert!(config.catalog_path.ends_with("catalog.json"));
        assert!(config.experiment_types.iter().any(|t| t == "echo"));
        assert_eq!(config.accepted_waves.len(), 10);
        assert_eq!(config.default_version, "Raw");
        let echo = config.rules_for("echo").unwrap();
        assert_eq!(echo.file_counts[0].min, 13);
        assert_eq!(echo.file_counts[0].max, -1);
        assert!(config.rules_for("pci").is_none());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let parsed: IntakeConfig = toml::from_str(
            r#"
            accepted_waves = ["10w"]

            [[experiment_rules]]
            experiment_type = "pci"
            file_counts = [{ pattern = "\\.edf$", min = 1 }]
            "#,
        )
        .unwrap();

        assert_eq!(parsed.accepted_waves, vec!["10w".to_string()]);
        assert_eq!(parsed.filename_pattern, "^[a-zA-Z0-9_.-]+$");
        let pci = parsed.rules_for("pci").unwrap();
        assert_eq!(pci.file_counts[0], FileCountRule::new(r"\.edf$", 1, -1));
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let config = IntakeConfig::default();
        config.save(&path).unwrap();

        let loaded = IntakeConfig::load(&path).unwrap();
        assert_eq!(loaded.experiment_rules, config.experiment_rules);
        assert_eq!(loaded.experiment_types, config.experiment_types);
    }
}

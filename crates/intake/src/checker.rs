//! Dataset validation pass
//!
//! Runs after the walk over every dataset id found under the scanned root.
//! Findings are written as `dataset_error` / `dataset_warning` on each
//! boundary node of the dataset.

use crate::config::{FileCountRule, IntakeConfig};
use crate::dataset_id::DatasetId;
use crate::datasets;
use crate::error::{IntakeError, Result};
use crate::lock::dataset_lock_status;
use crate::store::{MetadataStore, NodeInfo};
use crate::types::{self, attr};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// A file-count rule with its pattern compiled
#[derive(Debug, Clone)]
struct CountRule {
    pattern: String,
    regex: Regex,
    min: i64,
    max: i64,
}

impl CountRule {
    fn compile(rule: &FileCountRule) -> Result<Self> {
        let regex = Regex::new(&rule.pattern)
            .map_err(|e| IntakeError::Pattern(format!("{}: {}", rule.pattern, e)))?;
        Ok(Self {
            pattern: rule.pattern.clone(),
            regex,
            min: rule.min,
            max: rule.max,
        })
    }

    /// Warning text when the match count is out of range
    fn evaluate<'p>(&self, rel_paths: impl IntoIterator<Item = &'p str>) -> Option<String> {
        let found = rel_paths
            .into_iter()
            .filter(|p| self.regex.is_match(p))
            .count() as i64;
        if self.min != -1 && found < self.min {
            return Some(format!(
                "Expected at least {} files of type '{}', found {}",
                self.min, self.pattern, found
            ));
        }
        if self.max != -1 && found > self.max {
            return Some(format!(
                "Expected at most {} files of type '{}', found {}",
                self.max, self.pattern, found
            ));
        }
        None
    }
}

/// Errors and warnings for one dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Counts from one check pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckStats {
    pub datasets: usize,
    pub skipped_locked: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Generic and experiment-type specific dataset checks
#[derive(Debug, Clone)]
pub struct DatasetChecker {
    accepted_waves: HashSet<String>,
    rules: HashMap<String, Vec<CountRule>>,
}

impl DatasetChecker {
    pub fn new(config: &IntakeConfig) -> Result<Self> {
        let mut rules = HashMap::new();
        for rule in &config.experiment_rules {
            let compiled = rule
                .file_counts
                .iter()
                .map(CountRule::compile)
                .collect::<Result<Vec<_>>>()?;
            rules.insert(rule.experiment_type.clone(), compiled);
        }
        Ok(Self {
            accepted_waves: config.accepted_waves.iter().cloned().collect(),
            rules,
        })
    }

    /// Check every dataset under `root`. Locked or frozen datasets are skipped.
    pub fn check_all<S: MetadataStore + ?Sized>(&self, store: &mut S, root: &str) -> Result<CheckStats> {
        let mut stats = CheckStats::default();
        for id in datasets::dataset_ids(&*store, root)? {
            let toplevels = datasets::toplevels(&*store, root, &id)?;
            if toplevels.is_empty() {
                debug!("Dataset {:?} has no boundary under {}", id, root);
                continue;
            }
            if dataset_lock_status(&*store, &toplevels)?.is_held() {
                debug!("Skipping checks for locked dataset {:?}", id);
                stats.skipped_locked += 1;
                continue;
            }

            let dataset = DatasetId::parse(&id)?;
            let findings = self.findings(&*store, root, &dataset, &toplevels)?;
            for tl in &toplevels {
                for error in &findings.errors {
                    store.add_attribute(&tl.path, attr::DATASET_ERROR, error)?;
                }
                for warning in &findings.warnings {
                    store.add_attribute(&tl.path, attr::DATASET_WARNING, warning)?;
                }
            }
            stats.datasets += 1;
            stats.errors += findings.errors.len();
            stats.warnings += findings.warnings.len();
        }
        Ok(stats)
    }

    /// Evaluate the checks for one dataset without writing anything
    pub fn findings<S: MetadataStore + ?Sized>(
        &self,
        store: &S,
        root: &str,
        dataset: &DatasetId,
        toplevels: &[NodeInfo],
    ) -> Result<Findings> {
        let mut findings = Findings::default();

        if !self.accepted_waves.contains(&dataset.wave) {
            findings.errors.push(format!(
                "The wave '{}' is not in the list of accepted waves",
                dataset.wave
            ));
        }

        let Some(rules) = self.rules.get(&dataset.experiment_type) else {
            return Ok(findings);
        };

        let parent = match toplevels.first().and_then(|tl| types::parent(&tl.path)) {
            Some(parent) => parent,
            None => {
                warn!(
                    "No parent for dataset {:?}, counting files under {}",
                    dataset.encode(),
                    root
                );
                root
            }
        };
        let objects = datasets::dataset_objects(store, parent, &dataset.encode())?;
        let rel_paths: Vec<&str> = objects
            .iter()
            .map(|o| types::relative_to(&o.path, parent))
            .collect();

        for rule in rules {
            if let Some(warning) = rule.evaluate(rel_paths.iter().copied()) {
                findings.warnings.push(warning);
            }
        }
        Ok(findings)
    }
}

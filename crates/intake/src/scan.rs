//! Scan entry point: walk, then check, then aggregate

use crate::aggregate::AggregationEngine;
use crate::apply::MetadataApplier;
use crate::checker::{CheckStats, DatasetChecker};
use crate::config::IntakeConfig;
use crate::error::Result;
use crate::lock::lock_status;
use crate::store::{MetadataStore, StoreError};
use crate::token::Classifier;
use crate::types::ScanContext;
use crate::walker::{PathWalker, WalkStats};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Result of one scan invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub status: String,
    pub root: String,
    /// True when the root itself is locked and nothing was touched
    pub root_locked: bool,
    pub walk: WalkStats,
    pub checks: CheckStats,
    pub aggregated: usize,
}

/// Configured intake engine
#[derive(Debug, Clone)]
pub struct Intake {
    config: IntakeConfig,
    classifier: Classifier,
    checker: DatasetChecker,
    aggregator: AggregationEngine,
}

impl Intake {
    /// Compile the classification and rule tables of `config`
    pub fn new(config: IntakeConfig) -> Result<Self> {
        let classifier = Classifier::new(&config)?;
        let checker = DatasetChecker::new(&config)?;
        Ok(Self {
            config,
            classifier,
            checker,
            aggregator: AggregationEngine::new(),
        })
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Re-tag everything unlocked under `root`, then check and aggregate
    /// every dataset found there.
    ///
    /// Safe to repeat: prior intake attributes are removed before re-tagging,
    /// so the same catalog and context always produce the same attributes.
    pub fn scan<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        root: &str,
        ctx: &ScanContext,
    ) -> Result<ScanSummary> {
        let start = Instant::now();
        let node = store.node(root)?;
        // dataset directories derive from this path, so it must be the canonical one
        let root = node.path.as_str();
        if !node.is_collection() {
            return Err(StoreError::NotACollection(root.to_string()).into());
        }

        if lock_status(&*store, &node)?.is_held() {
            info!("Root {} is locked or lies in a locked dataset, nothing to scan", root);
            return Ok(ScanSummary {
                status: "ok".to_string(),
                root: root.to_string(),
                root_locked: true,
                walk: WalkStats::default(),
                checks: CheckStats::default(),
                aggregated: 0,
            });
        }

        let applier = MetadataApplier::new(&self.config.default_version);
        let walk = PathWalker::new(&mut *store, &self.classifier, applier, ctx).run(root)?;
        let checks = self.checker.check_all(&mut *store, root)?;
        let aggregated = self.aggregator.run(&mut *store, root)?;

        info!(
            "Scanned {} in {:?}: {} objects, {} collections, {} datasets, {} errors, {} warnings",
            root,
            start.elapsed(),
            walk.data_objects,
            walk.collections,
            walk.boundaries,
            checks.errors,
            checks.warnings
        );

        Ok(ScanSummary {
            status: "ok".to_string(),
            root: root.to_string(),
            root_locked: false,
            walk,
            checks,
            aggregated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::attr;
    use chrono::{TimeZone, Utc};

    fn ctx() -> ScanContext {
        ScanContext::new("dm", Utc.timestamp_opt(1_600_000_000, 0).unwrap())
    }

    #[test]
    fn test_scan_requires_collection_root() {
        let mut store = MemoryStore::new();
        store.put_data_object("/z/p/file", 1, None, ctx().now).unwrap();
        let intake = Intake::new(IntakeConfig::default()).unwrap();
        assert!(intake.scan(&mut store, "/z/p/file", &ctx()).is_err());
        assert!(intake.scan(&mut store, "/z/missing", &ctx()).is_err());
    }

    #[test]
    fn test_locked_root_is_left_alone() {
        let mut store = MemoryStore::new();
        store.put_data_object("/z/p/B12345_10w_echo/a", 1, None, ctx().now).unwrap();
        store.set_attribute("/z/p", attr::TO_VAULT_LOCK, "1").unwrap();

        let intake = Intake::new(IntakeConfig::default()).unwrap();
        let summary = intake.scan(&mut store, "/z/p", &ctx()).unwrap();
        assert!(summary.root_locked);
        assert!(!store.has_attribute("/z/p/B12345_10w_echo", attr::SCANNED).unwrap());
    }

    #[test]
    fn test_trailing_slash_root_gives_same_ids() {
        let intake = Intake::new(IntakeConfig::default()).unwrap();
        let object = "/z/p/B12345_10m_echo.dcm";
        let mut ids = Vec::new();
        for root in ["/z/p", "/z/p/"] {
            let mut store = MemoryStore::new();
            store.put_data_object(object, 1, None, ctx().now).unwrap();
            let summary = intake.scan(&mut store, root, &ctx()).unwrap();
            assert_eq!(summary.root, "/z/p");
            ids.push(store.attribute(object, attr::DATASET_ID).unwrap());
        }
        assert_eq!(ids[0].as_deref(), Some("10m\techo\tB12345\tRaw\t/z/p"));
        assert_eq!(ids[0], ids[1]);
    }
}

//! Recursive scan pass
//!
//! Depth-first over the catalog, data objects before subcollections, so a
//! collection-level boundary is always tagged before anything beneath it.
//! Each branch carries its own [`Scope`] value.

use crate::apply::MetadataApplier;
use crate::error::Result;
use crate::lock::lock_status;
use crate::scope::Scope;
use crate::store::{MetadataStore, NodeInfo};
use crate::token::Classifier;
use crate::types::{self, attr, ScanContext};
use serde::Serialize;
use tracing::debug;

pub const INVALID_FILENAME: &str = "Filename contains invalid characters";
pub const INVALID_DIRECTORY_NAME: &str = "Directory name contains invalid characters";

/// Counts from one walk
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub data_objects: usize,
    pub collections: usize,
    pub boundaries: usize,
    pub unrecognized: usize,
    pub invalid_names: usize,
    pub skipped_locked: usize,
}

/// Tags every unlocked node under a root with its classification
pub struct PathWalker<'a, S: MetadataStore + ?Sized> {
    store: &'a mut S,
    classifier: &'a Classifier,
    applier: MetadataApplier<'a>,
    ctx: &'a ScanContext,
    stats: WalkStats,
}

impl<'a, S: MetadataStore + ?Sized> PathWalker<'a, S> {
    pub fn new(
        store: &'a mut S,
        classifier: &'a Classifier,
        applier: MetadataApplier<'a>,
        ctx: &'a ScanContext,
    ) -> Self {
        Self {
            store,
            classifier,
            applier,
            ctx,
            stats: WalkStats::default(),
        }
    }

    /// Walk everything beneath `root`. The root node itself is not tagged.
    pub fn run(mut self, root: &str) -> Result<WalkStats> {
        self.walk(root, &Scope::new(), false)?;
        Ok(self.stats)
    }

    fn walk(&mut self, root: &str, scope: &Scope, in_dataset: bool) -> Result<()> {
        let children = self.store.children(root)?;

        for object in &children.data_objects {
            self.visit_object(root, object, scope, in_dataset)?;
        }

        for coll in &children.collections {
            if coll.path == root {
                continue;
            }
            if let Some((next, next_in_dataset)) = self.visit_collection(coll, scope, in_dataset)? {
                self.walk(&coll.path, &next, next_in_dataset)?;
            }
        }
        Ok(())
    }

    /// Common prelude: lock check, reset, scanned stamp, name check.
    /// Returns false when the node is held and must not be touched.
    fn prepare(&mut self, node: &NodeInfo) -> Result<bool> {
        if lock_status(&*self.store, node)?.is_held() {
            debug!("Skipping locked {} {}", node.kind.as_str(), node.path);
            self.stats.skipped_locked += 1;
            return Ok(false);
        }

        self.applier.reset(&mut *self.store, &node.path)?;
        self.store
            .set_attribute(&node.path, attr::SCANNED, &self.ctx.scanned_stamp())?;

        if !self.classifier.is_valid_name(types::basename(&node.path)) {
            let message = if node.is_collection() {
                INVALID_DIRECTORY_NAME
            } else {
                INVALID_FILENAME
            };
            self.store.add_attribute(&node.path, attr::ERROR, message)?;
            self.stats.invalid_names += 1;
        }
        Ok(true)
    }

    fn visit_object(
        &mut self,
        coll: &str,
        object: &NodeInfo,
        scope: &Scope,
        in_dataset: bool,
    ) -> Result<()> {
        if !self.prepare(object)? {
            return Ok(());
        }
        self.stats.data_objects += 1;

        if in_dataset {
            self.applier
                .apply_dataset_metadata(&mut *self.store, &object.path, scope, false)?;
            return Ok(());
        }

        let name = types::strip_extension(types::basename(&object.path));
        let own = scope.extended(self.classifier, name);
        if own.is_complete() {
            debug!("Dataset boundary at data object {}", object.path);
            self.applier
                .apply_dataset_metadata(&mut *self.store, &object.path, &own.at_boundary(coll), true)?;
            self.stats.boundaries += 1;
        } else {
            self.applier.apply_partial_metadata(&mut *self.store, &object.path, &own)?;
            self.stats.unrecognized += 1;
        }
        Ok(())
    }

    /// Tag one subcollection; returns the scope to recurse with, or `None`
    /// when the subtree is held.
    fn visit_collection(
        &mut self,
        coll: &NodeInfo,
        scope: &Scope,
        in_dataset: bool,
    ) -> Result<Option<(Scope, bool)>> {
        if !self.prepare(coll)? {
            return Ok(None);
        }
        self.stats.collections += 1;

        if in_dataset {
            self.applier
                .apply_dataset_metadata(&mut *self.store, &coll.path, scope, false)?;
            return Ok(Some((scope.clone(), true)));
        }

        let own = scope.extended(self.classifier, types::basename(&coll.path));
        if own.is_complete() {
            debug!("Dataset boundary at collection {}", coll.path);
            let bounded = own.at_boundary(&coll.path);
            self.applier
                .apply_dataset_metadata(&mut *self.store, &coll.path, &bounded, true)?;
            self.stats.boundaries += 1;
            Ok(Some((bounded, true)))
        } else {
            self.applier.apply_partial_metadata(&mut *self.store, &coll.path, &own)?;
            self.stats.unrecognized += 1;
            Ok(Some((own, false)))
        }
    }
}

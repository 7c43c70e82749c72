//! Object/error/warning roll-up onto dataset boundaries

use crate::datasets;
use crate::error::Result;
use crate::lock::lock_status;
use crate::store::{MetadataStore, NodeInfo};
use crate::types::{self, attr};
use serde::Serialize;
use tracing::debug;

/// Counts written onto one boundary node
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    pub objects: u64,
    pub errors: u64,
    pub warnings: u64,
}

/// Writes `object_count`, `object_errors` and `object_warnings` on every
/// unlocked boundary under a root.
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate every dataset under `root`; returns the number of boundary
    /// nodes written.
    pub fn run<S: MetadataStore + ?Sized>(&self, store: &mut S, root: &str) -> Result<usize> {
        let mut written = 0;
        for id in datasets::dataset_ids(&*store, root)? {
            for tl in datasets::toplevels(&*store, root, &id)? {
                if lock_status(&*store, &tl)?.is_held() {
                    debug!("Not aggregating locked boundary {}", tl.path);
                    continue;
                }
                let counts = self.count(&*store, &tl, &id)?;
                store.set_attribute(&tl.path, attr::OBJECT_COUNT, &counts.objects.to_string())?;
                store.set_attribute(&tl.path, attr::OBJECT_ERRORS, &counts.errors.to_string())?;
                store.set_attribute(&tl.path, attr::OBJECT_WARNINGS, &counts.warnings.to_string())?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Counts for one boundary.
    ///
    /// A collection boundary counts every data object in its subtree, nested
    /// classification notwithstanding. A data-object boundary counts the
    /// objects beside it that carry the same dataset id.
    pub fn count<S: MetadataStore + ?Sized>(
        &self,
        store: &S,
        boundary: &NodeInfo,
        dataset_id: &str,
    ) -> Result<ObjectCounts> {
        let objects = if boundary.is_collection() {
            store.subtree_objects(&boundary.path)?
        } else {
            let dir = types::parent(&boundary.path).unwrap_or(&boundary.path);
            let mut siblings = Vec::new();
            for object in store.children(dir)?.data_objects {
                if store.attribute(&object.path, attr::DATASET_ID)?.as_deref() == Some(dataset_id) {
                    siblings.push(object);
                }
            }
            siblings
        };

        let mut counts = ObjectCounts::default();
        for object in &objects {
            counts.objects += 1;
            if store.has_attribute(&object.path, attr::ERROR)? {
                counts.errors += 1;
            }
            if store.has_attribute(&object.path, attr::WARNING)? {
                counts.warnings += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    const OUTER: &str = "10w\techo\tB12345\tRaw\t/z/p/ds";
    const INNER: &str = "10w\tpci\tB12345\tRaw\t/z/p/ds/nested";

    #[test]
    fn test_outer_boundary_counts_nested_objects() {
        let t = Utc.timestamp_opt(0, 0).unwrap();
        let mut store = MemoryStore::new();
        store.put_data_object("/z/p/ds/a", 1, None, t).unwrap();
        store.put_data_object("/z/p/ds/b", 1, None, t).unwrap();
        store.put_data_object("/z/p/ds/nested/c", 1, None, t).unwrap();

        store.set_attribute("/z/p/ds", attr::DATASET_TOPLEVEL, OUTER).unwrap();
        store.set_attribute("/z/p/ds", attr::DATASET_ID, OUTER).unwrap();
        store.set_attribute("/z/p/ds/a", attr::DATASET_ID, OUTER).unwrap();
        store.set_attribute("/z/p/ds/b", attr::DATASET_ID, OUTER).unwrap();
        store.add_attribute("/z/p/ds/a", attr::ERROR, "bad name").unwrap();
        store.set_attribute("/z/p/ds/nested", attr::DATASET_TOPLEVEL, INNER).unwrap();
        store.set_attribute("/z/p/ds/nested", attr::DATASET_ID, INNER).unwrap();
        store.set_attribute("/z/p/ds/nested/c", attr::DATASET_ID, INNER).unwrap();

        let written = AggregationEngine::new().run(&mut store, "/z/p").unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.attribute("/z/p/ds", attr::OBJECT_COUNT).unwrap().as_deref(), Some("3"));
        assert_eq!(store.attribute("/z/p/ds", attr::OBJECT_ERRORS).unwrap().as_deref(), Some("1"));
        assert_eq!(store.attribute("/z/p/ds", attr::OBJECT_WARNINGS).unwrap().as_deref(), Some("0"));
        assert_eq!(
            store.attribute("/z/p/ds/nested", attr::OBJECT_COUNT).unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_object_boundary_counts_same_id_siblings() {
        let t = Utc.timestamp_opt(0, 0).unwrap();
        let id = "10w\techo\tB12345\tRaw\t/z/p";
        let mut store = MemoryStore::new();
        for name in ["B12345_10w_echo_1", "B12345_10w_echo_2", "other"] {
            store.put_data_object(&format!("/z/p/{name}"), 1, None, t).unwrap();
        }
        for name in ["B12345_10w_echo_1", "B12345_10w_echo_2"] {
            let path = format!("/z/p/{name}");
            store.set_attribute(&path, attr::DATASET_ID, id).unwrap();
            store.set_attribute(&path, attr::DATASET_TOPLEVEL, id).unwrap();
        }
        store.add_attribute("/z/p/B12345_10w_echo_2", attr::WARNING, "w").unwrap();

        let boundary = store.node("/z/p/B12345_10w_echo_1").unwrap();
        let counts = AggregationEngine::new().count(&store, &boundary, id).unwrap();
        assert_eq!(counts, ObjectCounts { objects: 2, errors: 0, warnings: 1 });
    }
}

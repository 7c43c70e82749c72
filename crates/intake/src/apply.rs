//! Writing classification results onto nodes

use crate::dataset_id::DatasetId;
use crate::error::Result;
use crate::scope::Scope;
use crate::store::{MetadataStore, RemoveOutcome};
use crate::types::{attr, INTAKE_ATTRIBUTES, UNRECOGNIZED_REASON};
use tracing::warn;

/// Writes WEPV attributes, dataset ids and boundary markers
#[derive(Debug, Clone, Copy)]
pub struct MetadataApplier<'a> {
    default_version: &'a str,
}

impl<'a> MetadataApplier<'a> {
    pub fn new(default_version: &'a str) -> Self {
        Self { default_version }
    }

    /// Write the full dataset classification; the boundary node also gets
    /// `dataset_toplevel`. The scope must be dataset-complete.
    pub fn apply_dataset_metadata<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        path: &str,
        scope: &Scope,
        is_top_level: bool,
    ) -> Result<Option<DatasetId>> {
        let Some(id) = DatasetId::from_scope(scope, self.default_version) else {
            warn!("Refusing to tag {} with an incomplete scope {:?}", path, scope);
            return Ok(None);
        };
        let encoded = id.encode();

        store.set_attribute(path, attr::WAVE, &id.wave)?;
        store.set_attribute(path, attr::EXPERIMENT_TYPE, &id.experiment_type)?;
        store.set_attribute(path, attr::PSEUDOCODE, &id.pseudocode)?;
        store.set_attribute(path, attr::VERSION, &id.version)?;
        store.set_attribute(path, attr::DIRECTORY, &id.directory)?;
        store.set_attribute(path, attr::DATASET_ID, &encoded)?;
        if is_top_level {
            store.set_attribute(path, attr::DATASET_TOPLEVEL, &encoded)?;
        }
        Ok(Some(id))
    }

    /// Write whichever WEPV tokens are known and flag the node unrecognized
    pub fn apply_partial_metadata<S: MetadataStore + ?Sized>(
        &self,
        store: &mut S,
        path: &str,
        scope: &Scope,
    ) -> Result<()> {
        for (kind, value) in scope.resolved() {
            store.set_attribute(path, kind.as_str(), value)?;
        }
        store.set_attribute(path, attr::UNRECOGNIZED, UNRECOGNIZED_REASON)?;
        Ok(())
    }

    /// Remove every intake attribute from a node.
    ///
    /// A name with nothing to remove is fine; any other failure is logged
    /// and returned.
    pub fn reset<S: MetadataStore + ?Sized>(&self, store: &mut S, path: &str) -> Result<()> {
        for name in INTAKE_ATTRIBUTES {
            match store.remove_attribute_wildcard(path, name, "%") {
                Ok(RemoveOutcome::Removed(_)) | Ok(RemoveOutcome::NotFound) => {}
                Err(err) => {
                    warn!("Failed to remove {} from {}: {}", name, path, err);
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .put_data_object("/z/p/ds/a.dcm", 1, None, Utc.timestamp_opt(0, 0).unwrap())
            .unwrap();
        store
    }

    fn complete() -> Scope {
        Scope {
            wave: Some("10w".into()),
            experiment_type: Some("echo".into()),
            pseudocode: Some("B12345".into()),
            version: None,
            dataset_directory: Some("/z/p/ds".into()),
        }
    }

    #[test]
    fn test_top_level_gets_marker() {
        let mut store = store();
        let applier = MetadataApplier::new("Raw");
        let id = applier
            .apply_dataset_metadata(&mut store, "/z/p/ds", &complete(), true)
            .unwrap()
            .unwrap();
        assert_eq!(
            store.attribute("/z/p/ds", attr::DATASET_TOPLEVEL).unwrap(),
            Some(id.encode())
        );
        assert_eq!(store.attribute("/z/p/ds", attr::VERSION).unwrap().as_deref(), Some("Raw"));

        applier
            .apply_dataset_metadata(&mut store, "/z/p/ds/a.dcm", &complete(), false)
            .unwrap();
        assert!(!store.has_attribute("/z/p/ds/a.dcm", attr::DATASET_TOPLEVEL).unwrap());
        assert_eq!(
            store.attribute("/z/p/ds/a.dcm", attr::DATASET_ID).unwrap(),
            Some(id.encode())
        );
    }

    #[test]
    fn test_partial_writes_known_tokens_only() {
        let mut store = store();
        let scope = Scope {
            wave: Some("10w".into()),
            ..Scope::default()
        };
        MetadataApplier::new("Raw")
            .apply_partial_metadata(&mut store, "/z/p/ds/a.dcm", &scope)
            .unwrap();

        let names: Vec<String> = store
            .get_attributes("/z/p/ds/a.dcm")
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["wave", "unrecognized"]);
    }

    #[test]
    fn test_reset_keeps_comments() {
        let mut store = store();
        let path = "/z/p/ds";
        let applier = MetadataApplier::new("Raw");
        applier.apply_dataset_metadata(&mut store, path, &complete(), true).unwrap();
        store.add_attribute(path, attr::COMMENT, "1:dm:ok").unwrap();
        store.add_attribute(path, attr::DATASET_ERROR, "bad wave").unwrap();

        applier.reset(&mut store, path).unwrap();
        let names: Vec<String> =
            store.get_attributes(path).unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["comment"]);
    }

    #[test]
    fn test_reset_of_missing_node_fails() {
        let mut store = store();
        let err = MetadataApplier::new("Raw").reset(&mut store, "/z/nope").unwrap_err();
        match err {
            crate::error::IntakeError::Store(crate::store::StoreError::NodeNotFound(path)) => {
                assert_eq!(path, "/z/nope")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

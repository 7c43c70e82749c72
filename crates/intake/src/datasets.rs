//! Dataset discovery and browsing over already-tagged nodes

use crate::dataset_id::DatasetId;
use crate::error::{IntakeError, Result};
use crate::lock::{dataset_lock_status, LockStatus};
use crate::store::{MetadataStore, NodeInfo, PathScope};
use crate::types::{attr, NodeKind, ScanContext};
use serde::Serialize;
use std::collections::BTreeSet;

/// Distinct dataset ids carried by any node under `root`
pub fn dataset_ids<S: MetadataStore + ?Sized>(store: &S, root: &str) -> Result<BTreeSet<String>> {
    Ok(store
        .query_by_attribute(PathScope::Subtree(root), attr::DATASET_ID, None)?
        .into_iter()
        .map(|row| row.value)
        .collect())
}

/// Boundary nodes of a dataset under `root`, ordered by path
pub fn toplevels<S: MetadataStore + ?Sized>(
    store: &S,
    root: &str,
    dataset_id: &str,
) -> Result<Vec<NodeInfo>> {
    let paths: BTreeSet<String> = store
        .query_by_attribute(PathScope::Subtree(root), attr::DATASET_TOPLEVEL, Some(dataset_id))?
        .into_iter()
        .map(|row| row.path)
        .collect();
    let mut nodes = Vec::with_capacity(paths.len());
    for path in paths {
        nodes.push(store.node(&path)?);
    }
    Ok(nodes)
}

/// Data objects under `root` carrying `dataset_id`, ordered by path
pub fn dataset_objects<S: MetadataStore + ?Sized>(
    store: &S,
    root: &str,
    dataset_id: &str,
) -> Result<Vec<NodeInfo>> {
    let paths: BTreeSet<String> = store
        .query_by_attribute(PathScope::Subtree(root), attr::DATASET_ID, Some(dataset_id))?
        .into_iter()
        .filter(|row| row.kind == NodeKind::DataObject)
        .map(|row| row.path)
        .collect();
    paths
        .iter()
        .map(|p| store.node(p).map_err(IntakeError::from))
        .collect()
}

/// One dataset as listed for a collection
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub id: String,
    pub wave: String,
    pub experiment_type: String,
    pub pseudocode: String,
    pub version: String,
    pub directory: String,
    pub toplevels: Vec<String>,
    pub object_count: u64,
    pub object_errors: u64,
    pub object_warnings: u64,
    pub dataset_errors: usize,
    pub dataset_warnings: usize,
    pub lock: LockStatus,
}

/// Everything known about one dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetDetails {
    pub summary: DatasetSummary,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub comments: Vec<String>,
    pub scanned: Option<String>,
    pub objects: Vec<String>,
}

/// A data object needing attention before it can join a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnrecognizedObject {
    pub path: String,
    pub unrecognized: Option<String>,
    pub scanned: bool,
}

fn count_attribute<S: MetadataStore + ?Sized>(store: &S, path: &str, name: &str) -> Result<u64> {
    Ok(store
        .attribute(path, name)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

fn collect_values<S: MetadataStore + ?Sized>(
    store: &S,
    toplevels: &[NodeInfo],
    name: &str,
) -> Result<Vec<String>> {
    let mut values = BTreeSet::new();
    for tl in toplevels {
        values.extend(store.attribute_values(&tl.path, name)?);
    }
    Ok(values.into_iter().collect())
}

fn summarize<S: MetadataStore + ?Sized>(
    store: &S,
    id: &str,
    toplevels: &[NodeInfo],
) -> Result<DatasetSummary> {
    let dataset = DatasetId::parse(id)?;
    let first = &toplevels[0].path;
    Ok(DatasetSummary {
        id: id.to_string(),
        wave: dataset.wave,
        experiment_type: dataset.experiment_type,
        pseudocode: dataset.pseudocode,
        version: dataset.version,
        directory: dataset.directory,
        toplevels: toplevels.iter().map(|t| t.path.clone()).collect(),
        object_count: count_attribute(store, first, attr::OBJECT_COUNT)?,
        object_errors: count_attribute(store, first, attr::OBJECT_ERRORS)?,
        object_warnings: count_attribute(store, first, attr::OBJECT_WARNINGS)?,
        dataset_errors: collect_values(store, toplevels, attr::DATASET_ERROR)?.len(),
        dataset_warnings: collect_values(store, toplevels, attr::DATASET_WARNING)?.len(),
        lock: dataset_lock_status(store, toplevels)?,
    })
}

/// Datasets whose boundary lies under `root`, ordered by id
pub fn list_datasets<S: MetadataStore + ?Sized>(store: &S, root: &str) -> Result<Vec<DatasetSummary>> {
    let ids: BTreeSet<String> = store
        .query_by_attribute(PathScope::Subtree(root), attr::DATASET_TOPLEVEL, None)?
        .into_iter()
        .map(|row| row.value)
        .collect();

    let mut summaries = Vec::with_capacity(ids.len());
    for id in ids {
        let tls = toplevels(store, root, &id)?;
        summaries.push(summarize(store, &id, &tls)?);
    }
    Ok(summaries)
}

/// Findings, comments and file list of one dataset
pub fn dataset_details<S: MetadataStore + ?Sized>(
    store: &S,
    root: &str,
    dataset_id: &str,
) -> Result<DatasetDetails> {
    let tls = toplevels(store, root, dataset_id)?;
    if tls.is_empty() {
        return Err(IntakeError::DatasetNotFound(dataset_id.to_string()));
    }
    let summary = summarize(store, dataset_id, &tls)?;
    let comments = collect_values(store, &tls, attr::COMMENT)?;
    Ok(DatasetDetails {
        errors: collect_values(store, &tls, attr::DATASET_ERROR)?,
        warnings: collect_values(store, &tls, attr::DATASET_WARNING)?,
        comments,
        scanned: store.attribute(&tls[0].path, attr::SCANNED)?,
        objects: dataset_objects(store, root, dataset_id)?
            .into_iter()
            .map(|n| n.path)
            .collect(),
        summary,
    })
}

/// Append a comment to every boundary node of a dataset.
///
/// Stored as `<unix seconds>:<actor>:<text>`; comments outlive rescans.
pub fn add_dataset_comment<S: MetadataStore + ?Sized>(
    store: &mut S,
    root: &str,
    dataset_id: &str,
    ctx: &ScanContext,
    text: &str,
) -> Result<String> {
    let tls = toplevels(store, root, dataset_id)?;
    if tls.is_empty() {
        return Err(IntakeError::DatasetNotFound(dataset_id.to_string()));
    }
    let comment = format!("{}:{}:{}", ctx.now.timestamp(), ctx.actor, text);
    for tl in &tls {
        store.add_attribute(&tl.path, attr::COMMENT, &comment)?;
    }
    Ok(comment)
}

/// Data objects under `root` that are unrecognized or were never scanned
pub fn list_unrecognized_unscanned<S: MetadataStore + ?Sized>(
    store: &S,
    root: &str,
) -> Result<Vec<UnrecognizedObject>> {
    let mut found = Vec::new();
    for object in store.subtree_objects(root)? {
        let attributes = store.get_attributes(&object.path)?;
        let unrecognized = attributes
            .iter()
            .find(|a| a.name == attr::UNRECOGNIZED)
            .map(|a| a.value.clone());
        let scanned = attributes.iter().any(|a| a.name == attr::SCANNED);
        if unrecognized.is_some() || !scanned {
            found.push(UnrecognizedObject {
                path: object.path,
                unrecognized,
                scanned,
            });
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    const ID: &str = "10w\techo\tB12345\tRaw\t/z/p";

    fn ctx() -> ScanContext {
        ScanContext::new("dm", Utc.timestamp_opt(1_600_000_000, 0).unwrap())
    }

    /// Two loose files in /z/p forming one object-level dataset, one stray file
    fn store() -> MemoryStore {
        let t = ctx().now;
        let mut store = MemoryStore::new();
        for name in ["B12345_10w_echo_1.dcm", "B12345_10w_echo_2.dcm", "notes.txt"] {
            store.put_data_object(&format!("/z/p/{name}"), 1, None, t).unwrap();
        }
        for name in ["B12345_10w_echo_1.dcm", "B12345_10w_echo_2.dcm"] {
            let path = format!("/z/p/{name}");
            store.set_attribute(&path, attr::DATASET_ID, ID).unwrap();
            store.set_attribute(&path, attr::DATASET_TOPLEVEL, ID).unwrap();
            store.set_attribute(&path, attr::SCANNED, "dm:1").unwrap();
            store.set_attribute(&path, attr::OBJECT_COUNT, "2").unwrap();
        }
        store
            .set_attribute("/z/p/notes.txt", attr::UNRECOGNIZED, "missing")
            .unwrap();
        store
    }

    #[test]
    fn test_object_dataset_has_multiple_toplevels() {
        let store = store();
        assert_eq!(dataset_ids(&store, "/z/p").unwrap().len(), 1);
        assert_eq!(toplevels(&store, "/z/p", ID).unwrap().len(), 2);

        let list = list_datasets(&store, "/z/p").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].object_count, 2);
        assert_eq!(list[0].pseudocode, "B12345");
    }

    #[test]
    fn test_comment_lands_on_every_toplevel() {
        let mut store = store();
        let comment = add_dataset_comment(&mut store, "/z/p", ID, &ctx(), "looks fine").unwrap();
        assert_eq!(comment, "1600000000:dm:looks fine");

        let details = dataset_details(&store, "/z/p", ID).unwrap();
        assert_eq!(details.comments, vec![comment]);
        assert_eq!(details.objects.len(), 2);
        assert_eq!(details.scanned.as_deref(), Some("dm:1"));
    }

    #[test]
    fn test_unrecognized_listing() {
        let store = store();
        let found = list_unrecognized_unscanned(&store, "/z/p").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/z/p/notes.txt");
        assert!(!found[0].scanned);
    }

    #[test]
    fn test_details_of_unknown_dataset() {
        let store = store();
        assert!(matches!(
            dataset_details(&store, "/z/p", "nope"),
            Err(IntakeError::DatasetNotFound(_))
        ));
    }
}

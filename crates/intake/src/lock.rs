//! Vault lock and freeze flags
//!
//! Locking is advisory: scans and checks leave locked or frozen nodes alone,
//! nothing in the store enforces it. Frozen implies locked.

use crate::datasets;
use crate::error::{IntakeError, Result};
use crate::store::{
    Attribute, MetadataStore, NodeInfo, PathScope, RemoveOutcome, StoreError, StoreResult,
};
use crate::types::{self, attr, ScanContext};
use serde::Serialize;
use tracing::info;

/// Lock state of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    pub locked: bool,
    pub frozen: bool,
}

impl LockStatus {
    fn from_attributes(attributes: &[Attribute]) -> Self {
        let mut status = LockStatus::default();
        for a in attributes {
            if a.name == attr::TO_VAULT_FREEZE {
                status.locked = true;
                status.frozen = true;
            } else if a.name == attr::TO_VAULT_LOCK {
                status.locked = true;
            }
        }
        status
    }

    fn merge(self, other: LockStatus) -> Self {
        LockStatus {
            locked: self.locked || other.locked,
            frozen: self.frozen || other.frozen,
        }
    }

    /// Scans and checks skip the node
    pub fn is_held(&self) -> bool {
        self.locked || self.frozen
    }
}

/// Lock state of a node, inherited from every ancestor up to the catalog root.
///
/// Ancestors above the imported tree may be absent from the catalog; they
/// count as unlocked.
pub fn lock_status<S: MetadataStore + ?Sized>(store: &S, node: &NodeInfo) -> StoreResult<LockStatus> {
    let mut status = LockStatus::from_attributes(&store.get_attributes(&node.path)?);
    let mut current = types::parent(&node.path);
    while let Some(path) = current {
        if status.frozen {
            break;
        }
        match store.get_attributes(path) {
            Ok(attributes) => status = status.merge(LockStatus::from_attributes(&attributes)),
            Err(StoreError::NodeNotFound(_)) => {}
            Err(err) => return Err(err),
        }
        current = types::parent(path);
    }
    Ok(status)
}

/// Lock state of the node at `path`
pub fn object_lock_status<S: MetadataStore + ?Sized>(store: &S, path: &str) -> StoreResult<LockStatus> {
    lock_status(store, &store.node(path)?)
}

/// Lock state of a whole dataset: held if any boundary node is held
pub fn dataset_lock_status<S: MetadataStore + ?Sized>(
    store: &S,
    toplevels: &[NodeInfo],
) -> StoreResult<LockStatus> {
    let mut status = LockStatus::default();
    for tl in toplevels {
        status = status.merge(lock_status(store, tl)?);
    }
    Ok(status)
}

/// Every node under `root` tagged with `dataset_id`
fn dataset_members<S: MetadataStore + ?Sized>(
    store: &S,
    root: &str,
    dataset_id: &str,
) -> Result<Vec<String>> {
    let mut paths: Vec<String> = store
        .query_by_attribute(PathScope::Subtree(root), attr::DATASET_ID, Some(dataset_id))?
        .into_iter()
        .map(|row| row.path)
        .collect();
    paths.sort();
    paths.dedup();
    if paths.is_empty() {
        return Err(IntakeError::DatasetNotFound(dataset_id.to_string()));
    }
    Ok(paths)
}

fn current_status<S: MetadataStore + ?Sized>(
    store: &S,
    root: &str,
    dataset_id: &str,
) -> Result<LockStatus> {
    let toplevels = datasets::toplevels(store, root, dataset_id)?;
    Ok(dataset_lock_status(store, &toplevels)?)
}

fn remove_everywhere<S: MetadataStore + ?Sized>(
    store: &mut S,
    paths: &[String],
    name: &str,
) -> Result<usize> {
    let mut touched = 0;
    for path in paths {
        if let RemoveOutcome::Removed(_) = store.remove_attribute_wildcard(path, name, "%")? {
            touched += 1;
        }
    }
    Ok(touched)
}

/// Mark a dataset ready for the vault. Returns the number of nodes locked.
pub fn lock_dataset<S: MetadataStore + ?Sized>(
    store: &mut S,
    root: &str,
    dataset_id: &str,
    ctx: &ScanContext,
) -> Result<usize> {
    if current_status(store, root, dataset_id)?.frozen {
        return Err(IntakeError::Frozen {
            dataset_id: dataset_id.to_string(),
            action: "lock",
        });
    }
    let members = dataset_members(store, root, dataset_id)?;
    let stamp = ctx.now.timestamp().to_string();
    for path in &members {
        store.set_attribute(path, attr::TO_VAULT_LOCK, &stamp)?;
    }
    info!("Locked dataset {:?} ({} nodes) by {}", dataset_id, members.len(), ctx.actor);
    Ok(members.len())
}

/// Remove the lock again. Frozen datasets stay locked.
pub fn unlock_dataset<S: MetadataStore + ?Sized>(
    store: &mut S,
    root: &str,
    dataset_id: &str,
) -> Result<usize> {
    if current_status(store, root, dataset_id)?.frozen {
        return Err(IntakeError::Frozen {
            dataset_id: dataset_id.to_string(),
            action: "unlock",
        });
    }
    let members = dataset_members(store, root, dataset_id)?;
    let touched = remove_everywhere(store, &members, attr::TO_VAULT_LOCK)?;
    info!("Unlocked dataset {:?} ({} nodes)", dataset_id, touched);
    Ok(touched)
}

/// Freeze a locked dataset for archival
pub fn freeze_dataset<S: MetadataStore + ?Sized>(
    store: &mut S,
    root: &str,
    dataset_id: &str,
    ctx: &ScanContext,
) -> Result<usize> {
    if !current_status(store, root, dataset_id)?.locked {
        return Err(IntakeError::NotLocked(dataset_id.to_string()));
    }
    let members = dataset_members(store, root, dataset_id)?;
    let stamp = ctx.now.timestamp().to_string();
    for path in &members {
        store.set_attribute(path, attr::TO_VAULT_FREEZE, &stamp)?;
    }
    info!("Froze dataset {:?} ({} nodes) by {}", dataset_id, members.len(), ctx.actor);
    Ok(members.len())
}

/// Undo a freeze; the dataset stays locked
pub fn melt_dataset<S: MetadataStore + ?Sized>(
    store: &mut S,
    root: &str,
    dataset_id: &str,
) -> Result<usize> {
    let members = dataset_members(store, root, dataset_id)?;
    let touched = remove_everywhere(store, &members, attr::TO_VAULT_FREEZE)?;
    info!("Melted dataset {:?} ({} nodes)", dataset_id, touched);
    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    const ID: &str = "10w\techo\tB12345\tRaw\t/z/p/ds";

    fn ctx() -> ScanContext {
        ScanContext::new("dm", Utc.timestamp_opt(1_600_000_000, 0).unwrap())
    }

    fn tagged_store() -> MemoryStore {
        let t = ctx().now;
        let mut store = MemoryStore::new();
        store.put_data_object("/z/p/ds/a.dcm", 1, None, t).unwrap();
        store.put_data_object("/z/p/other.txt", 1, None, t).unwrap();
        store.set_attribute("/z/p/ds", attr::DATASET_ID, ID).unwrap();
        store.set_attribute("/z/p/ds", attr::DATASET_TOPLEVEL, ID).unwrap();
        store.set_attribute("/z/p/ds/a.dcm", attr::DATASET_ID, ID).unwrap();
        store
    }

    #[test]
    fn test_object_inherits_collection_lock() {
        let mut store = tagged_store();
        store.set_attribute("/z/p/ds", attr::TO_VAULT_FREEZE, "1").unwrap();
        let object = store.node("/z/p/ds/a.dcm").unwrap();
        let status = lock_status(&store, &object).unwrap();
        assert!(status.locked && status.frozen);

        assert!(!object_lock_status(&store, "/z/p/other.txt").unwrap().is_held());
        assert!(object_lock_status(&store, "/z/p/ds").unwrap().frozen);
    }

    #[test]
    fn test_lock_reaches_nested_nodes() {
        let mut store = tagged_store();
        store.put_data_object("/z/p/ds/late/deep/b.dcm", 1, None, ctx().now).unwrap();
        store.set_attribute("/z/p/ds", attr::TO_VAULT_LOCK, "1").unwrap();

        let status = object_lock_status(&store, "/z/p/ds/late").unwrap();
        assert!(status.locked && !status.frozen);
        assert!(object_lock_status(&store, "/z/p/ds/late/deep/b.dcm").unwrap().locked);
        assert!(!object_lock_status(&store, "/z/p").unwrap().is_held());
    }

    #[test]
    fn test_lock_lifecycle() {
        let mut store = tagged_store();
        assert!(matches!(
            freeze_dataset(&mut store, "/z/p", ID, &ctx()),
            Err(IntakeError::NotLocked(_))
        ));

        assert_eq!(lock_dataset(&mut store, "/z/p", ID, &ctx()).unwrap(), 2);
        assert_eq!(freeze_dataset(&mut store, "/z/p", ID, &ctx()).unwrap(), 2);
        assert!(matches!(
            unlock_dataset(&mut store, "/z/p", ID),
            Err(IntakeError::Frozen { action: "unlock", .. })
        ));

        assert_eq!(melt_dataset(&mut store, "/z/p", ID).unwrap(), 2);
        assert_eq!(unlock_dataset(&mut store, "/z/p", ID).unwrap(), 2);
        assert!(!store.has_attribute("/z/p/ds", attr::TO_VAULT_LOCK).unwrap());
    }

    #[test]
    fn test_unknown_dataset() {
        let mut store = tagged_store();
        assert!(matches!(
            lock_dataset(&mut store, "/z/p", "nope", &ctx()),
            Err(IntakeError::DatasetNotFound(_))
        ));
    }
}

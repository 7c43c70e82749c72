//! In-memory catalog persisted as a JSON file

use super::{
    like_match, Attribute, AttributeRow, Children, MetadataStore, NodeInfo, PathScope,
    RemoveOutcome, StoreError, StoreResult,
};
use crate::types::{self, NodeKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Node {
    kind: NodeKind,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    checksum: Option<String>,
    created: DateTime<Utc>,
    #[serde(default)]
    attributes: Vec<Attribute>,
}

/// Namespace and attributes held in an ordered map keyed by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    nodes: BTreeMap<String, Node>,
}

fn child_prefix(coll: &str) -> String {
    if coll.ends_with('/') {
        coll.to_string()
    } else {
        format!("{coll}/")
    }
}

fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog file; a missing file yields an empty store
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            debug!("Catalog {} does not exist yet, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    /// Write the catalog via a temp file and rename
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(self)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, payload)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(normalize(path))
    }

    /// Create a collection and any missing ancestors
    pub fn create_collection(&mut self, path: &str, created: DateTime<Utc>) -> StoreResult<()> {
        let path = normalize(path);
        if let Some(existing) = self.nodes.get(path) {
            return match existing.kind {
                NodeKind::Collection => Ok(()),
                NodeKind::DataObject => Err(StoreError::NotACollection(path.to_string())),
            };
        }
        if let Some(parent) = types::parent(path) {
            self.create_collection(parent, created)?;
        }
        self.nodes.insert(
            path.to_string(),
            Node {
                kind: NodeKind::Collection,
                size: 0,
                checksum: None,
                created,
                attributes: Vec::new(),
            },
        );
        Ok(())
    }

    /// Create or update a data object, creating missing parent collections.
    ///
    /// Attributes of an existing object are kept.
    pub fn put_data_object(
        &mut self,
        path: &str,
        size: u64,
        checksum: Option<String>,
        created: DateTime<Utc>,
    ) -> StoreResult<()> {
        let path = normalize(path);
        if let Some(parent) = types::parent(path) {
            self.create_collection(parent, created)?;
        }
        match self.nodes.get_mut(path) {
            Some(node) if node.kind == NodeKind::Collection => {
                Err(StoreError::NotACollection(format!("{path} is a collection, not a data object")))
            }
            Some(node) => {
                node.size = size;
                node.checksum = checksum;
                node.created = created;
                Ok(())
            }
            None => {
                self.nodes.insert(
                    path.to_string(),
                    Node {
                        kind: NodeKind::DataObject,
                        size,
                        checksum,
                        created,
                        attributes: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Remove a node and everything beneath it; returns the number removed
    pub fn remove_subtree(&mut self, path: &str) -> usize {
        let path = normalize(path);
        let doomed: Vec<String> = self.paths_within(path).map(str::to_string).collect();
        for key in &doomed {
            self.nodes.remove(key);
        }
        doomed.len()
    }

    /// Paths at or beneath `path`, in order
    pub fn paths_within<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let path = normalize(path);
        let prefix = child_prefix(path);
        let itself = self.nodes.get_key_value(path).map(|(k, _)| k.as_str());
        let below = self
            .nodes
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.as_str());
        itself.into_iter().chain(below)
    }

    fn get(&self, path: &str) -> StoreResult<&Node> {
        self.nodes
            .get(normalize(path))
            .ok_or_else(|| StoreError::NodeNotFound(path.to_string()))
    }

    fn get_mut(&mut self, path: &str) -> StoreResult<&mut Node> {
        self.nodes
            .get_mut(normalize(path))
            .ok_or_else(|| StoreError::NodeNotFound(path.to_string()))
    }

    fn info(path: &str, node: &Node) -> NodeInfo {
        NodeInfo {
            path: path.to_string(),
            kind: node.kind,
            size: node.size,
            checksum: node.checksum.clone(),
            created: node.created,
        }
    }
}

impl MetadataStore for MemoryStore {
    fn node(&self, path: &str) -> StoreResult<NodeInfo> {
        let node = self.get(path)?;
        Ok(Self::info(normalize(path), node))
    }

    fn children(&self, coll: &str) -> StoreResult<Children> {
        let coll = normalize(coll);
        if !self.get(coll)?.kind.is_collection() {
            return Err(StoreError::NotACollection(coll.to_string()));
        }
        let prefix = child_prefix(coll);
        let mut children = Children::default();
        for (path, node) in self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
        {
            if path[prefix.len()..].contains('/') {
                continue;
            }
            let info = Self::info(path, node);
            match node.kind {
                NodeKind::Collection => children.collections.push(info),
                NodeKind::DataObject => children.data_objects.push(info),
            }
        }
        Ok(children)
    }

    fn subtree_objects(&self, path: &str) -> StoreResult<Vec<NodeInfo>> {
        self.get(path)?;
        Ok(self
            .paths_within(path)
            .filter_map(|p| {
                let node = &self.nodes[p];
                (node.kind == NodeKind::DataObject).then(|| Self::info(p, node))
            })
            .collect())
    }

    fn get_attributes(&self, path: &str) -> StoreResult<Vec<Attribute>> {
        Ok(self.get(path)?.attributes.clone())
    }

    fn set_attribute(&mut self, path: &str, name: &str, value: &str) -> StoreResult<()> {
        let node = self.get_mut(path)?;
        node.attributes.retain(|a| a.name != name);
        node.attributes.push(Attribute::new(name, value));
        Ok(())
    }

    fn add_attribute(&mut self, path: &str, name: &str, value: &str) -> StoreResult<()> {
        let node = self.get_mut(path)?;
        if !node
            .attributes
            .iter()
            .any(|a| a.name == name && a.value == value)
        {
            node.attributes.push(Attribute::new(name, value));
        }
        Ok(())
    }

    fn remove_attribute_wildcard(
        &mut self,
        path: &str,
        name: &str,
        value_pattern: &str,
    ) -> StoreResult<RemoveOutcome> {
        let node = self.get_mut(path)?;
        let before = node.attributes.len();
        node.attributes
            .retain(|a| !(a.name == name && like_match(value_pattern, &a.value)));
        let removed = before - node.attributes.len();
        Ok(if removed == 0 {
            RemoveOutcome::NotFound
        } else {
            RemoveOutcome::Removed(removed)
        })
    }

    fn query_by_attribute(
        &self,
        scope: PathScope<'_>,
        name: &str,
        value: Option<&str>,
    ) -> StoreResult<Vec<AttributeRow>> {
        let paths: Vec<&str> = match scope {
            PathScope::Exact(path) => self
                .nodes
                .get_key_value(normalize(path))
                .map(|(k, _)| vec![k.as_str()])
                .unwrap_or_default(),
            PathScope::Subtree(path) => self.paths_within(path).collect(),
        };

        let mut rows = Vec::new();
        for path in paths {
            let node = &self.nodes[path];
            for a in &node.attributes {
                if a.name == name && value.map_or(true, |v| v == a.value) {
                    rows.push(AttributeRow {
                        path: path.to_string(),
                        kind: node.kind,
                        name: a.name.clone(),
                        value: a.value.clone(),
                    });
                }
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 0).unwrap()
    }

    fn sample() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_collection("/z/home/p/ds1/sub", t0()).unwrap();
        store.put_data_object("/z/home/p/a.txt", 3, None, t0()).unwrap();
        store.put_data_object("/z/home/p/ds1/b.dcm", 5, Some("sha2:ff".into()), t0()).unwrap();
        store.put_data_object("/z/home/p/ds1/sub/c.dcm", 7, None, t0()).unwrap();
        store.put_data_object("/z/home/p2/d.txt", 1, None, t0()).unwrap();
        store
    }

    #[test]
    fn test_ancestors_are_created() {
        let store = sample();
        assert!(store.contains("/z"));
        assert!(store.contains("/z/home"));
        assert!(store.node("/z/home/p/ds1").unwrap().is_collection());
    }

    #[test]
    fn test_children_are_direct_only() {
        let store = sample();
        let children = store.children("/z/home/p").unwrap();
        let objects: Vec<&str> = children.data_objects.iter().map(|n| n.path.as_str()).collect();
        let colls: Vec<&str> = children.collections.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(objects, vec!["/z/home/p/a.txt"]);
        assert_eq!(colls, vec!["/z/home/p/ds1"]);
    }

    #[test]
    fn test_subtree_does_not_leak_into_sibling_prefix() {
        let store = sample();
        let objects = store.subtree_objects("/z/home/p").unwrap();
        assert_eq!(objects.len(), 3);
        assert!(objects.iter().all(|o| !o.path.starts_with("/z/home/p2")));
    }

    #[test]
    fn test_set_overwrites_and_add_accumulates() {
        let mut store = sample();
        let path = "/z/home/p/ds1";
        store.set_attribute(path, "wave", "10w").unwrap();
        store.set_attribute(path, "wave", "20w").unwrap();
        assert_eq!(store.attribute_values(path, "wave").unwrap(), vec!["20w"]);

        store.add_attribute(path, "comment", "one").unwrap();
        store.add_attribute(path, "comment", "two").unwrap();
        store.add_attribute(path, "comment", "two").unwrap();
        assert_eq!(store.attribute_values(path, "comment").unwrap().len(), 2);
    }

    #[test]
    fn test_wildcard_removal_reports_not_found() {
        let mut store = sample();
        let path = "/z/home/p/a.txt";
        assert_eq!(
            store.remove_attribute_wildcard(path, "error", "%").unwrap(),
            RemoveOutcome::NotFound
        );
        store.add_attribute(path, "error", "x").unwrap();
        store.add_attribute(path, "error", "y").unwrap();
        assert_eq!(
            store.remove_attribute_wildcard(path, "error", "%").unwrap(),
            RemoveOutcome::Removed(2)
        );
        assert!(matches!(
            store.remove_attribute_wildcard("/nope", "error", "%"),
            Err(StoreError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_query_exact_and_subtree() {
        let mut store = sample();
        store.set_attribute("/z/home/p", "dataset_id", "x").unwrap();
        store.set_attribute("/z/home/p/ds1/b.dcm", "dataset_id", "x").unwrap();
        store.set_attribute("/z/home/p2/d.txt", "dataset_id", "x").unwrap();

        let exact = store
            .query_by_attribute(PathScope::Exact("/z/home/p"), "dataset_id", None)
            .unwrap();
        assert_eq!(exact.len(), 1);

        let subtree = store
            .query_by_attribute(PathScope::Subtree("/z/home/p"), "dataset_id", Some("x"))
            .unwrap();
        assert_eq!(subtree.len(), 2);
    }

    #[test]
    fn test_remove_subtree_and_catalog_roundtrip() {
        let mut store = sample();
        store.set_attribute("/z/home/p/a.txt", "wave", "10w").unwrap();
        assert_eq!(store.remove_subtree("/z/home/p/ds1"), 4);

        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("catalog.json");
        store.save(&file).unwrap();
        let loaded = MemoryStore::load(&file).unwrap();
        assert_eq!(loaded, store);
    }
}

//! Attribute store over a hierarchical namespace
//!
//! The intake engine reads and writes exclusively through [`MetadataStore`].
//! [`MemoryStore`] is the catalog-file backed implementation used by the CLI
//! and the tests.

pub mod import;
pub mod memory;

pub use import::{import_directory, ImportStats};
pub use memory::MemoryStore;

use crate::types::NodeKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Not a collection: {0}")]
    NotACollection(String),

    #[error("Catalog IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog is corrupt: {0}")]
    Corrupt(String),
}

/// Store result type
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One name/value attribute. Names may repeat on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// System metadata of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub path: String,
    pub kind: NodeKind,
    /// Size in bytes (0 for collections)
    pub size: u64,
    /// Checksum as `<type>:<value>` or bare value (md5)
    pub checksum: Option<String>,
    pub created: DateTime<Utc>,
}

impl NodeInfo {
    pub fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }
}

/// Direct children of a collection, each list ordered by path
#[derive(Debug, Clone, Default)]
pub struct Children {
    pub data_objects: Vec<NodeInfo>,
    pub collections: Vec<NodeInfo>,
}

/// Which paths an attribute query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathScope<'a> {
    /// Only the node at this path
    Exact(&'a str),
    /// The node at this path and everything beneath it
    Subtree(&'a str),
}

/// A row returned by [`MetadataStore::query_by_attribute`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributeRow {
    pub path: String,
    pub kind: NodeKind,
    pub name: String,
    pub value: String,
}

/// Outcome of a wildcard removal; "nothing matched" is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(usize),
    NotFound,
}

/// Key/value attribute storage keyed by path
pub trait MetadataStore {
    /// System metadata of the node at `path`
    fn node(&self, path: &str) -> StoreResult<NodeInfo>;

    /// Direct data objects and subcollections of a collection
    fn children(&self, coll: &str) -> StoreResult<Children>;

    /// All data objects at or beneath `path`, ordered by path
    fn subtree_objects(&self, path: &str) -> StoreResult<Vec<NodeInfo>>;

    /// All attributes of a node, in insertion order
    fn get_attributes(&self, path: &str) -> StoreResult<Vec<Attribute>>;

    /// Replace every value of `name` with `value`
    fn set_attribute(&mut self, path: &str, name: &str, value: &str) -> StoreResult<()>;

    /// Add a value for `name`, keeping existing ones (exact duplicates collapse)
    fn add_attribute(&mut self, path: &str, name: &str, value: &str) -> StoreResult<()>;

    /// Remove values of `name` matching `value_pattern` (`%` any run, `_` one char)
    fn remove_attribute_wildcard(
        &mut self,
        path: &str,
        name: &str,
        value_pattern: &str,
    ) -> StoreResult<RemoveOutcome>;

    /// Attribute rows named `name` (and equal to `value`, if given) within `scope`
    fn query_by_attribute(
        &self,
        scope: PathScope<'_>,
        name: &str,
        value: Option<&str>,
    ) -> StoreResult<Vec<AttributeRow>>;

    /// First value of `name` on a node
    fn attribute(&self, path: &str, name: &str) -> StoreResult<Option<String>> {
        Ok(self
            .get_attributes(path)?
            .into_iter()
            .find(|a| a.name == name)
            .map(|a| a.value))
    }

    /// All values of `name` on a node
    fn attribute_values(&self, path: &str, name: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .get_attributes(path)?
            .into_iter()
            .filter(|a| a.name == name)
            .map(|a| a.value)
            .collect())
    }

    /// Whether a node carries `name` at all
    fn has_attribute(&self, path: &str, name: &str) -> StoreResult<bool> {
        Ok(self.get_attributes(path)?.iter().any(|a| a.name == name))
    }
}

/// SQL-`LIKE` style match: `%` matches any run, `_` exactly one character.
pub fn like_match(pattern: &str, value: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let v: Vec<char> = value.chars().collect();
    let (mut pi, mut vi) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while vi < v.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == v[vi]) {
            pi += 1;
            vi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, vi));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            vi = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}

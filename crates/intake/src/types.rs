//! Core types shared by the scan and check passes
//!
//! Logical paths are `/`-separated strings rooted at the zone, e.g.
//! `/tempZone/home/grp-intake-youth/ds1/file.dcm`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribute names written and read by the intake engine.
pub mod attr {
    pub const WAVE: &str = "wave";
    pub const EXPERIMENT_TYPE: &str = "experiment_type";
    pub const PSEUDOCODE: &str = "pseudocode";
    pub const VERSION: &str = "version";
    pub const DIRECTORY: &str = "directory";
    pub const DATASET_ID: &str = "dataset_id";
    pub const DATASET_TOPLEVEL: &str = "dataset_toplevel";
    pub const ERROR: &str = "error";
    pub const WARNING: &str = "warning";
    pub const DATASET_ERROR: &str = "dataset_error";
    pub const DATASET_WARNING: &str = "dataset_warning";
    pub const UNRECOGNIZED: &str = "unrecognized";
    pub const SCANNED: &str = "scanned";
    pub const OBJECT_COUNT: &str = "object_count";
    pub const OBJECT_ERRORS: &str = "object_errors";
    pub const OBJECT_WARNINGS: &str = "object_warnings";
    pub const COMMENT: &str = "comment";
    pub const TO_VAULT_LOCK: &str = "to_vault_lock";
    pub const TO_VAULT_FREEZE: &str = "to_vault_freeze";
}

/// Attributes cleared from every unlocked node before it is re-tagged.
///
/// `scanned` is overwritten rather than cleared; comments and lock
/// attributes outlive rescans.
pub const INTAKE_ATTRIBUTES: &[&str] = &[
    attr::WAVE,
    attr::EXPERIMENT_TYPE,
    attr::PSEUDOCODE,
    attr::VERSION,
    attr::DIRECTORY,
    attr::DATASET_ID,
    attr::DATASET_TOPLEVEL,
    attr::ERROR,
    attr::WARNING,
    attr::DATASET_ERROR,
    attr::DATASET_WARNING,
    attr::UNRECOGNIZED,
    attr::OBJECT_COUNT,
    attr::OBJECT_ERRORS,
    attr::OBJECT_WARNINGS,
];

/// Reason recorded on objects outside any dataset.
pub const UNRECOGNIZED_REASON: &str = "Experiment type, wave or pseudocode missing from path";

/// Kind of node in the namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Collection,
    DataObject,
}

impl NodeKind {
    pub fn is_collection(&self) -> bool {
        matches!(self, NodeKind::Collection)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Collection => "collection",
            NodeKind::DataObject => "data_object",
        }
    }
}

/// Who runs a scan and at what instant.
///
/// Passed explicitly so identical inputs produce identical attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContext {
    pub actor: String,
    pub now: DateTime<Utc>,
}

impl ScanContext {
    pub fn new(actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            now,
        }
    }

    /// Context for the current user at the current time
    pub fn current() -> Self {
        let actor = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self::new(actor, Utc::now())
    }

    /// `<actor>:<unix seconds>`, the value of the `scanned` attribute
    pub fn scanned_stamp(&self) -> String {
        format!("{}:{}", self.actor, self.now.timestamp())
    }
}

/// Split a path into `(parent, name)`.
///
/// `/a/b/c` yields `("/a/b", "c")`; a top-level `/a` yields `("/", "a")`.
pub fn chop(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    }
}

/// Last path segment
pub fn basename(path: &str) -> &str {
    chop(path).1
}

/// Parent collection of a path, `None` at the root
pub fn parent(path: &str) -> Option<&str> {
    match chop(path) {
        (_, "") | ("", _) => None,
        (parent, _) => Some(parent),
    }
}

/// Join a collection path and a child name
pub fn join(coll: &str, name: &str) -> String {
    if coll.ends_with('/') {
        format!("{coll}{name}")
    } else {
        format!("{coll}/{name}")
    }
}

/// Whether `path` equals `root` or lies beneath it
pub fn is_within(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path.starts_with('/');
    }
    path == root || (path.starts_with(root) && path[root.len()..].starts_with('/'))
}

/// `path` relative to `base`, keeping the leading `/` (`/ds/x` under `/p`)
pub fn relative_to<'a>(path: &'a str, base: &str) -> &'a str {
    let base = base.trim_end_matches('/');
    if is_within(path, base) {
        &path[base.len()..]
    } else {
        path
    }
}

/// Strip a trailing extension from a data-object name.
///
/// Names without a dot, or whose only dot is leading, are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_chop_splits_parent_and_name() {
        assert_eq!(chop("/zone/home/ds1"), ("/zone/home", "ds1"));
        assert_eq!(chop("/zone"), ("/", "zone"));
        assert_eq!(chop("/zone/home/"), ("/zone", "home"));
        assert_eq!(basename("/zone/home/ds1/I0000001.dcm"), "I0000001.dcm");
        assert_eq!(parent("/zone/home"), Some("/zone"));
        assert_eq!(parent("/"), None);
    }

    #[test]
    fn test_within_respects_segment_boundaries() {
        assert!(is_within("/z/home/p", "/z/home/p"));
        assert!(is_within("/z/home/p/ds1/a", "/z/home/p"));
        assert!(!is_within("/z/home/p2/a", "/z/home/p"));
        assert_eq!(relative_to("/z/home/p/ds1/a", "/z/home/p"), "/ds1/a");
    }

    #[test]
    fn test_strip_extension_only_trailing() {
        assert_eq!(strip_extension("B12345_10w.dcm"), "B12345_10w");
        assert_eq!(strip_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(strip_extension("README"), "README");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn test_scanned_stamp_uses_context_clock() {
        let ctx = ScanContext::new("datamanager", Utc.timestamp_opt(1_600_000_000, 0).unwrap());
        assert_eq!(ctx.scanned_stamp(), "datamanager:1600000000");
    }
}

//! Dataset identity: WEPV plus directory, tab-joined

use crate::error::{IntakeError, Result};
use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: char = '\t';
const FIELDS: usize = 5;

/// Identity shared by every node of one dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetId {
    pub wave: String,
    pub experiment_type: String,
    pub pseudocode: String,
    pub version: String,
    pub directory: String,
}

impl DatasetId {
    /// Build from a dataset-complete scope; `version` falls back to
    /// `default_version`. Returns `None` for an incomplete scope.
    pub fn from_scope(scope: &Scope, default_version: &str) -> Option<Self> {
        Some(Self {
            wave: scope.wave.clone()?,
            experiment_type: scope.experiment_type.clone()?,
            pseudocode: scope.pseudocode.clone()?,
            version: scope
                .version
                .clone()
                .unwrap_or_else(|| default_version.to_string()),
            directory: scope.dataset_directory.clone().unwrap_or_default(),
        })
    }

    /// Serialised form stored in `dataset_id` / `dataset_toplevel`
    pub fn encode(&self) -> String {
        [
            self.wave.as_str(),
            self.experiment_type.as_str(),
            self.pseudocode.as_str(),
            self.version.as_str(),
            self.directory.as_str(),
        ]
        .join("\t")
    }

    /// Parse a serialised id. Anything but five fields is rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let fields: Vec<&str> = value.splitn(FIELDS, SEPARATOR).collect();
        if fields.len() != FIELDS {
            return Err(IntakeError::MalformedDatasetId {
                id: value.to_string(),
                fields: fields.len(),
            });
        }
        Ok(Self {
            wave: fields[0].to_string(),
            experiment_type: fields[1].to_string(),
            pseudocode: fields[2].to_string(),
            version: fields[3].to_string(),
            directory: fields[4].to_string(),
        })
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl std::str::FromStr for DatasetId {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

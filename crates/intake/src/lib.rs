//! Dataset intake engine
//!
//! Scans a catalog of collections and data objects, recognises datasets from
//! the wave, experiment type, pseudocode and version tokens in path names,
//! tags every node of a dataset with its identity, then checks and
//! aggregates each dataset.
//!
//! ```text
//! Intake::scan
//!   ├─ PathWalker        classify + tag (Classifier, Scope, MetadataApplier)
//!   ├─ DatasetChecker    accepted waves, file-count rules
//!   └─ AggregationEngine object/error/warning counts per boundary
//! ```

pub mod aggregate;
pub mod apply;
pub mod checker;
pub mod checksums;
pub mod config;
pub mod dataset_id;
pub mod datasets;
pub mod error;
pub mod lock;
pub mod report;
pub mod scan;
pub mod scope;
pub mod store;
pub mod token;
pub mod types;
pub mod walker;

pub use aggregate::{AggregationEngine, ObjectCounts};
pub use apply::MetadataApplier;
pub use checker::{CheckStats, DatasetChecker, Findings};
pub use checksums::{chop_checksum, generate_dataset_checksums};
pub use config::{ExperimentRule, FileCountRule, IntakeConfig};
pub use dataset_id::DatasetId;
pub use datasets::{
    add_dataset_comment, dataset_details, list_datasets, list_unrecognized_unscanned,
    DatasetDetails, DatasetSummary, UnrecognizedObject,
};
pub use error::{IntakeError, Result};
pub use lock::{freeze_dataset, lock_dataset, melt_dataset, object_lock_status, unlock_dataset, LockStatus};
pub use report::{aggregated_info, dataset_counts, export_study_data, AggregatedInfo, DatasetExport};
pub use scan::{Intake, ScanSummary};
pub use scope::Scope;
pub use store::{import_directory, MemoryStore, MetadataStore, PathScope, RemoveOutcome};
pub use token::{Classifier, Token, TokenKind};
pub use types::{NodeKind, ScanContext};
pub use walker::{PathWalker, WalkStats};

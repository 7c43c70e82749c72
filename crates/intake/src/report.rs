//! Read-only reports over tagged datasets

use crate::dataset_id::DatasetId;
use crate::datasets;
use crate::error::Result;
use crate::store::{MetadataStore, NodeInfo};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Window counted as growth in [`aggregated_info`]
pub const GROWTH_WINDOW_DAYS: i64 = 30;

/// `experiment_type -> wave -> version -> dataset count`
pub type DatasetCounts = BTreeMap<String, BTreeMap<String, BTreeMap<String, usize>>>;

/// One dataset with its resolved identity and file totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetExport {
    pub wave: String,
    pub experiment_type: String,
    pub pseudocode: String,
    pub version: String,
    pub directory: String,
    pub files: usize,
    pub size: u64,
    /// Earliest creation time among the boundary nodes
    #[serde(skip)]
    created: Option<DateTime<Utc>>,
    #[serde(skip)]
    objects: Vec<NodeInfo>,
}

/// Totals for one version class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionTotals {
    pub datasets: usize,
    pub files: usize,
    pub size: u64,
    pub datasets_growth: usize,
    pub size_growth: u64,
    pub pseudocodes: usize,
}

/// Raw, processed and overall totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedInfo {
    pub raw: VersionTotals,
    pub processed: VersionTotals,
    pub total: VersionTotals,
}

fn is_raw(version: &str) -> bool {
    version.eq_ignore_ascii_case("raw")
}

/// Dataset counts per experiment type, wave and version (type and version
/// lower-cased), one count per dataset id.
pub fn dataset_counts<S: MetadataStore + ?Sized>(store: &S, root: &str) -> Result<DatasetCounts> {
    let mut counts = DatasetCounts::new();
    for summary in datasets::list_datasets(store, root)? {
        *counts
            .entry(summary.experiment_type.to_lowercase())
            .or_default()
            .entry(summary.wave)
            .or_default()
            .entry(summary.version.to_lowercase())
            .or_default() += 1;
    }
    Ok(counts)
}

/// Every dataset under `root` with its file count and size, ordered by id
pub fn export_study_data<S: MetadataStore + ?Sized>(store: &S, root: &str) -> Result<Vec<DatasetExport>> {
    let ids: BTreeSet<String> = datasets::list_datasets(store, root)?
        .into_iter()
        .map(|s| s.id)
        .collect();

    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        let dataset = DatasetId::parse(&id)?;
        let objects = datasets::dataset_objects(store, root, &id)?;
        let created = datasets::toplevels(store, root, &id)?
            .iter()
            .map(|tl| tl.created)
            .min();
        rows.push(DatasetExport {
            wave: dataset.wave,
            experiment_type: dataset.experiment_type,
            pseudocode: dataset.pseudocode,
            version: dataset.version,
            directory: dataset.directory,
            files: objects.len(),
            size: objects.iter().map(|o| o.size).sum(),
            created,
            objects,
        });
    }
    Ok(rows)
}

/// Totals split by `raw` versus any other version, with growth over the
/// last [`GROWTH_WINDOW_DAYS`] days before `now`.
pub fn aggregated_info<S: MetadataStore + ?Sized>(
    store: &S,
    root: &str,
    now: DateTime<Utc>,
) -> Result<AggregatedInfo> {
    let since = now - Duration::days(GROWTH_WINDOW_DAYS);
    let mut info = AggregatedInfo::default();
    let mut pseudocodes: [BTreeSet<String>; 3] = Default::default();

    for row in export_study_data(store, root)? {
        let recent = row.created.map_or(false, |c| c >= since);
        let size_growth: u64 = row
            .objects
            .iter()
            .filter(|o| o.created >= since)
            .map(|o| o.size)
            .sum();

        let (class, slot) = if is_raw(&row.version) {
            (&mut info.raw, 0)
        } else {
            (&mut info.processed, 1)
        };
        for (totals, idx) in [(class, slot), (&mut info.total, 2)] {
            totals.datasets += 1;
            totals.files += row.files;
            totals.size += row.size;
            totals.size_growth += size_growth;
            if recent {
                totals.datasets_growth += 1;
            }
            pseudocodes[idx].insert(row.pseudocode.clone());
        }
    }

    info.raw.pseudocodes = pseudocodes[0].len();
    info.processed.pseudocodes = pseudocodes[1].len();
    info.total.pseudocodes = pseudocodes[2].len();
    Ok(info)
}

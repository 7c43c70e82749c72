//! Checksum manifest and read-only reports

use crate::cli::error::explain;
use crate::cli::output::{format_size, print_json, print_table};
use crate::cli::Session;
use anyhow::{Context, Result};
use chrono::Utc;
use intake::{aggregated_info, dataset_counts, export_study_data, generate_dataset_checksums};
use std::path::Path;

/// Which report to print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Counts,
    Aggregated,
    Export,
}

pub fn run_checksums(session: &Session, dataset_path: &str, output: Option<&Path>) -> Result<()> {
    let manifest =
        generate_dataset_checksums(&session.store, dataset_path).map_err(|e| explain(e, dataset_path))?;
    match output {
        Some(path) => {
            std::fs::write(path, &manifest)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} checksums to {}", manifest.lines().count(), path.display());
        }
        None => print!("{}", manifest),
    }
    Ok(())
}

pub fn run_report(session: &Session, kind: ReportKind, root: &str, json: bool) -> Result<()> {
    let store = &session.store;
    match kind {
        ReportKind::Counts => {
            let counts = dataset_counts(store, root).map_err(|e| explain(e, root))?;
            if json {
                return print_json(&counts);
            }
            let mut rows = Vec::new();
            for (experiment_type, waves) in &counts {
                for (wave, versions) in waves {
                    for (version, count) in versions {
                        rows.push(vec![
                            experiment_type.clone(),
                            wave.clone(),
                            version.clone(),
                            count.to_string(),
                        ]);
                    }
                }
            }
            print_table(&["Type", "Wave", "Version", "Datasets"], rows);
        }
        ReportKind::Aggregated => {
            let info = aggregated_info(store, root, Utc::now()).map_err(|e| explain(e, root))?;
            if json {
                return print_json(&info);
            }
            let rows = [("Raw", &info.raw), ("Processed", &info.processed), ("Total", &info.total)]
                .into_iter()
                .map(|(label, t)| {
                    vec![
                        label.to_string(),
                        t.datasets.to_string(),
                        t.files.to_string(),
                        format_size(t.size),
                        t.datasets_growth.to_string(),
                        format_size(t.size_growth),
                        t.pseudocodes.to_string(),
                    ]
                })
                .collect();
            print_table(
                &["", "Datasets", "Files", "Size", "New datasets (30d)", "Growth (30d)", "Pseudocodes"],
                rows,
            );
        }
        ReportKind::Export => {
            let rows = export_study_data(store, root).map_err(|e| explain(e, root))?;
            if json {
                return print_json(&rows);
            }
            let table = rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.wave,
                        r.experiment_type,
                        r.pseudocode,
                        r.version,
                        r.directory,
                        r.files.to_string(),
                        format_size(r.size),
                    ]
                })
                .collect();
            print_table(
                &["Wave", "Type", "Pseudocode", "Version", "Directory", "Files", "Size"],
                table,
            );
        }
    }
    Ok(())
}

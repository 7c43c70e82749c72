//! `import` and `scan` commands

use crate::cli::error::{explain, HelpfulError};
use crate::cli::output::{format_size, print_json, print_table};
use crate::cli::Session;
use anyhow::{Context, Result};
use intake::{import_directory, Intake, ScanContext};
use std::path::PathBuf;

#[derive(Debug)]
pub struct ImportArgs {
    pub dir: PathBuf,
    pub logical_root: String,
}

#[derive(Debug)]
pub struct ScanArgs {
    pub root: String,
    pub json: bool,
}

pub fn run_import(session: &mut Session, args: ImportArgs) -> Result<()> {
    if !args.dir.is_dir() {
        return Err(HelpfulError::path_not_found(&args.dir).into());
    }
    let stats = import_directory(&mut session.store, &args.dir, &args.logical_root)
        .with_context(|| format!("Failed to import {}", args.dir.display()))?;
    session.save()?;

    println!(
        "Imported {} collections, {} data objects ({}) into {}",
        stats.collections,
        stats.data_objects,
        format_size(stats.bytes),
        args.logical_root
    );
    if stats.pruned > 0 {
        println!("Removed {} catalog entries no longer on disk", stats.pruned);
    }
    Ok(())
}

pub fn run_scan(session: &mut Session, args: ScanArgs) -> Result<()> {
    let intake = Intake::new(session.config.clone())
        .map_err(|e| HelpfulError::invalid_config(&session.config_path, &e.to_string()))?;
    let ctx = ScanContext::current();
    let summary = intake
        .scan(&mut session.store, &args.root, &ctx)
        .map_err(|e| explain(e, &args.root))?;
    session.save()?;

    if args.json {
        return print_json(&summary);
    }

    if summary.root_locked {
        println!("{} is locked; nothing was scanned", summary.root);
        return Ok(());
    }

    let walk = &summary.walk;
    let checks = &summary.checks;
    print_table(
        &["Scanned", "Count"],
        vec![
            vec!["Data objects".into(), walk.data_objects.to_string()],
            vec!["Collections".into(), walk.collections.to_string()],
            vec!["Dataset boundaries".into(), walk.boundaries.to_string()],
            vec!["Unrecognized".into(), walk.unrecognized.to_string()],
            vec!["Invalid names".into(), walk.invalid_names.to_string()],
            vec!["Skipped (locked)".into(), walk.skipped_locked.to_string()],
            vec!["Datasets checked".into(), checks.datasets.to_string()],
            vec!["Dataset errors".into(), checks.errors.to_string()],
            vec!["Dataset warnings".into(), checks.warnings.to_string()],
        ],
    );
    Ok(())
}

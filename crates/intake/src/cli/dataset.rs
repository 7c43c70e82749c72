//! Dataset browsing, comments and the vault lock commands

use crate::cli::error::explain;
use crate::cli::output::{display_id, flag, parse_id_arg, print_json, print_table};
use crate::cli::Session;
use anyhow::Result;
use intake::{
    add_dataset_comment, dataset_details, freeze_dataset, list_datasets,
    list_unrecognized_unscanned, lock_dataset, melt_dataset, unlock_dataset, ScanContext,
};

/// Lock transitions exposed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Lock,
    Unlock,
    Freeze,
    Melt,
}

impl LockAction {
    fn past_tense(&self) -> &'static str {
        match self {
            LockAction::Lock => "Locked",
            LockAction::Unlock => "Unlocked",
            LockAction::Freeze => "Froze",
            LockAction::Melt => "Melted",
        }
    }
}

pub fn run_datasets(session: &Session, root: &str, json: bool) -> Result<()> {
    let datasets = list_datasets(&session.store, root).map_err(|e| explain(e, root))?;
    if json {
        return print_json(&datasets);
    }
    if datasets.is_empty() {
        println!("No datasets under {}", root);
        return Ok(());
    }

    let rows = datasets
        .iter()
        .map(|d| {
            vec![
                d.wave.clone(),
                d.experiment_type.clone(),
                d.pseudocode.clone(),
                d.version.clone(),
                d.directory.clone(),
                d.object_count.to_string(),
                d.object_errors.to_string(),
                d.object_warnings.to_string(),
                d.dataset_errors.to_string(),
                d.dataset_warnings.to_string(),
                flag(d.lock.locked),
                flag(d.lock.frozen),
            ]
        })
        .collect();
    print_table(
        &[
            "Wave", "Type", "Pseudocode", "Version", "Directory", "Files", "File errors",
            "File warnings", "Errors", "Warnings", "Locked", "Frozen",
        ],
        rows,
    );
    Ok(())
}

pub fn run_unrecognized(session: &Session, root: &str, json: bool) -> Result<()> {
    let found = list_unrecognized_unscanned(&session.store, root).map_err(|e| explain(e, root))?;
    if json {
        return print_json(&found);
    }
    if found.is_empty() {
        println!("Every file under {} is scanned and recognized", root);
        return Ok(());
    }
    let rows = found
        .into_iter()
        .map(|o| {
            vec![
                o.path,
                flag(o.scanned),
                o.unrecognized.unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["Path", "Scanned", "Reason"], rows);
    Ok(())
}

pub fn run_details(session: &Session, root: &str, id_arg: &str, json: bool) -> Result<()> {
    let id = parse_id_arg(id_arg);
    let details = dataset_details(&session.store, root, &id).map_err(|e| explain(e, root))?;
    if json {
        return print_json(&details);
    }

    let s = &details.summary;
    println!("Dataset    {}", display_id(&s.id));
    println!("Directory  {}", s.directory);
    println!(
        "Files      {} ({} with errors, {} with warnings)",
        s.object_count, s.object_errors, s.object_warnings
    );
    println!("Locked     {}", if s.lock.locked { "yes" } else { "no" });
    println!("Frozen     {}", if s.lock.frozen { "yes" } else { "no" });
    if let Some(scanned) = &details.scanned {
        println!("Scanned    {}", scanned);
    }
    for (title, lines) in [
        ("Errors", &details.errors),
        ("Warnings", &details.warnings),
        ("Comments", &details.comments),
        ("Files", &details.objects),
    ] {
        if lines.is_empty() {
            continue;
        }
        println!();
        println!("{}:", title);
        for line in lines {
            println!("  {}", line);
        }
    }
    Ok(())
}

pub fn run_comment(session: &mut Session, root: &str, id_arg: &str, text: &str) -> Result<()> {
    let id = parse_id_arg(id_arg);
    let ctx = ScanContext::current();
    let comment = add_dataset_comment(&mut session.store, root, &id, &ctx, text)
        .map_err(|e| explain(e, root))?;
    session.save()?;
    println!("Added comment {}", comment);
    Ok(())
}

pub fn run_lock(session: &mut Session, action: LockAction, root: &str, id_arg: &str) -> Result<()> {
    let id = parse_id_arg(id_arg);
    let ctx = ScanContext::current();
    let store = &mut session.store;
    let touched = match action {
        LockAction::Lock => lock_dataset(store, root, &id, &ctx),
        LockAction::Unlock => unlock_dataset(store, root, &id),
        LockAction::Freeze => freeze_dataset(store, root, &id, &ctx),
        LockAction::Melt => melt_dataset(store, root, &id),
    }
    .map_err(|e| explain(e, root))?;
    session.save()?;
    println!("{} {} ({} nodes)", action.past_tense(), display_id(&id), touched);
    Ok(())
}

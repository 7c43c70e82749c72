//! `intake`: import, scan and curate research datasets from the command line

use anyhow::Result;
use clap::{Parser, Subcommand};
use intake_logging::{init_logging, LogConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

mod cli;

use cli::dataset::LockAction;
use cli::report::ReportKind;
use cli::Session;

#[derive(Parser, Debug)]
#[command(name = "intake", version, about = "Dataset intake scanner")]
struct Cli {
    /// Catalog file (defaults to the catalog_path of the config)
    #[arg(long, global = true, env = "INTAKE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Config file (defaults to $INTAKE_HOME/config.toml)
    #[arg(long, global = true, env = "INTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug output on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror a local directory into the catalog
    Import {
        /// Local directory to import
        dir: PathBuf,
        /// Logical catalog path it is mirrored to (e.g. /zone/home/grp-intake-study)
        logical_root: String,
    },

    /// Classify and tag everything under a collection, then check and count datasets
    Scan {
        root: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List datasets under a collection
    Datasets {
        root: String,
        #[arg(long)]
        json: bool,
    },

    /// List files that are unrecognized or were never scanned
    Unrecognized {
        root: String,
        #[arg(long)]
        json: bool,
    },

    /// Show errors, warnings, comments and files of a dataset
    Details {
        root: String,
        /// Dataset id; '\t' may stand in for a tab
        dataset_id: String,
        #[arg(long)]
        json: bool,
    },

    /// Add a comment to a dataset
    Comment {
        root: String,
        dataset_id: String,
        text: String,
    },

    /// Lock a dataset for the vault
    Lock { root: String, dataset_id: String },

    /// Remove the vault lock
    Unlock { root: String, dataset_id: String },

    /// Freeze a locked dataset
    Freeze { root: String, dataset_id: String },

    /// Undo a freeze, keeping the lock
    Melt { root: String, dataset_id: String },

    /// Checksum manifest of a dataset
    Checksums {
        dataset_path: String,
        /// Write the manifest to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read-only dataset reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ReportAction {
    /// Datasets per experiment type, wave and version
    Counts {
        root: String,
        #[arg(long)]
        json: bool,
    },
    /// Raw/processed totals with 30-day growth
    Aggregated {
        root: String,
        #[arg(long)]
        json: bool,
    },
    /// Every dataset with file count and size
    Export {
        root: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn command_wants_json(cmd: &Commands) -> bool {
    match cmd {
        Commands::Scan { json, .. }
        | Commands::Datasets { json, .. }
        | Commands::Unrecognized { json, .. }
        | Commands::Details { json, .. } => *json,
        Commands::Report { action } => match action {
            ReportAction::Counts { json, .. }
            | ReportAction::Aggregated { json, .. }
            | ReportAction::Export { json, .. } => *json,
        },
        _ => false,
    }
}

fn run_config(action: &ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => cli::config::run_show(path),
        ConfigAction::Init { force } => cli::config::run_init(path, *force),
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(intake::config::default_config_path);

    // config commands must work even when the config file is broken
    if let Commands::Config { action } = &cli.command {
        return run_config(action, &config_path);
    }

    let mut session = Session::open(cli.catalog.as_deref(), Some(&config_path))?;
    debug!("Using catalog {}", session.catalog_path.display());

    match cli.command {
        Commands::Import { dir, logical_root } => cli::scan::run_import(
            &mut session,
            cli::scan::ImportArgs { dir, logical_root },
        ),
        Commands::Scan { root, json } => {
            cli::scan::run_scan(&mut session, cli::scan::ScanArgs { root, json })
        }
        Commands::Datasets { root, json } => cli::dataset::run_datasets(&session, &root, json),
        Commands::Unrecognized { root, json } => {
            cli::dataset::run_unrecognized(&session, &root, json)
        }
        Commands::Details {
            root,
            dataset_id,
            json,
        } => cli::dataset::run_details(&session, &root, &dataset_id, json),
        Commands::Comment {
            root,
            dataset_id,
            text,
        } => cli::dataset::run_comment(&mut session, &root, &dataset_id, &text),
        Commands::Lock { root, dataset_id } => {
            cli::dataset::run_lock(&mut session, LockAction::Lock, &root, &dataset_id)
        }
        Commands::Unlock { root, dataset_id } => {
            cli::dataset::run_lock(&mut session, LockAction::Unlock, &root, &dataset_id)
        }
        Commands::Freeze { root, dataset_id } => {
            cli::dataset::run_lock(&mut session, LockAction::Freeze, &root, &dataset_id)
        }
        Commands::Melt { root, dataset_id } => {
            cli::dataset::run_lock(&mut session, LockAction::Melt, &root, &dataset_id)
        }
        Commands::Checksums {
            dataset_path,
            output,
        } => cli::report::run_checksums(&session, &dataset_path, output.as_deref()),
        Commands::Report { action } => {
            let (kind, root, json) = match action {
                ReportAction::Counts { root, json } => (ReportKind::Counts, root, json),
                ReportAction::Aggregated { root, json } => (ReportKind::Aggregated, root, json),
                ReportAction::Export { root, json } => (ReportKind::Export, root, json),
            };
            cli::report::run_report(&session, kind, &root, json)
        }
        Commands::Config { action } => run_config(&action, &config_path),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(err) = init_logging(LogConfig {
        app_name: "intake",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: logging to file is disabled: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}

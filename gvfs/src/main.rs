//! # GVFS
//!
//! Command-line entry point over the core GVFS subsystems: ref repair and placeholder
//! catalog inspection. The mount supervisor and volume watcher are composed by a
//! host process against platform-specific collaborators (the projection driver, the
//! repo registry, the notification surface) that live outside this crate; this binary
//! exercises the parts of the core library that don't require them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gvfs_core::catalog::PlaceholderCatalog;
use gvfs_core::refs::RefRepairEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gvfs")]
#[command(about = "Git Virtual File System maintenance tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diagnose, and optionally repair, malformed Git refs in an enlistment.
    Repair {
        /// Directory containing `.git`.
        enlistment_root: PathBuf,

        /// Attempt repair if the diagnosis is fixable. Without this flag, only
        /// diagnoses and reports.
        #[arg(long)]
        fix: bool,
    },

    /// Inspect a placeholder catalog database.
    Catalog {
        /// Path to the catalog's SQLite file.
        db_path: PathBuf,

        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogAction {
    /// Print the total row count.
    Count,
    /// List every file path currently tracked.
    ListFiles,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gvfs=info,gvfs_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Repair { enlistment_root, fix } => run_repair(&enlistment_root, fix),
        Command::Catalog { db_path, action } => run_catalog(&db_path, action),
    }
}

fn run_repair(enlistment_root: &PathBuf, fix: bool) -> Result<()> {
    let engine = RefRepairEngine::with_default_families(enlistment_root);
    let mut messages = Vec::new();

    let issue = engine
        .has_issue(&mut messages)
        .context("failed to scan refs")?;
    for message in &messages {
        tracing::info!("{message}");
    }

    match issue {
        gvfs_core::refs::RefIssue::NoIssue => {
            println!("no ref issues found");
        }
        gvfs_core::refs::RefIssue::CantFix => {
            println!("ref issues found, repair is blocked");
        }
        gvfs_core::refs::RefIssue::Fixable if fix => {
            let mut fix_messages = Vec::new();
            let outcome = engine
                .try_fix(&mut fix_messages)
                .context("failed to repair refs")?;
            for message in &fix_messages {
                tracing::info!("{message}");
            }
            match outcome {
                gvfs_core::refs::RepairOutcome::Success => println!("refs repaired"),
                gvfs_core::refs::RepairOutcome::Failure { failed_count } => {
                    println!("{failed_count} refs could not be repaired");
                }
            }
        }
        gvfs_core::refs::RefIssue::Fixable => {
            println!("ref issues found, fixable; pass --fix to repair");
        }
    }

    Ok(())
}

fn run_catalog(db_path: &PathBuf, action: CatalogAction) -> Result<()> {
    let catalog = PlaceholderCatalog::open(db_path).context("failed to open catalog")?;
    match action {
        CatalogAction::Count => {
            println!("{}", catalog.count()?);
        }
        CatalogAction::ListFiles => {
            let mut paths: Vec<_> = catalog.get_all_file_paths()?.into_iter().collect();
            paths.sort();
            for path in paths {
                println!("{path}");
            }
        }
    }
    Ok(())
}

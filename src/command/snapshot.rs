use std::path::PathBuf;

use clap::{Args, Subcommand};
use miette::Diagnostic;
use thiserror::Error;

use crate::executor::ExecutionReport;
use crate::paths::{PathsError, RootPaths};
use crate::registry::{self, RegistryError, ScanMode};
use crate::snapshot::{self, SnapshotError};
use crate::vcs::VcsEnv;

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
    /// Write current project revisions to a manifest file
    Create(CreateArgs),

    /// Reconcile the workspace against a snapshot file
    Checkout(CheckoutArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Destination file, or a label to manage under the snapshot root
    target: String,

    /// Treat `target` as a label rather than a literal file path
    #[arg(long, default_value_t = false)]
    label: bool,
}

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    file: PathBuf,

    #[arg(long, default_value_t = false)]
    gc: bool,
}

#[derive(Debug, Error, Diagnostic)]
#[diagnostic(code(jirust::command::snapshot))]
pub enum SnapshotCommandError {
    #[error(transparent)]
    Paths(#[from] PathsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub fn run_create(args: CreateArgs) -> Result<PathBuf, SnapshotCommandError> {
    let paths = RootPaths::from_env()?;
    let env = VcsEnv::from_process_env();
    let local = registry::local_projects(&paths, ScanMode::Full)?;

    if args.label {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let file = snapshot::create_labeled_snapshot(
            &paths.default_snapshot_root(),
            &args.target,
            &timestamp,
            &local,
            &env,
            &paths,
        )?;
        Ok(file)
    } else {
        let file = PathBuf::from(&args.target);
        snapshot::create_snapshot(&local, &env, &paths, &file)?;
        Ok(file)
    }
}

pub fn run_checkout(args: CheckoutArgs) -> Result<ExecutionReport, SnapshotCommandError> {
    let paths = RootPaths::from_env()?;
    let env = VcsEnv::from_process_env();
    let local = registry::local_projects(&paths, ScanMode::Full)?;
    let report = snapshot::checkout_snapshot(&args.file, &local, env, &paths, args.gc)?;
    Ok(report)
}

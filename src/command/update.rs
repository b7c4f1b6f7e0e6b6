use clap::Args;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, info_span};

use crate::executor::{ExecutionReport, Executor};
use crate::manifest_store::{self, ManifestError};
use crate::paths::{PathsError, RootPaths};
use crate::plan::{self, PlanError};
use crate::registry::{self, RegistryError, ScanMode};
use crate::snapshot::{self, SnapshotError};
use crate::vcs::VcsEnv;

/// Bring the local workspace into agreement with the manifest (§4.4, §4.5).
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Manifest name to resolve (defaults to the root's primary manifest)
    #[arg(long)]
    manifest: Option<String>,

    /// Remove obsolete project trees instead of leaving them in place
    #[arg(long, default_value_t = false)]
    gc: bool,

    /// Use a fast directory scan instead of validating on-disk paths
    #[arg(long, default_value_t = false)]
    fast_scan: bool,
}

#[derive(Debug, Error, Diagnostic)]
#[diagnostic(code(jirust::command::update))]
pub enum UpdateError {
    #[error(transparent)]
    Paths(#[from] PathsError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("plan rejected: {0:?}")]
    Plan(Vec<PlanError>),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

pub fn run_update(args: UpdateArgs) -> Result<ExecutionReport, UpdateError> {
    let paths = RootPaths::from_env()?;
    let env = VcsEnv::from_process_env();

    let universe = match &args.manifest {
        Some(name) => manifest_store::read(name, &paths)?,
        None => manifest_store::read_path(
            &paths.primary_manifest_file(),
            "primary manifest",
            &paths,
        )?,
    };

    let scan_mode = if args.fast_scan { ScanMode::Fast } else { ScanMode::Full };
    let local = registry::local_projects(&paths, scan_mode)?;

    let ops = {
        let _span = info_span!("plan").entered();
        let ops = plan::plan(&local, &universe.projects);
        let preflight_errors = plan::preflight(&ops);
        if !preflight_errors.is_empty() {
            return Err(UpdateError::Plan(preflight_errors));
        }
        ops
    };

    info!(count = ops.len(), "executing plan");
    let executor = Executor::new(&paths, env.clone(), args.gc);
    let report = executor.execute(&ops);

    let local_after = registry::local_projects(&paths, scan_mode)?;
    let timestamp = timestamp_placeholder();
    let history_file = paths.update_history_dir().join(&timestamp);
    std::fs::create_dir_all(paths.update_history_dir()).ok();
    snapshot::create_snapshot(&local_after, &env, &paths, &history_file)?;
    let _ = std::fs::remove_file(paths.update_history_latest_link());
    #[cfg(unix)]
    let _ = std::os::unix::fs::symlink(&history_file, paths.update_history_latest_link());

    Ok(report)
}

/// Date/time formatting for `update_history` entry names (§4.8, §6
/// "RFC3339 timestamp"). The engine never calls `chrono::Utc::now()`
/// directly outside this seam so callers needing reproducible tests can
/// substitute a fixed clock.
fn timestamp_placeholder() -> String {
    chrono::Utc::now().to_rfc3339()
}

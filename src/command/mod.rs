//! CLI surface. Dispatch and argument parsing are explicitly out of scope
//! for the core engine; these modules stay thin, delegating all behavior
//! to the library components in `crate::{manifest_store,registry,plan,
//! executor,snapshot,cl}`.

pub mod cl;
pub mod import;
pub mod project;
pub mod snapshot;
pub mod update;

use clap::Subcommand;

use self::cl::ClCommand;
use self::import::ImportArgs;
use self::project::ProjectCommand;
use self::snapshot::SnapshotCommand;
use self::update::UpdateArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the local workspace into agreement with the manifest
    Update(UpdateArgs),

    /// Capture or restore a point-in-time manifest snapshot
    #[command(subcommand)]
    Snapshot(SnapshotCommand),

    /// Manage review (CL) branches
    #[command(subcommand)]
    Cl(ClCommand),

    /// Inspect locally materialized projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Load a manifest and print the resolved project/tool universe
    Import(ImportArgs),
}

use clap::Args;
use miette::Diagnostic;
use thiserror::Error;

use crate::manifest_store::{self, ManifestError, Universe};
use crate::paths::{PathsError, RootPaths};

/// Load a manifest and print the resolved project/tool universe. A
/// diagnostic aid for inspecting import and merge ordering, not a new
/// core behavior.
#[derive(Args, Debug)]
pub struct ImportArgs {
    name: String,
}

#[derive(Debug, Error, Diagnostic)]
#[diagnostic(code(jirust::command::import))]
pub enum ImportCommandError {
    #[error(transparent)]
    Paths(#[from] PathsError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

pub fn run_import(args: ImportArgs) -> Result<Universe, ImportCommandError> {
    let paths = RootPaths::from_env()?;
    let universe = manifest_store::read(&args.name, &paths)?;
    Ok(universe)
}

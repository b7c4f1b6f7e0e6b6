use clap::Subcommand;
use miette::Diagnostic;
use thiserror::Error;

use crate::paths::{PathsError, RootPaths};
use crate::project::Project;
use crate::registry::{self, RegistryError, ScanMode};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List locally materialized projects
    List,
}

#[derive(Debug, Error, Diagnostic)]
#[diagnostic(code(jirust::command::project))]
pub enum ProjectCommandError {
    #[error(transparent)]
    Paths(#[from] PathsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub fn run_list() -> Result<Vec<Project>, ProjectCommandError> {
    let paths = RootPaths::from_env()?;
    let projects = registry::local_projects(&paths, ScanMode::Full)?;
    Ok(projects.into_values().collect())
}

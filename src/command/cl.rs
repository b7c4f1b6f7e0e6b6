use clap::{Args, Subcommand};
use miette::Diagnostic;
use thiserror::Error;

use crate::cl::{self, ClError, MailConfig, PresubmitMode};
use crate::paths::{PathsError, RootPaths};
use crate::registry::{self, RegistryError};
use crate::vcs::{GitRepo, VcsEnv};

#[derive(Subcommand, Debug)]
pub enum ClCommand {
    /// Start a new review branch from the current branch
    New(NewArgs),

    /// Sync the current branch's dependency chain
    Sync,

    /// Squash and push the current branch for review
    Mail(MailArgs),

    /// Delete merged review branches and their metadata
    Cleanup(CleanupArgs),
}

#[derive(Args, Debug)]
pub struct NewArgs {
    name: String,
}

#[derive(Args, Debug)]
pub struct MailArgs {
    #[arg(long, default_value_t = false)]
    autosubmit: bool,

    #[arg(long)]
    cc: Vec<String>,

    #[arg(long, default_value_t = false)]
    draft: bool,

    #[arg(long, default_value_t = false)]
    presubmit_none: bool,

    #[arg(long, default_value = "origin")]
    remote: String,

    #[arg(long, default_value = "master")]
    remote_branch: String,

    #[arg(long = "reviewer")]
    reviewers: Vec<String>,

    #[arg(long)]
    topic: Option<String>,

    #[arg(long, default_value_t = false)]
    verify: bool,

    #[arg(long, default_value_t = true)]
    check_uncommitted: bool,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    branches: Vec<String>,

    #[arg(long, default_value = "origin")]
    remote: String,

    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Debug, Error, Diagnostic)]
#[diagnostic(code(jirust::command::cl))]
pub enum ClCommandError {
    #[error(transparent)]
    Paths(#[from] PathsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("command must be run from inside a registered project")]
    NotInProject,

    #[error(transparent)]
    Cl(#[from] ClError),
}

fn current_repo(paths: &RootPaths, env: &VcsEnv) -> Result<(GitRepo, String), ClCommandError> {
    let cwd = std::env::current_dir().map_err(|_| ClCommandError::NotInProject)?;
    let project = registry::current_project(&cwd, paths)?.ok_or(ClCommandError::NotInProject)?;
    let repo = GitRepo::open(project.path.clone(), env.clone());
    Ok((repo, project.remote_branch))
}

pub fn run_new(args: NewArgs) -> Result<(), ClCommandError> {
    let paths = RootPaths::from_env()?;
    let env = VcsEnv::from_process_env();
    let (repo, tracking_branch) = current_repo(&paths, &env)?;
    cl::new_branch(&repo, repo.dir(), &args.name, &tracking_branch)?;
    Ok(())
}

pub fn run_sync() -> Result<(), ClCommandError> {
    let paths = RootPaths::from_env()?;
    let env = VcsEnv::from_process_env();
    let (repo, _tracking_branch) = current_repo(&paths, &env)?;
    let branch = repo.current_branch().map_err(ClError::from)?;
    cl::sync(&repo, repo.dir(), &branch)?;
    Ok(())
}

pub fn run_mail(args: MailArgs) -> Result<(), ClCommandError> {
    let paths = RootPaths::from_env()?;
    let env = VcsEnv::from_process_env();
    let (repo, tracking_branch) = current_repo(&paths, &env)?;

    let config = MailConfig {
        autosubmit: args.autosubmit,
        ccs: args.cc,
        draft: args.draft,
        presubmit: if args.presubmit_none { PresubmitMode::None } else { PresubmitMode::All },
        remote: args.remote,
        remote_branch: args.remote_branch,
        reviewers: args.reviewers,
        set_topic: args.topic.is_some(),
        topic: args.topic,
        verify: args.verify,
        check_uncommitted: args.check_uncommitted,
    };

    cl::mail(&repo, repo.dir(), &tracking_branch, &config)?;
    Ok(())
}

pub fn run_cleanup(args: CleanupArgs) -> Result<(), ClCommandError> {
    let paths = RootPaths::from_env()?;
    let env = VcsEnv::from_process_env();
    let (repo, tracking_branch) = current_repo(&paths, &env)?;
    cl::cleanup(&repo, repo.dir(), &tracking_branch, &args.remote, &args.branches, args.force)?;
    Ok(())
}

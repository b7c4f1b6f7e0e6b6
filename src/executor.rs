//! The Executor (C5, §4.5): applies a planned operation sequence, one
//! all-or-nothing transaction per operation, collecting failures rather
//! than aborting the run.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::metadata::{self, MetadataError};
use crate::paths::RootPaths;
use crate::plan::Operation;
use crate::project::Project;
use crate::vcs::{CloneOptions, GitRepo, ResetMode, VcsEnv, VcsError};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("io error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct OpOutcome {
    pub op_kind: &'static str,
    pub project_name: String,
    pub result: Result<(), ExecutorError>,
}

/// Collects per-op outcomes (§7: "Executor returns a composite error
/// enumerating per-op failures").
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<OpOutcome>,
}

impl ExecutionReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.result.is_err())
    }

    pub fn failures(&self) -> impl Iterator<Item = &OpOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Runs a caller-provided action on the project's tracking branch without
/// disturbing whatever branch the user currently has checked out (§4.5
/// "Local-master applier"). Records current branch, auto-stashes dirty
/// state, checks out the tracking branch, always restores branch and pops
/// the stash on the way out, even on failure.
pub fn with_local_master<T>(
    repo: &GitRepo,
    tracking_branch: &str,
    action: impl FnOnce(&GitRepo) -> Result<T, VcsError>,
) -> Result<T, VcsError> {
    let original_branch = repo.current_branch()?;
    let stashed = repo.stash()?;

    let restore = |repo: &GitRepo| {
        if repo.checkout(&original_branch, Default::default()).is_err() {
            warn!(branch = %original_branch, "failed to restore original branch");
        }
        if stashed {
            if let Err(err) = repo.stash_pop() {
                warn!(%err, "failed to pop stash after local-master action");
            }
        }
    };

    if original_branch != tracking_branch {
        if let Err(err) = repo.checkout(tracking_branch, Default::default()) {
            restore(repo);
            return Err(err);
        }
    }

    let result = action(repo);
    restore(repo);
    result
}

pub struct Executor<'a> {
    pub paths: &'a RootPaths,
    pub env: VcsEnv,
    pub gc: bool,
}

impl<'a> Executor<'a> {
    pub fn new(paths: &'a RootPaths, env: VcsEnv, gc: bool) -> Self {
        Self { paths, env, gc }
    }

    pub fn execute(&self, ops: &[Operation]) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        for op in ops {
            let kind = match op {
                Operation::Delete(_) => "delete",
                Operation::Move(_, _) => "move",
                Operation::Create(_) => "create",
                Operation::Update(_, _) => "update",
            };
            let name = op.name().to_string();
            let span = info_span!("execute_op", kind, project = %name);
            let _enter = span.enter();
            info!("executing operation");

            let result = match op {
                Operation::Create(target) => self.execute_create(target),
                Operation::Move(local, desired) => self.execute_move(local, desired),
                Operation::Update(local, desired) => self.execute_update(local, desired),
                Operation::Delete(local) => self.execute_delete(local),
            };

            if let Err(err) = &result {
                warn!(%err, "operation failed");
            }

            report.outcomes.push(OpOutcome {
                op_kind: kind,
                project_name: name,
                result,
            });
        }
        report
    }

    fn execute_create(&self, target: &Project) -> Result<(), ExecutorError> {
        if let Some(parent) = target.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ExecutorError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_dir = sibling_temp_dir(&target.path);
        let clone_result = (|| -> Result<(), ExecutorError> {
            let repo = GitRepo::clone_into(
                &target.remote,
                &tmp_dir,
                CloneOptions::default(),
                self.env.clone(),
            )?;

            if crate::vcs::hooks::remote_is_review_host(&target.remote) {
                repo.install_commit_msg_hook()?;
                repo.install_pre_push_hook()?;
            }

            repo.reset(&target.revision, ResetMode::Hard)?;
            metadata::write_project_metadata(&tmp_dir, target, self.paths)?;
            Ok(())
        })();

        match clone_result {
            Ok(()) => {
                fs::rename(&tmp_dir, &target.path).map_err(|source| ExecutorError::Io {
                    path: target.path.clone(),
                    source,
                })?;
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_dir_all(&tmp_dir);
                Err(err)
            }
        }
    }

    fn execute_move(&self, local: &Project, desired: &Project) -> Result<(), ExecutorError> {
        if let Some(parent) = desired.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ExecutorError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::rename(&local.path, &desired.path).map_err(|source| ExecutorError::Io {
            path: desired.path.clone(),
            source,
        })?;

        let repo = GitRepo::open(desired.path.clone(), self.env.clone());
        emit_non_master_advisory(&repo, &desired.remote_branch);
        let _ = with_local_master(&repo, &desired.remote_branch, |repo| {
            repo.pull("origin", &desired.remote_branch)
        });

        metadata::write_project_metadata(&desired.path, desired, self.paths)?;
        Ok(())
    }

    fn execute_update(&self, local: &Project, desired: &Project) -> Result<(), ExecutorError> {
        let repo = GitRepo::open(desired.path.clone(), self.env.clone());
        emit_non_master_advisory(&repo, &desired.remote_branch);

        if local.remote != desired.remote {
            repo.set_remote_url("origin", &desired.remote)?;
        }

        // §3 data model: "revision | revision to reset to on update" —
        // pull brings objects up to date, reset pins the working tree to
        // the manifest's declared revision even when it trails the
        // remote branch's tip.
        let _ = with_local_master(&repo, &desired.remote_branch, |repo| {
            repo.pull("origin", &desired.remote_branch)?;
            repo.reset(&desired.revision, ResetMode::Hard)
        });

        metadata::write_project_metadata(&desired.path, desired, self.paths)?;
        Ok(())
    }

    fn execute_delete(&self, local: &Project) -> Result<(), ExecutorError> {
        if self.gc {
            fs::remove_dir_all(&local.path).map_err(|source| ExecutorError::Io {
                path: local.path.clone(),
                source,
            })?;
        } else {
            info!(
                path = %local.path.display(),
                "orphaned project left in place; remove with `rm -rf {}`",
                local.path.display()
            );
        }
        Ok(())
    }
}

fn emit_non_master_advisory(repo: &GitRepo, tracking_branch: &str) {
    if let Ok(current) = repo.current_branch() {
        if current != tracking_branch {
            warn!(
                branch = %current,
                tracking_branch,
                "project is not on its tracking branch"
            );
        }
    }
}

fn sibling_temp_dir(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{file_name}.jirust-tmp"))
}

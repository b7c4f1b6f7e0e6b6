//! The Review (CL) Pipeline (C7, §4.7): feature-branch ancestry tracking,
//! chain sync, squash-and-push to a review ref with a stable Change-Id,
//! and cleanup of merged branches.

pub mod changeid;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::paths::PROJECT_META_DIR;
use crate::retry::{self, RetryConfig};
use crate::vcs::{
    CheckoutOptions, CommitOptions, CreateBranchOptions, DeleteBranchOptions, GitRepo,
    MergeOptions, PushOptions, VcsError,
};
use changeid::Labels;

#[derive(Debug, Error)]
pub enum ClError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("branch name must not be empty")]
    EmptyBranchName,

    #[error("branch name must differ from the tracking branch {0:?}")]
    NameMatchesTrackingBranch(String),

    #[error("no commits to send: branch has not diverged from its tracking base")]
    EmptyChange,

    #[error("squash commit has no Change-Id line; is the commit-msg hook installed?")]
    NoChangeId,

    #[error("merge conflict syncing {ancestor:?} into {descendant:?}; resolve manually: cd {project_dir} && git status")]
    MergeConflict {
        ancestor: String,
        descendant: String,
        project_dir: String,
    },

    #[error("branch {0:?} has not been merged upstream; pass force to delete anyway")]
    UnmergedBranch(String),

    #[error("io error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn dependency_file(project_dir: &Path, branch: &str) -> PathBuf {
    project_dir.join(PROJECT_META_DIR).join(branch).join("dependencies")
}

fn message_file(project_dir: &Path, branch: &str) -> PathBuf {
    project_dir.join(PROJECT_META_DIR).join(branch).join("message")
}

fn read_dependency_chain(project_dir: &Path, branch: &str) -> Result<Vec<String>, ClError> {
    let path = dependency_file(project_dir, branch);
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(contents.lines().map(str::to_string).collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(ClError::Io { path, source }),
    }
}

fn write_dependency_chain(
    project_dir: &Path,
    branch: &str,
    chain: &[String],
) -> Result<(), ClError> {
    let path = dependency_file(project_dir, branch);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ClError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, chain.join("\n") + "\n").map_err(|source| ClError::Io { path, source })
}

fn write_message_file(project_dir: &Path, branch: &str, message: &str) -> Result<(), ClError> {
    let path = message_file(project_dir, branch);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ClError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, message).map_err(|source| ClError::Io { path, source })
}

fn read_message_file(project_dir: &Path, branch: &str) -> Option<String> {
    fs::read_to_string(message_file(project_dir, branch)).ok()
}

/// `new(name)` (§4.7): record the current branch's dependency chain plus
/// itself under `name`, then create-and-checkout `name` from the current
/// branch.
pub fn new_branch(repo: &GitRepo, project_dir: &Path, name: &str, tracking_branch: &str) -> Result<(), ClError> {
    if name.is_empty() {
        return Err(ClError::EmptyBranchName);
    }
    if name == tracking_branch {
        return Err(ClError::NameMatchesTrackingBranch(tracking_branch.to_string()));
    }

    let current = repo.current_branch()?;
    let mut chain = read_dependency_chain(project_dir, &current)?;
    chain.push(current);
    write_dependency_chain(project_dir, name, &chain)?;

    repo.create_branch(
        name,
        CreateBranchOptions {
            checkout: true,
            upstream: None,
        },
    )?;
    Ok(())
}

/// `sync()` (§4.7): walk the dependency chain in order, checking out each
/// descendant and merging its immediate ancestor into it (non-squash).
pub fn sync(repo: &GitRepo, project_dir: &Path, branch: &str) -> Result<(), ClError> {
    let chain = read_dependency_chain(project_dir, branch)?;
    let mut full_chain = chain;
    full_chain.push(branch.to_string());

    for pair in full_chain.windows(2) {
        let (ancestor, descendant) = (&pair[0], &pair[1]);
        repo.checkout(descendant, CheckoutOptions::default())?;
        if let Err(_err) = repo.merge(
            ancestor,
            MergeOptions {
                squash: false,
                strategy: None,
                reset_on_failure: false,
            },
        ) {
            return Err(ClError::MergeConflict {
                ancestor: ancestor.clone(),
                descendant: descendant.clone(),
                project_dir: project_dir.display().to_string(),
            });
        }
    }
    Ok(())
}

/// Presubmit label selection for `mail()` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresubmitMode {
    None,
    All,
}

/// Grouped inputs to `mail()` (§4.7).
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub autosubmit: bool,
    pub ccs: Vec<String>,
    pub draft: bool,
    pub presubmit: PresubmitMode,
    pub remote: String,
    pub remote_branch: String,
    pub reviewers: Vec<String>,
    pub set_topic: bool,
    pub topic: Option<String>,
    pub verify: bool,
    pub check_uncommitted: bool,
}

const REVIEW_BRANCH_SUFFIX: &str = "-REVIEW";
const DEFAULT_EMAIL_DOMAIN: &str = "example.com";

/// Compute the push refspec from the mail configuration (§6).
pub fn build_refspec(config: &MailConfig, branch: &str) -> String {
    let mut refspec = if config.draft {
        "refs/drafts/".to_string()
    } else {
        "refs/for/".to_string()
    };
    refspec.push_str(&config.remote_branch);

    let mut params = Vec::new();
    for reviewer in &config.reviewers {
        params.push(format!("r={}", with_default_domain(reviewer)));
    }
    for cc in &config.ccs {
        params.push(format!("cc={}", with_default_domain(cc)));
    }
    if config.set_topic {
        let topic = config.topic.clone().unwrap_or_else(|| branch.to_string());
        params.push(format!("topic={topic}"));
    }

    if !params.is_empty() {
        refspec.push('%');
        refspec.push_str(&params.join(","));
    }
    refspec
}

fn with_default_domain(address: &str) -> String {
    if address.contains('@') {
        address.to_string()
    } else {
        format!("{address}@{DEFAULT_EMAIL_DOMAIN}")
    }
}

/// `mail()` (§4.7): squash the feature branch into a short-lived review
/// branch, preserve a stable Change-Id, and push to the review ref. The
/// review branch and any stash are always torn down on the way out.
pub fn mail(
    repo: &GitRepo,
    project_dir: &Path,
    tracking_branch: &str,
    config: &MailConfig,
) -> Result<(), ClError> {
    let original_branch = repo.current_branch()?;
    let mut stashed = false;
    if config.check_uncommitted {
        stashed = repo.stash()?;
    }

    let result = mail_inner(repo, project_dir, tracking_branch, &original_branch, config);

    let review_branch = format!("{original_branch}{REVIEW_BRANCH_SUFFIX}");
    if repo.branch_exists(&review_branch).unwrap_or(false) {
        let _ = repo.checkout(&original_branch, CheckoutOptions { force: true });
        let _ = repo.delete_branch(&review_branch, DeleteBranchOptions { force: true });
    } else {
        let _ = repo.checkout(&original_branch, CheckoutOptions { force: true });
    }
    if stashed {
        let _ = repo.stash_pop();
    }

    result
}

fn mail_inner(
    repo: &GitRepo,
    project_dir: &Path,
    tracking_branch: &str,
    branch: &str,
    config: &MailConfig,
) -> Result<(), ClError> {
    let commit_count = repo.count_commits(branch, Some(tracking_branch))?;
    if commit_count == 0 {
        return Err(ClError::EmptyChange);
    }

    sync(repo, project_dir, branch)?;

    let review_branch = format!("{branch}{REVIEW_BRANCH_SUFFIX}");
    repo.checkout(tracking_branch, CheckoutOptions::default())?;
    repo.create_branch(
        &review_branch,
        CreateBranchOptions {
            checkout: true,
            upstream: None,
        },
    )?;

    let range = format!("{tracking_branch}..{branch}");
    let commit_messages = repo.log_records(&range, "%B")?;
    let mut message = changeid::build_commit_message(&commit_messages);

    if let Some(previous) = read_message_file(project_dir, branch) {
        if let Some(change_id) = changeid::extract_change_id(&previous) {
            message.push_str(&format!("\n\nChange-Id: {change_id}"));
        }
    }

    let labels = Labels {
        autosubmit: config.autosubmit,
        presubmit_none: config.presubmit == PresubmitMode::None,
    };
    message = changeid::splice_labels(&message, &labels);

    repo.merge(
        branch,
        MergeOptions {
            squash: true,
            strategy: None,
            reset_on_failure: true,
        },
    )?;
    repo.commit(CommitOptions {
        message: Some(message),
        amend: false,
        allow_empty: false,
        no_verify: false,
        edit: false,
    })?;

    let final_message = repo.log_records(&format!("{review_branch}~1..{review_branch}"), "%B")?
        .into_iter()
        .next()
        .unwrap_or_default();
    if changeid::extract_change_id(&final_message).is_none() {
        return Err(ClError::NoChangeId);
    }

    write_message_file(project_dir, branch, &final_message)?;

    // The review ref is never a local branch name, so the push needs an
    // explicit source (HEAD, the review branch's squash commit) and is
    // always forced: each mail is an independent patchset, not a
    // fast-forward of whatever the ref happened to point at before.
    let refspec = format!("+HEAD:{}", build_refspec(config, branch));
    retry::retry(RetryConfig::default(), || {
        repo.push(&config.remote, &refspec, PushOptions { verify: config.verify })
    })?;

    Ok(())
}

/// `cleanup(branches)` (§4.7): for each branch, require local master be up
/// to date, then check whether the remote already contains its content
/// (matched by diff, not ancestry, since squash-pushes break merge-base).
/// Unmerged branches require `force`.
pub fn cleanup(
    repo: &GitRepo,
    project_dir: &Path,
    tracking_branch: &str,
    remote: &str,
    branches: &[String],
    force: bool,
) -> Result<(), ClError> {
    repo.checkout(tracking_branch, CheckoutOptions::default())?;
    repo.pull(remote, tracking_branch)?;

    for branch in branches {
        let merged = repo.content_matches(tracking_branch, branch).unwrap_or(false);
        if !merged && !force {
            return Err(ClError::UnmergedBranch(branch.clone()));
        }
        repo.delete_branch(branch, DeleteBranchOptions { force: true })?;

        let dep_path = dependency_file(project_dir, branch);
        let msg_path = message_file(project_dir, branch);
        if let Some(dir) = dep_path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
        let _ = msg_path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refspec_targets_for_ref_by_default() {
        let config = MailConfig {
            autosubmit: false,
            ccs: vec![],
            draft: false,
            presubmit: PresubmitMode::All,
            remote: "origin".to_string(),
            remote_branch: "master".to_string(),
            reviewers: vec![],
            set_topic: false,
            topic: None,
            verify: true,
            check_uncommitted: true,
        };
        assert_eq!(build_refspec(&config, "feature"), "refs/for/master");
    }

    #[test]
    fn refspec_targets_drafts_with_params() {
        let config = MailConfig {
            autosubmit: false,
            ccs: vec!["watcher".to_string()],
            draft: true,
            presubmit: PresubmitMode::All,
            remote: "origin".to_string(),
            remote_branch: "master".to_string(),
            reviewers: vec!["alice".to_string()],
            set_topic: true,
            topic: Some("my-topic".to_string()),
            verify: true,
            check_uncommitted: true,
        };
        let refspec = build_refspec(&config, "feature");
        assert_eq!(
            refspec,
            "refs/drafts/master%r=alice@example.com,cc=watcher@example.com,topic=my-topic"
        );
    }

    #[test]
    fn refspec_preserves_explicit_addresses() {
        let config = MailConfig {
            autosubmit: false,
            ccs: vec![],
            draft: false,
            presubmit: PresubmitMode::All,
            remote: "origin".to_string(),
            remote_branch: "master".to_string(),
            reviewers: vec!["alice@corp.example".to_string()],
            set_topic: false,
            topic: None,
            verify: true,
            check_uncommitted: true,
        };
        assert_eq!(
            build_refspec(&config, "feature"),
            "refs/for/master%r=alice@corp.example"
        );
    }
}

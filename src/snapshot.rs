//! The Snapshot Engine (C6, §4.6): captures currently-observed revisions
//! into a manifest document, and restores one by driving the Plan Engine
//! and Executor against it.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};

use jirust_manifest::project::ProjectElement;
use jirust_manifest::{Imports, Manifest, Projects, Tools};
use thiserror::Error;

use crate::executor::{with_local_master, ExecutionReport, Executor};
use crate::manifest_store::{self, ManifestError};
use crate::paths::RootPaths;
use crate::plan;
use crate::project::Project;
use crate::vcs::{GitRepo, VcsEnv, VcsError};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("io error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build a manifest that pins every given project to its currently
/// observed revision, and write it to `file` atomically.
pub fn create_snapshot(
    projects: &BTreeMap<String, Project>,
    env: &VcsEnv,
    paths: &RootPaths,
    file: &Path,
) -> Result<(), SnapshotError> {
    let mut elements = Vec::new();
    for project in projects.values() {
        let repo = GitRepo::open(project.path.clone(), env.clone());
        let revision = with_local_master(&repo, &project.remote_branch, |repo| {
            repo.current_revision(None)
        })?;

        elements.push(ProjectElement {
            name: project.name.clone(),
            path: paths.to_relative(&project.path).to_string_lossy().into_owned(),
            remote: project.remote.clone(),
            remotebranch: Some(project.remote_branch.clone()),
            revision: Some(revision),
            protocol: Some(project.protocol.clone()),
            exclude: None,
        });
    }

    let manifest = Manifest {
        imports: Imports::default(),
        projects: Projects { project: elements },
        tools: Tools::default(),
    };
    manifest_store::write_manifest_file(&manifest, file)?;
    Ok(())
}

/// Treat `file` as the manifest of record and reconcile the current local
/// projects against it via the Plan Engine and Executor.
pub fn checkout_snapshot(
    file: &Path,
    local: &BTreeMap<String, Project>,
    env: VcsEnv,
    paths: &RootPaths,
    gc: bool,
) -> Result<ExecutionReport, SnapshotError> {
    let universe = manifest_store::read_path(file, &file.to_string_lossy(), paths)?;
    let ops = plan::plan(local, &universe.projects);
    let errors = plan::preflight(&ops);
    if !errors.is_empty() {
        // Preflight failures abort before any side effect (§7); the
        // caller surfaces these distinctly from a partial execution
        // report, so we fold them into an immediate I/O-shaped error.
        return Err(SnapshotError::Io {
            path: file.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        });
    }

    let executor = Executor::new(paths, env, gc);
    Ok(executor.execute(&ops))
}

/// Manage the labeled-snapshot layout of §6: write the timestamped file
/// under `labels/<label>/<timestamp>`, then repoint the `<label>` symlink
/// at it.
pub fn create_labeled_snapshot(
    snapshot_root: &Path,
    label: &str,
    timestamp: &str,
    projects: &BTreeMap<String, Project>,
    env: &VcsEnv,
    paths: &RootPaths,
) -> Result<PathBuf, SnapshotError> {
    let label_dir = snapshot_root.join("labels").join(label);
    fs::create_dir_all(&label_dir).map_err(|source| SnapshotError::Io {
        path: label_dir.clone(),
        source,
    })?;

    let snapshot_file = label_dir.join(timestamp);
    create_snapshot(projects, env, paths, &snapshot_file)?;

    let link = snapshot_root.join(label);
    let _ = fs::remove_file(&link);
    unix_fs::symlink(&snapshot_file, &link).map_err(|source| SnapshotError::Io {
        path: link,
        source,
    })?;

    Ok(snapshot_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{DEFAULT_PROTOCOL, DEFAULT_REMOTE_BRANCH};
    use tempfile::tempdir;

    #[test]
    fn create_snapshot_pins_observed_revision() {
        let workdir = tempdir().unwrap();
        let paths = RootPaths::new(workdir.path()).unwrap();
        let env = VcsEnv::default();

        let project_dir = workdir.path().join("proj");
        let repo = GitRepo::init(&project_dir, env.clone()).unwrap();
        fs::write(project_dir.join("file.txt"), "hello").unwrap();
        repo.add(Path::new("file.txt")).unwrap();
        repo.commit(crate::vcs::CommitOptions {
            message: Some("initial".to_string()),
            allow_empty: true,
            ..Default::default()
        })
        .unwrap();
        let expected_revision = repo.current_revision(None).unwrap();

        let mut projects = BTreeMap::new();
        projects.insert(
            "proj".to_string(),
            Project {
                name: "proj".to_string(),
                path: project_dir.clone(),
                remote: "https://example.invalid/proj.git".to_string(),
                remote_branch: DEFAULT_REMOTE_BRANCH.to_string(),
                revision: "HEAD".to_string(),
                protocol: DEFAULT_PROTOCOL.to_string(),
            },
        );

        let snapshot_file = workdir.path().join("snapshot.xml");
        create_snapshot(&projects, &env, &paths, &snapshot_file).unwrap();

        let universe = manifest_store::read_path(&snapshot_file, "snapshot", &paths).unwrap();
        assert_eq!(universe.projects["proj"].revision, expected_revision);
    }
}

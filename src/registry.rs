//! The Project Registry (C3, §4.3): discovers local projects by walking the
//! workspace root for per-project metadata files, without consulting any
//! manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::metadata::{self, MetadataError};
use crate::paths::{RootPaths, PROJECT_META_DIR};
use crate::project::Project;
use crate::vcs::{GitRepo, VcsEnv, VcsError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("project {0:?} is declared by more than one metadata file")]
    DuplicateProject(String),

    #[error("metadata declares path {declared} but was found at {found}")]
    PathMismatch { declared: PathBuf, found: PathBuf },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether `local_projects` stops at the first metadata file found under a
/// directory (`Fast`) or additionally cross-checks the declared path
/// against where the file was actually found (`Full`), per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Fast,
    Full,
}

/// Walk the workspace root for per-project metadata files and return the
/// set of currently materialized projects, keyed by name.
pub fn local_projects(
    paths: &RootPaths,
    mode: ScanMode,
) -> Result<BTreeMap<String, Project>, RegistryError> {
    let mut found = BTreeMap::new();
    walk(paths.root(), paths, mode, &mut found)?;
    Ok(found)
}

fn walk(
    dir: &Path,
    paths: &RootPaths,
    mode: ScanMode,
    found: &mut BTreeMap<String, Project>,
) -> Result<(), RegistryError> {
    let meta_dir = dir.join(PROJECT_META_DIR);
    if meta_dir.is_dir() {
        let metadata = metadata::read_project_metadata(dir)?;
        let project = Project::from_metadata(&metadata, paths);

        if mode == ScanMode::Full {
            let declared = paths.to_absolute(&metadata.path);
            let actual = paths.to_relative(dir);
            let actual_absolute = paths.to_absolute(&actual.to_string_lossy());
            if declared != actual_absolute {
                return Err(RegistryError::PathMismatch {
                    declared,
                    found: actual_absolute,
                });
            }
        }

        let name = project.name.clone();
        if found.insert(name.clone(), project).is_some() {
            return Err(RegistryError::DuplicateProject(name));
        }

        if mode == ScanMode::Fast {
            return Ok(());
        }
    }

    let entries = fs::read_dir(dir).map_err(|source| RegistryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| RegistryError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let is_hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false);
        if is_hidden {
            continue;
        }
        walk(&path, paths, mode, found)?;
    }
    Ok(())
}

/// Starting from `start`, walk upward to the nearest VCS checkout
/// top-level and return its Project record, or `None` if `start` is not
/// inside any registered project.
pub fn current_project(
    start: &Path,
    paths: &RootPaths,
) -> Result<Option<Project>, RegistryError> {
    let mut dir = start.to_path_buf();
    loop {
        let repo = GitRepo::open(dir.clone(), VcsEnv::default());
        if let Ok(top_level) = repo.top_level() {
            if top_level.join(PROJECT_META_DIR).is_dir() {
                let metadata = metadata::read_project_metadata(&top_level)?;
                return Ok(Some(Project::from_metadata(&metadata, paths)));
            }
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{DEFAULT_PROTOCOL, DEFAULT_REMOTE_BRANCH, DEFAULT_REVISION};
    use tempfile::tempdir;

    fn plant(root: &Path, rel: &str, name: &str, paths: &RootPaths) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        let project = Project {
            name: name.to_string(),
            path: dir.clone(),
            remote: "https://example.invalid/repo.git".to_string(),
            remote_branch: DEFAULT_REMOTE_BRANCH.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
        };
        metadata::write_project_metadata(&dir, &project, paths).unwrap();
    }

    #[test]
    fn discovers_nested_projects() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();
        plant(dir.path(), "libs/a", "a", &paths);
        plant(dir.path(), "libs/b", "b", &paths);

        let found = local_projects(&paths, ScanMode::Full).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains_key("a"));
        assert!(found.contains_key("b"));
    }

    #[test]
    fn skips_hidden_directories() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();
        plant(dir.path(), ".hidden/a", "a", &paths);

        let found = local_projects(&paths, ScanMode::Full).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn duplicate_project_name_is_an_error() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();
        plant(dir.path(), "one", "dup", &paths);
        plant(dir.path(), "two", "dup", &paths);

        let err = local_projects(&paths, ScanMode::Full).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateProject(_)));
    }
}

//! The Plan Engine (C4, §4.4): turns a (local, desired) project pair into
//! a totally ordered, preflight-checked sequence of operations.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Delete(Project),
    Move(Project, Project),
    Create(Project),
    Update(Project, Project),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::Delete(p) => &p.name,
            Operation::Move(_, desired) => &desired.name,
            Operation::Create(p) => &p.name,
            Operation::Update(_, desired) => &desired.name,
        }
    }

    /// Total-order rank per §4.4: Delete < Move < Create < Update.
    fn class_rank(&self) -> u8 {
        match self {
            Operation::Delete(_) => 0,
            Operation::Move(_, _) => 1,
            Operation::Create(_) => 2,
            Operation::Update(_, _) => 3,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("create target {0:?} already exists on disk")]
    CreateTargetExists(String),

    #[error("move source {0:?} is missing on disk")]
    MoveSourceMissing(String),

    #[error("move destination {0:?} already exists on disk")]
    MoveDestinationExists(String),

    #[error("delete source {0:?} is missing on disk")]
    DeleteSourceMissing(String),
}

/// Compute the ordered operation list from the local and desired project
/// mappings. Does not touch the filesystem; see `preflight` for that.
pub fn plan(
    local: &BTreeMap<String, Project>,
    desired: &BTreeMap<String, Project>,
) -> Vec<Operation> {
    let mut ops = Vec::new();

    for (name, local_project) in local {
        match desired.get(name) {
            None => ops.push(Operation::Delete(local_project.clone())),
            Some(desired_project) => {
                if local_project.path == desired_project.path {
                    ops.push(Operation::Update(local_project.clone(), desired_project.clone()));
                } else {
                    ops.push(Operation::Move(local_project.clone(), desired_project.clone()));
                }
            }
        }
    }

    for (name, desired_project) in desired {
        if !local.contains_key(name) {
            ops.push(Operation::Create(desired_project.clone()));
        }
    }

    ops.sort_by(|a, b| {
        a.class_rank()
            .cmp(&b.class_rank())
            .then_with(|| a.name().cmp(b.name()))
    });
    ops
}

/// Validate every operation's preconditions against the real filesystem
/// before any operation executes (§4.4). All failures are collected; the
/// caller rejects the whole plan if any are present.
pub fn preflight(ops: &[Operation]) -> Vec<PlanError> {
    let mut errors = Vec::new();
    for op in ops {
        match op {
            Operation::Create(target) => {
                if path_exists(&target.path) {
                    errors.push(PlanError::CreateTargetExists(target.name.clone()));
                }
            }
            Operation::Move(local, desired) => {
                if !path_exists(&local.path) {
                    errors.push(PlanError::MoveSourceMissing(local.name.clone()));
                }
                if path_exists(&desired.path) {
                    errors.push(PlanError::MoveDestinationExists(desired.name.clone()));
                }
            }
            Operation::Delete(local) => {
                if !path_exists(&local.path) {
                    errors.push(PlanError::DeleteSourceMissing(local.name.clone()));
                }
            }
            Operation::Update(_, _) => {}
        }
    }
    errors
}

fn path_exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{DEFAULT_PROTOCOL, DEFAULT_REMOTE_BRANCH, DEFAULT_REVISION};
    use std::path::PathBuf;

    fn project(name: &str, path: &str) -> Project {
        Project {
            name: name.to_string(),
            path: PathBuf::from(path),
            remote: "https://example.invalid/repo.git".to_string(),
            remote_branch: DEFAULT_REMOTE_BRANCH.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }

    #[test]
    fn classifies_each_operation_kind() {
        let mut local = BTreeMap::new();
        local.insert("stale".to_string(), project("stale", "stale"));
        local.insert("moved".to_string(), project("moved", "old/path"));
        local.insert("kept".to_string(), project("kept", "kept"));

        let mut desired = BTreeMap::new();
        desired.insert("moved".to_string(), project("moved", "new/path"));
        desired.insert("kept".to_string(), project("kept", "kept"));
        desired.insert("fresh".to_string(), project("fresh", "fresh"));

        let ops = plan(&local, &desired);
        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], Operation::Delete(_)));
        assert!(matches!(ops[1], Operation::Move(_, _)));
        assert!(matches!(ops[2], Operation::Create(_)));
        assert!(matches!(ops[3], Operation::Update(_, _)));
    }

    #[test]
    fn orders_delete_before_move_before_create_before_update() {
        let mut local = BTreeMap::new();
        local.insert("z-delete".to_string(), project("z-delete", "z-delete"));
        local.insert("a-move".to_string(), project("a-move", "old"));
        local.insert("z-update".to_string(), project("z-update", "same"));

        let mut desired = BTreeMap::new();
        desired.insert("a-move".to_string(), project("a-move", "new"));
        desired.insert("z-update".to_string(), project("z-update", "same"));
        desired.insert("a-create".to_string(), project("a-create", "a-create"));

        let ops = plan(&local, &desired);
        let ranks: Vec<u8> = ops.iter().map(Operation::class_rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn preflight_rejects_existing_create_target() {
        let dir = tempfile::tempdir().unwrap();
        let target_path = dir.path().join("exists");
        std::fs::create_dir(&target_path).unwrap();

        let desired = project("p", target_path.to_str().unwrap());
        let ops = vec![Operation::Create(desired)];
        let errors = preflight(&ops);
        assert_eq!(errors, vec![PlanError::CreateTargetExists("p".to_string())]);
    }

    #[test]
    fn preflight_accepts_valid_plan() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();

        let local = project("p", src.to_str().unwrap());
        let desired = project("p", dir.path().join("dst").to_str().unwrap());
        let ops = vec![Operation::Move(local, desired)];
        assert!(preflight(&ops).is_empty());
    }
}

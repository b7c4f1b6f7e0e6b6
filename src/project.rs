//! The resolved domain types (§3): a `Project` or `Tool` as it exists after
//! defaults are applied and its path has been made absolute under a
//! workspace root. The wire format these are built from lives in
//! `jirust_manifest`.

use std::path::PathBuf;

use jirust_manifest::metadata::ProjectMetadata;

use crate::paths::RootPaths;

pub const DEFAULT_REMOTE_BRANCH: &str = "master";
pub const DEFAULT_REVISION: &str = "HEAD";
pub const DEFAULT_PROTOCOL: &str = "git";

/// A mapping to be kept in sync on disk (§3 data model).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub remote: String,
    pub remote_branch: String,
    pub revision: String,
    pub protocol: String,
}

impl Project {
    pub fn to_metadata(&self, paths: &RootPaths) -> ProjectMetadata {
        ProjectMetadata {
            name: self.name.clone(),
            path: paths.to_relative(&self.path).to_string_lossy().into_owned(),
            remote: self.remote.clone(),
            remotebranch: self.remote_branch.clone(),
            revision: self.revision.clone(),
            protocol: self.protocol.clone(),
        }
    }

    pub fn from_metadata(metadata: &ProjectMetadata, paths: &RootPaths) -> Self {
        Self {
            name: metadata.name.clone(),
            path: paths.to_absolute(&metadata.path),
            remote: metadata.remote.clone(),
            remote_branch: metadata.remotebranch.clone(),
            revision: metadata.revision.clone(),
            protocol: metadata.protocol.clone(),
        }
    }
}

/// A buildable binary owned by a project (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub name: String,
    pub package: String,
    pub project: String,
    pub data: Option<String>,
}

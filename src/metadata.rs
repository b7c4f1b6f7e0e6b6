//! Disk I/O for per-project metadata files (§3, §4.5 "Metadata write
//! atomicity"): write to a sibling temp file, fsync, then rename over the
//! target so a crash never leaves a half-written metadata file behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use jirust_manifest::metadata::ProjectMetadata;
use thiserror::Error;

use crate::paths::{METADATA_FILE_NAME, PROJECT_META_DIR};
use crate::project::Project;
use crate::paths::RootPaths;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read project metadata at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project metadata at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: jirust_manifest::ManifestXmlError,
    },

    #[error("failed to write project metadata at {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn metadata_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_META_DIR).join(METADATA_FILE_NAME)
}

pub fn read_project_metadata(project_dir: &Path) -> Result<ProjectMetadata, MetadataError> {
    let path = metadata_path(project_dir);
    let contents = fs::read_to_string(&path).map_err(|source| MetadataError::Read {
        path: path.clone(),
        source,
    })?;
    ProjectMetadata::from_xml(&contents).map_err(|source| MetadataError::Parse { path, source })
}

pub fn write_project_metadata(
    project_dir: &Path,
    project: &Project,
    paths: &RootPaths,
) -> Result<(), MetadataError> {
    let meta_dir = project_dir.join(PROJECT_META_DIR);
    fs::create_dir_all(&meta_dir).map_err(|source| MetadataError::Write {
        path: meta_dir.clone(),
        source,
    })?;

    let target = meta_dir.join(METADATA_FILE_NAME);
    let tmp = meta_dir.join(format!(".{METADATA_FILE_NAME}.tmp"));
    let xml = project.to_metadata(paths).to_xml().map_err(|source| MetadataError::Write {
        path: tmp.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, source.to_string()),
    })?;

    {
        let mut file = File::create(&tmp).map_err(|source| MetadataError::Write {
            path: tmp.clone(),
            source,
        })?;
        file.write_all(xml.as_bytes()).map_err(|source| MetadataError::Write {
            path: tmp.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| MetadataError::Write {
            path: tmp.clone(),
            source,
        })?;
    }

    fs::rename(&tmp, &target).map_err(|source| MetadataError::Write {
        path: target,
        source,
    })?;
    Ok(())
}

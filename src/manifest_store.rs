//! The Manifest Store (C2, §4.2): resolves a named manifest document into
//! the keyed project/tool universe, following transitive imports with
//! cycle detection and last-writer-wins merge for duplicate keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use jirust_manifest::{project::ProjectElement, tool::ToolElement, Manifest};
use miette::Diagnostic;
use thiserror::Error;

use crate::paths::RootPaths;
use crate::project::{Project, Tool, DEFAULT_PROTOCOL, DEFAULT_REMOTE_BRANCH, DEFAULT_REVISION};

#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("failed to read manifest file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: jirust_manifest::ManifestXmlError,
    },

    #[error("import cycle detected while resolving manifest {0:?}")]
    ImportCycle(String),

    #[error("project {name:?} declares unsupported protocol {protocol:?} (only \"git\" is supported)")]
    UnsupportedProtocol { name: String, protocol: String },

    #[error("failed to serialize manifest")]
    Serialize(#[from] jirust_manifest::ManifestXmlError),

    #[error("failed to write manifest file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The product of loading a manifest: two keyed mappings, project-name →
/// `Project` and tool-name → `Tool` (§3 "Resolved universe").
#[derive(Debug, Clone, Default)]
pub struct Universe {
    pub projects: BTreeMap<String, Project>,
    pub tools: BTreeMap<String, Tool>,
}

/// Load a manifest by name (resolved via `paths.resolve_manifest_path`),
/// recursively merging its imports and fileimports (§4.2).
pub fn read(name: &str, paths: &RootPaths) -> Result<Universe, ManifestError> {
    let path = paths.resolve_manifest_path(name);
    read_path(&path, name, paths)
}

/// Load a manifest directly from a file path, bypassing name resolution.
/// Used both for the root's primary manifest file (§4.8) and for treating
/// a snapshot file as a manifest of record (§4.6).
pub fn read_path(path: &Path, label: &str, paths: &RootPaths) -> Result<Universe, ManifestError> {
    let mut universe = Universe::default();
    let mut stack = Vec::new();
    load_document(path, label, paths, &mut universe, &mut stack)?;
    Ok(universe)
}

fn load_document(
    path: &Path,
    label: &str,
    paths: &RootPaths,
    universe: &mut Universe,
    stack: &mut Vec<PathBuf>,
) -> Result<(), ManifestError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if stack.contains(&canonical) {
        return Err(ManifestError::ImportCycle(label.to_string()));
    }
    stack.push(canonical);

    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = Manifest::from_xml(&contents).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for import in &doc.imports.import {
        // §4.2 step 2: remote imports resolve directly under the manifest
        // root's v2 directory, skipping the root-local legacy override that
        // `resolve_manifest_path` applies for the top-level `read(name)` call.
        let import_path = paths.manifest_v2_dir().join(&import.name);
        load_document(&import_path, &import.name, paths, universe, stack)?;
    }

    let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for fileimport in &doc.imports.fileimport {
        let fileimport_path = parent_dir.join(&fileimport.file);
        load_document(&fileimport_path, &fileimport.file, paths, universe, stack)?;
    }

    merge_projects(&doc.projects.project, paths, universe)?;
    merge_tools(&doc.tools.tool, universe);

    stack.pop();
    Ok(())
}

fn merge_projects(
    elements: &[ProjectElement],
    paths: &RootPaths,
    universe: &mut Universe,
) -> Result<(), ManifestError> {
    for element in elements {
        if element.exclude == Some(true) {
            universe.projects.remove(&element.name);
            continue;
        }

        let protocol = element
            .protocol
            .clone()
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
        if protocol != DEFAULT_PROTOCOL {
            return Err(ManifestError::UnsupportedProtocol {
                name: element.name.clone(),
                protocol,
            });
        }

        let project = Project {
            name: element.name.clone(),
            path: paths.to_absolute(&element.path),
            remote: element.remote.clone(),
            remote_branch: element
                .remotebranch
                .clone()
                .unwrap_or_else(|| DEFAULT_REMOTE_BRANCH.to_string()),
            revision: element
                .revision
                .clone()
                .unwrap_or_else(|| DEFAULT_REVISION.to_string()),
            protocol,
        };
        // Last-writer-wins: a later entry with the same name replaces the
        // earlier one outright.
        universe.projects.insert(project.name.clone(), project);
    }
    Ok(())
}

fn merge_tools(elements: &[ToolElement], universe: &mut Universe) {
    for element in elements {
        if element.exclude == Some(true) {
            universe.tools.remove(&element.name);
            continue;
        }
        let tool = Tool {
            name: element.name.clone(),
            package: element.package.clone(),
            project: element.project.clone(),
            data: element.data.clone(),
        };
        universe.tools.insert(tool.name.clone(), tool);
    }
}

/// Serialize an in-memory manifest document to a file, writing through a
/// sibling temp file and renaming into place (matching the atomicity the
/// Executor and Snapshot Engine apply to every other on-disk write).
pub fn write_manifest_file(manifest: &Manifest, path: &Path) -> Result<(), ManifestError> {
    let xml = manifest.to_xml()?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, xml).map_err(|source| ManifestError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn last_writer_wins_across_imports() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();

        write(
            dir.path(),
            "manifest/v2/a.xml",
            r#"<manifest><imports><import name="b.xml" remote="irrelevant"/></imports>
               <projects><project name="p" path="from-a" remote="r"/></projects></manifest>"#,
        );
        write(
            dir.path(),
            "manifest/v2/b.xml",
            r#"<manifest><projects><project name="p" path="from-b" remote="r"/></projects></manifest>"#,
        );

        let universe = read("a.xml", &paths).unwrap();
        // b.xml is imported before a.xml's own <projects> section is
        // applied, so a's entry (loaded depth-first, applied after the
        // import returns) wins.
        assert_eq!(
            universe.projects["p"].path,
            paths.to_absolute("from-a")
        );
    }

    #[test]
    fn exclude_removes_a_prior_entry() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();

        write(
            dir.path(),
            "manifest/v2/root.xml",
            r#"<manifest><imports><import name="base.xml" remote="irrelevant"/></imports>
               <projects><project name="p" path="p" remote="r" exclude="true"/></projects></manifest>"#,
        );
        write(
            dir.path(),
            "manifest/v2/base.xml",
            r#"<manifest><projects><project name="p" path="p" remote="r"/></projects></manifest>"#,
        );

        let universe = read("root.xml", &paths).unwrap();
        assert!(!universe.projects.contains_key("p"));
    }

    #[test]
    fn import_cycle_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();

        write(
            dir.path(),
            "manifest/v2/a.xml",
            r#"<manifest><imports><import name="b.xml" remote="irrelevant"/></imports></manifest>"#,
        );
        write(
            dir.path(),
            "manifest/v2/b.xml",
            r#"<manifest><imports><import name="a.xml" remote="irrelevant"/></imports></manifest>"#,
        );

        let err = read("a.xml", &paths).unwrap_err();
        assert!(matches!(err, ManifestError::ImportCycle(_)));
    }

    #[test]
    fn unsupported_protocol_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();
        write(
            dir.path(),
            "manifest/v2/a.xml",
            r#"<manifest><projects><project name="p" path="p" remote="r" protocol="svn"/></projects></manifest>"#,
        );
        let err = read("a.xml", &paths).unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedProtocol { .. }));
    }

    #[test]
    fn defaults_are_applied() {
        let dir = tempdir().unwrap();
        let paths = RootPaths::new(dir.path()).unwrap();
        write(
            dir.path(),
            "manifest/v2/a.xml",
            r#"<manifest><projects><project name="p" path="p" remote="r"/></projects></manifest>"#,
        );
        let universe = read("a.xml", &paths).unwrap();
        let p = &universe.projects["p"];
        assert_eq!(p.remote_branch, DEFAULT_REMOTE_BRANCH);
        assert_eq!(p.revision, DEFAULT_REVISION);
        assert_eq!(p.protocol, DEFAULT_PROTOCOL);
    }
}

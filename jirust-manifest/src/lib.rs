//! Wire format for jirust manifest documents (§3, §6 of the design).
//!
//! This crate only parses and serializes the XML; it knows nothing about a
//! workspace root, defaults, or last-writer-wins merge. That resolution
//! step lives in the `jirust` crate's manifest store, which turns a tree of
//! these documents into the resolved project/tool universe.

pub mod import;
pub mod metadata;
pub mod project;
pub mod tool;

use import::{FileImport, Import};
use project::ProjectElement;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tool::ToolElement;

#[derive(Debug, Error)]
pub enum ManifestXmlError {
    #[error("failed to parse manifest XML")]
    Deserialize(#[from] quick_xml::DeError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Imports {
    #[serde(rename = "import", default, skip_serializing_if = "Vec::is_empty")]
    pub import: Vec<Import>,

    #[serde(
        rename = "fileimport",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fileimport: Vec<FileImport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Projects {
    #[serde(rename = "project", default, skip_serializing_if = "Vec::is_empty")]
    pub project: Vec<ProjectElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tools {
    #[serde(rename = "tool", default, skip_serializing_if = "Vec::is_empty")]
    pub tool: Vec<ToolElement>,
}

/// The top-level `<manifest>` document: an ordered set of imports, projects
/// and tools. Element and attribute names here are bit-exact per §6 of the
/// design and are part of the external contract — do not rename them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename = "manifest")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "is_default_imports")]
    pub imports: Imports,

    #[serde(default, skip_serializing_if = "is_default_projects")]
    pub projects: Projects,

    #[serde(default, skip_serializing_if = "is_default_tools")]
    pub tools: Tools,
}

fn is_default_imports(i: &Imports) -> bool {
    i.import.is_empty() && i.fileimport.is_empty()
}

fn is_default_projects(p: &Projects) -> bool {
    p.project.is_empty()
}

fn is_default_tools(t: &Tools) -> bool {
    t.tool.is_empty()
}

impl Manifest {
    pub fn from_xml(xml: &str) -> Result<Self, ManifestXmlError> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub fn to_xml(&self) -> Result<String, ManifestXmlError> {
        Ok(quick_xml::se::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_minimal_manifest() {
        let xml = r#"<manifest>
  <imports>
    <import name="third_party" remote="https://example.com/third_party"/>
    <fileimport file="local.xml"/>
  </imports>
  <projects>
    <project name="tools" path="tools" remote="https://example.com/tools" revision="abc123"/>
  </projects>
  <tools>
    <tool name="gn" package="//build/gn" project="tools"/>
  </tools>
</manifest>"#;

        let manifest = Manifest::from_xml(xml).expect("parses");
        assert_eq!(manifest.imports.import.len(), 1);
        assert_eq!(manifest.imports.fileimport.len(), 1);
        assert_eq!(manifest.projects.project[0].name, "tools");
        assert_eq!(manifest.tools.tool[0].name, "gn");

        let reserialized = manifest.to_xml().expect("serializes");
        let reparsed = Manifest::from_xml(&reserialized).expect("reparses");
        assert_eq!(manifest, reparsed);
    }

    #[test]
    fn exclude_defaults_to_absent() {
        let xml = r#"<manifest><projects><project name="a" path="a" remote="r"/></projects></manifest>"#;
        let manifest = Manifest::from_xml(xml).unwrap();
        assert_eq!(manifest.projects.project[0].exclude, None);
    }

    #[test]
    fn exclude_true_is_parsed() {
        let xml = r#"<manifest><projects><project name="a" path="a" remote="r" exclude="true"/></projects></manifest>"#;
        let manifest = Manifest::from_xml(xml).unwrap();
        assert_eq!(manifest.projects.project[0].exclude, Some(true));
    }

    #[test]
    fn test_parsed_sample_shape() {
        let xml = r#"<manifest>
  <imports>
    <import name="third_party" remote="https://example.com/third_party"/>
  </imports>
  <projects>
    <project name="tools" path="tools" remote="https://example.com/tools" remotebranch="main" revision="abc123"/>
  </projects>
  <tools>
    <tool name="gn" package="//build/gn" project="tools"/>
  </tools>
</manifest>"#;
        let parsed = Manifest::from_xml(xml).expect("parses");
        insta::assert_debug_snapshot!(parsed);
    }
}

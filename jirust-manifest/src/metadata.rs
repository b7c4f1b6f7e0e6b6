use serde::{Deserialize, Serialize};

use crate::ManifestXmlError;

/// The per-project metadata file written at
/// `<project-path>/<meta-dir>/metadata.<ver>` (§3, §6). `path` is always
/// relative to the workspace root so the root may be relocated without
/// invalidating every checkout's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename = "project")]
pub struct ProjectMetadata {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@path")]
    pub path: String,

    #[serde(rename = "@remote")]
    pub remote: String,

    #[serde(rename = "@remotebranch")]
    pub remotebranch: String,

    #[serde(rename = "@revision")]
    pub revision: String,

    #[serde(rename = "@protocol")]
    pub protocol: String,
}

impl ProjectMetadata {
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
    fn round_trips() {
        let record = ProjectMetadata {
            name: "tools".into(),
            path: "tools".into(),
            remote: "https://example.com/tools".into(),
            remotebranch: "master".into(),
            revision: "deadbeef".into(),
            protocol: "git".into(),
        };
        let xml = record.to_xml().unwrap();
        let parsed = ProjectMetadata::from_xml(&xml).unwrap();
        assert_eq!(record, parsed);
    }
}

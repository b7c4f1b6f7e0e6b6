use serde::{Deserialize, Serialize};

/// A remote manifest to merge into the document being loaded, resolved by
/// name against the manifest root's `v2/` directory (or used verbatim if
/// absolute). See the workspace's manifest loader for merge semantics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Import {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@remote")]
    pub remote: String,

    #[serde(rename = "@manifest", skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,

    #[serde(rename = "@root", skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(rename = "@path", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(rename = "@protocol", skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(rename = "@remotebranch", skip_serializing_if = "Option::is_none")]
    pub remotebranch: Option<String>,

    #[serde(rename = "@revision", skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// A manifest included by file path, resolved relative to the document that
/// references it rather than to the manifest root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileImport {
    #[serde(rename = "@file")]
    pub file: String,
}

use serde::{Deserialize, Serialize};

/// A single `<project>` element as it appears in a manifest document, before
/// defaults are applied or its path is resolved against a workspace root.
/// The workspace loader turns this into a `Project` record; this type is
/// the wire format only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectElement {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@path")]
    pub path: String,

    #[serde(rename = "@remote")]
    pub remote: String,

    #[serde(rename = "@remotebranch", skip_serializing_if = "Option::is_none")]
    pub remotebranch: Option<String>,

    #[serde(rename = "@revision", skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    #[serde(rename = "@protocol", skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(rename = "@exclude", default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<bool>,
}

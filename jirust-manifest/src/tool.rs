use serde::{Deserialize, Serialize};

/// A single `<tool>` element: a buildable binary owned by a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolElement {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@package")]
    pub package: String,

    #[serde(rename = "@project")]
    pub project: String,

    #[serde(rename = "@data", skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(rename = "@exclude", default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<bool>,
}

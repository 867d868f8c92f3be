//! VSTS REST API types

use serde::{Deserialize, Serialize};

/// Team project as returned by `_apis/projects`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// List envelope `{count, value}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub count: Option<u64>,
    pub value: Vec<Project>,
}

impl ProjectList {
    /// Exact, case-sensitive name match
    pub fn find_by_name(&self, name: &str) -> Option<&Project> {
        self.value.iter().find(|p| p.name == name)
    }
}

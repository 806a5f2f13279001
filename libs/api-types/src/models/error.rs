//! Structured API error body

use serde::{Deserialize, Serialize};

/// Error body returned with non-2xx responses, e.g.
/// `{"errors":[{"code":"TOO_MANY_PROJECTS"}]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn codes(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.code.clone()).collect()
    }
}

/// Error code returned when the workspace plan cannot hold another project
pub const TOO_MANY_PROJECTS: &str = "TOO_MANY_PROJECTS";

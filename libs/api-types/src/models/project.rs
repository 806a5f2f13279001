//! Project models

use serde::{Deserialize, Serialize};

/// A project (deployable app) as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub owner: ProjectOwner,

    /// Id of the most recently created deploy, if any
    #[serde(rename = "latestCreatedDeployId", default)]
    pub latest_created_deploy_id: Option<String>,

    /// Remote build environment used for continuous deployment
    #[serde(default)]
    pub build_environment_id: Option<String>,

    /// Linked source repository, if continuous deployment was configured
    #[serde(default)]
    pub source: Option<ProjectSource>,
}

/// Workspace owning a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOwner {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Source repository linked to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSource {
    pub provider: String,
    pub provider_id: String,
    pub url: String,
    pub branch: String,
}

/// Response of the workspace project listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListResponse {
    #[serde(default)]
    pub results: Vec<Project>,
}

/// Who may view a deployed app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Private,
    Public,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Private => "private",
            AccessLevel::Public => "public",
        }
    }
}

/// Body of `POST /cli/project`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub slug: String,
    pub title: String,
    /// Workspace id
    pub workspace: String,
    #[serde(rename = "accessLevel")]
    pub access_level: AccessLevel,
}

/// Body of `POST /cli/project/:id/environment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEnvironmentRequest {
    pub source: ProjectSource,
}

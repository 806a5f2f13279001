//! GitHub repository models

use serde::{Deserialize, Serialize};

/// A GitHub repository the authenticated account has authorized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub provider: String,
    pub provider_id: String,
    pub url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// How to look up a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubRepositoryQuery {
    ByName { owner: String, repo: String },
    ByProviderId(String),
}

impl GitHubRepositoryQuery {
    /// Query string pairs for `GET /cli/github/repository`
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        match self {
            GitHubRepositoryQuery::ByName { owner, repo } => {
                vec![("owner", owner.as_str()), ("repo", repo.as_str())]
            }
            GitHubRepositoryQuery::ByProviderId(id) => vec![("provider_id", id.as_str())],
        }
    }
}

//! User and workspace models

use serde::{Deserialize, Serialize};

/// Response of `GET /cli/user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
}

/// A workspace the user belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub login: String,
    pub name: String,
    /// Membership role: `owner`, `member`, `viewer`, ...
    pub role: String,
    #[serde(default)]
    pub tier: Option<String>,
}

impl Workspace {
    /// Only owners and members may create projects and deploys
    pub fn can_deploy(&self) -> bool {
        matches!(self.role.as_str(), "owner" | "member")
    }

    /// Display label, e.g. `Acme Corp (@acme)`
    pub fn label(&self) -> String {
        format!("{} (@{})", self.name, self.login)
    }
}

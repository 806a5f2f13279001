//! Persisted deploy target (`deploy.json`)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::utils::{is_valid_login, is_valid_slug};

/// Which project a directory deploys to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub project_slug: Option<String>,

    #[serde(default)]
    pub workspace_login: Option<String>,

    /// `None` until the user has chosen between local and cloud builds
    #[serde(default)]
    pub continuous_deployment: Option<bool>,
}

impl DeployConfig {
    /// Reject malformed slugs and logins. These are never repaired.
    pub fn validate(&self, file: &File) -> Result<(), CliError> {
        if let Some(login) = &self.workspace_login {
            if !is_valid_login(login) {
                return Err(CliError::Config(format!(
                    "Found invalid workspace login in {}: {}",
                    file.path().display(),
                    login
                )));
            }
        }
        if let Some(slug) = &self.project_slug {
            if !is_valid_slug(slug) {
                return Err(CliError::Config(format!(
                    "Found invalid project slug in {}: {}",
                    file.path().display(),
                    slug
                )));
            }
        }
        Ok(())
    }

    /// Workspace login without any leading `@`
    pub fn bare_workspace_login(&self) -> Option<&str> {
        self.workspace_login
            .as_deref()
            .map(|login| login.trim_start_matches('@'))
    }
}

/// Load the deploy config; a missing file is an empty config
pub async fn load_deploy_config(file: &File) -> Result<DeployConfig, CliError> {
    match file.read_json::<DeployConfig>().await {
        Ok(config) => Ok(config),
        Err(e) if e.is_missing_file() => {
            debug!("No deploy config at {}", file.path().display());
            Ok(DeployConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Save the deploy config
pub async fn save_deploy_config(file: &File, config: &DeployConfig) -> Result<(), CliError> {
    file.write_json(config).await
}

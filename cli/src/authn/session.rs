//! Authenticated API session

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use siteship_api_types::{CurrentUser, Workspace};

use crate::authn::api_key::{ApiKey, KeySource, TOKEN_ENV_VAR};
use crate::deploy::effects::DeployEffects;
use crate::errors::CliError;
use crate::http::api::DeployApi;

/// An API client bound to a user whose key was accepted
pub struct Session {
    pub api_key: ApiKey,
    pub api: Arc<dyn DeployApi>,
    /// `workspaces` only lists workspaces the user can deploy to
    pub user: CurrentUser,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_key", &self.api_key)
            .field("user", &self.user.login)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthProblem {
    NoKey,
    Rejected(KeySource),
    Forbidden(KeySource),
}

impl AuthProblem {
    fn fatal_message(&self) -> String {
        match self {
            AuthProblem::NoKey => format!(
                "No authentication provided. Run `siteship login` or set {}",
                TOKEN_ENV_VAR
            ),
            AuthProblem::Rejected(source) => format!(
                "Authentication failed with the API key from {}",
                source.describe()
            ),
            AuthProblem::Forbidden(source) => format!(
                "The API key from {} does not have permission to deploy",
                source.describe()
            ),
        }
    }

    fn login_question(&self) -> String {
        match self {
            AuthProblem::NoKey => "You must be logged in to deploy. Log in now?".to_string(),
            AuthProblem::Rejected(source) => format!(
                "The API key from {} was rejected. Log in again?",
                source.describe()
            ),
            AuthProblem::Forbidden(source) => format!(
                "The API key from {} is not allowed to deploy. Log in with another account?",
                source.describe()
            ),
        }
    }
}

/// Current user with non-deployable workspaces removed
async fn fetch_user(api: &dyn DeployApi) -> Result<CurrentUser, CliError> {
    let mut user = api.get_current_user().await?;
    user.workspaces.retain(Workspace::can_deploy);
    Ok(user)
}

/// Make sure there is a working API key, logging in interactively if needed.
pub async fn authenticate(effects: &dyn DeployEffects) -> Result<Session, CliError> {
    let problem = match effects.api_key() {
        None => AuthProblem::NoKey,
        Some(key) => {
            let api = effects.api_client(&key)?;
            match fetch_user(api.as_ref()).await {
                Ok(user) => {
                    debug!("Authenticated as @{} via {:?} key", user.login, key.source());
                    return Ok(Session {
                        api_key: key,
                        api,
                        user,
                    });
                }
                Err(e) => match e.status() {
                    Some(401) => AuthProblem::Rejected(key.source()),
                    Some(403) => AuthProblem::Forbidden(key.source()),
                    _ => return Err(e),
                },
            }
        }
    };

    debug!("Authentication problem: {:?}", problem);
    if !effects.is_interactive() {
        return Err(CliError::new(problem.fatal_message()));
    }

    if !effects.prompt().confirm(&problem.login_question(), true)? {
        return Err(CliError::canceled());
    }

    let key = effects.login().await?;
    let api = effects.api_client(&key)?;
    let user = fetch_user(api.as_ref()).await?;
    info!("Logged in as @{}", user.login);
    effects.note(&format!("Logged in as @{}", user.login));

    Ok(Session {
        api_key: key,
        api,
        user,
    })
}

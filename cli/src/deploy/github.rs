//! GitHub source link validation for continuous deployment

use std::path::Path;

use tracing::{debug, info};
use url::Url;

use siteship_api_types::{GitHubRepository, GitHubRepositoryQuery, ProjectSource};

use crate::deploy::effects::DeployEffects;
use crate::deploy::target::ExistingTarget;
use crate::errors::CliError;
use crate::filesys::file::File;
use crate::http::api::DeployApi;
use crate::workers::poller::{self, poll_until, PollStep};

/// `owner/repo` of a GitHub remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRemote {
    pub owner: String,
    pub repo: String,
}

impl GitHubRemote {
    fn query(&self) -> GitHubRepositoryQuery {
        GitHubRepositoryQuery::ByName {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
        }
    }
}

/// Parse a single GitHub remote url, HTTPS or SSH form
pub fn parse_github_url(url: &str) -> Option<GitHubRemote> {
    let rest = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("git@github.com:"))?;
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let (owner, repo) = rest.split_once('/')?;
    let valid = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if !valid(owner) || !valid(repo) {
        return None;
    }
    Some(GitHubRemote {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// First GitHub remote in `git remote -v` output
pub fn parse_github_remotes(output: &str) -> Option<GitHubRemote> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .find_map(parse_github_url)
}

/// Page where the user grants access to a repository
pub fn github_auth_url(ui_url: &str, remote: &GitHubRemote) -> Result<String, CliError> {
    let mut url = Url::parse(&format!("{}/auth-github", ui_url.trim_end_matches('/')))
        .map_err(|e| CliError::Config(format!("Invalid UI url {}: {}", ui_url, e)))?;
    url.query_pairs_mut()
        .append_pair("owner", &remote.owner)
        .append_pair("repo", &remote.repo);
    Ok(url.into())
}

/// Validates that the cloud build for a project will build the local
/// repository and branch, linking the repository when nothing is linked yet.
pub struct GitHubLinkValidator<'a> {
    effects: &'a dyn DeployEffects,
    api: &'a dyn DeployApi,
    poll: &'a poller::Options,
}

impl<'a> GitHubLinkValidator<'a> {
    pub fn new(
        effects: &'a dyn DeployEffects,
        api: &'a dyn DeployApi,
        poll: &'a poller::Options,
    ) -> Self {
        Self { effects, api, poll }
    }

    pub async fn validate(&self, target: &ExistingTarget, working_dir: &Path) -> Result<(), CliError> {
        let settings_url = target.settings_url(&self.effects.ui_url());
        let project = &target.project;

        if project.build_environment_id.is_none() {
            return Err(CliError::new(format!(
                "No build environment is configured for {}. Set one up at {}",
                target.display_name(),
                settings_url
            )));
        }

        if !File::new(working_dir.join(".git")).exists().await {
            return Err(CliError::new(
                "Continuous deployment must run from the root of a git repository; subdirectories are not supported.",
            ));
        }

        let remotes = self.effects.git(working_dir, &["remote", "-v"]).await?;
        let remote = parse_github_remotes(&remotes).ok_or_else(|| {
            CliError::new("No GitHub remote found. Continuous deployment requires a repository hosted on GitHub.")
        })?;
        let branch = self
            .effects
            .git(working_dir, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        debug!("Local repository {}/{} on branch {}", remote.owner, remote.repo, branch);

        let local_repository = self.api.get_github_repository(&remote.query()).await?;

        let Some(source) = &project.source else {
            return self.link(target, &remote, local_repository, branch).await;
        };

        // an unreadable local repository can't be proven to be the linked one
        let Some(local) = &local_repository else {
            return Err(CliError::new(format!(
                "Cannot access the local repository {}/{}, so it can't be matched with the repository linked to {} ({}). Check the build settings at {}",
                remote.owner,
                remote.repo,
                target.display_name(),
                source.url,
                settings_url
            )));
        };
        if local.provider_id != source.provider_id {
            return Err(CliError::new(format!(
                "The repository linked to {} ({}) does not match the local repository {}/{}. Check the build settings at {}",
                target.display_name(),
                source.url,
                remote.owner,
                remote.repo,
                settings_url
            )));
        }

        if source.branch != branch {
            return Err(CliError::new(format!(
                "The branch linked to {} is {} but the local branch is {}. Check the build settings at {}",
                target.display_name(),
                source.branch,
                branch,
                settings_url
            )));
        }

        let linked = self
            .api
            .get_github_repository(&GitHubRepositoryQuery::ByProviderId(source.provider_id.clone()))
            .await?;
        if linked.is_none() {
            return Err(CliError::new(format!(
                "Cannot access the repository linked to {} ({}). Check the build settings at {}",
                target.display_name(),
                source.url,
                settings_url
            )));
        }

        Ok(())
    }

    async fn link(
        &self,
        target: &ExistingTarget,
        remote: &GitHubRemote,
        repository: Option<GitHubRepository>,
        branch: String,
    ) -> Result<(), CliError> {
        let repository = match repository {
            Some(repository) => repository,
            None => self.wait_for_authorization(remote).await?,
        };

        let source = ProjectSource {
            provider: repository.provider,
            provider_id: repository.provider_id,
            url: repository.url,
            branch,
        };
        self.api
            .post_project_environment(&target.project.id, &source)
            .await?;

        info!("Linked {} to {}", target.display_name(), source.url);
        self.effects.note(&format!(
            "Linked {}/{} ({}) to {}",
            remote.owner,
            remote.repo,
            source.branch,
            target.display_name()
        ));
        Ok(())
    }

    async fn wait_for_authorization(&self, remote: &GitHubRemote) -> Result<GitHubRepository, CliError> {
        if !self.effects.is_interactive() {
            return Err(CliError::NonInteractive(format!(
                "authorize access to {}/{} on GitHub",
                remote.owner, remote.repo
            )));
        }

        let auth_url = github_auth_url(&self.effects.ui_url(), remote)?;
        self.effects.note(&format!(
            "Authorize access to {}/{} by visiting {}",
            remote.owner, remote.repo, auth_url
        ));
        self.effects.progress("Waiting for GitHub authorization");

        let query = remote.query();
        let query = &query;
        let api = self.api;
        poll_until(
            "GitHub authorization",
            self.poll,
            move || async move {
                Ok::<_, CliError>(match api.get_github_repository(query).await? {
                    Some(repository) => PollStep::Done(repository),
                    None => PollStep::Continue {
                        status: Some("unauthorized".to_string()),
                    },
                })
            },
            |duration| self.effects.sleep(duration),
        )
        .await
    }
}

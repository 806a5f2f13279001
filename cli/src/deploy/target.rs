//! Deploy target resolution
//!
//! Reconciles the persisted deploy config with the projects the user can
//! see, prompting where the config is incomplete, and creates the project
//! when the user asked for a new one.

use std::cmp::Ordering;

use tracing::{debug, info};

use siteship_api_types::{
    AccessLevel, CreateProjectRequest, Project, Workspace, TOO_MANY_PROJECTS,
};

use crate::authn::session::Session;
use crate::deploy::effects::DeployEffects;
use crate::deploy::options::DeployOptions;
use crate::errors::CliError;
use crate::storage::deploy_config::DeployConfig;
use crate::utils::{is_valid_slug, slugify};

/// Workspace identity carried by a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRef {
    pub id: String,
    pub login: String,
}

impl From<&Workspace> for WorkspaceRef {
    fn from(workspace: &Workspace) -> Self {
        Self {
            id: workspace.id.clone(),
            login: workspace.login.clone(),
        }
    }
}

/// A project that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub workspace: WorkspaceRef,
    pub project_slug: String,
    pub title: String,
    pub access_level: AccessLevel,
}

/// A project known to the server
#[derive(Debug, Clone)]
pub struct ExistingTarget {
    pub workspace: WorkspaceRef,
    pub project: Project,
}

impl ExistingTarget {
    fn from_project(project: Project) -> Self {
        Self {
            workspace: WorkspaceRef {
                id: project.owner.id.clone(),
                login: project.owner.login.clone(),
            },
            project,
        }
    }

    /// `@login/slug`
    pub fn display_name(&self) -> String {
        format!("@{}/{}", self.workspace.login, self.project.slug)
    }

    /// Project settings page in the web UI
    pub fn settings_url(&self, ui_url: &str) -> String {
        format!(
            "{}/projects/@{}/{}/settings",
            ui_url.trim_end_matches('/'),
            self.workspace.login,
            self.project.slug
        )
    }
}

/// Where a deploy goes
#[derive(Debug, Clone)]
pub enum DeployTargetInfo {
    Create(NewProject),
    Existing(ExistingTarget),
}

/// Resolves the deploy target for one attempt
pub struct TargetResolver<'a> {
    effects: &'a dyn DeployEffects,
    session: &'a Session,
    options: &'a DeployOptions,
}

impl<'a> TargetResolver<'a> {
    pub fn new(
        effects: &'a dyn DeployEffects,
        session: &'a Session,
        options: &'a DeployOptions,
    ) -> Self {
        Self {
            effects,
            session,
            options,
        }
    }

    /// Load and validate the deploy config, resolve the target, create the
    /// project if needed, then persist the reconciled config.
    pub async fn resolve_and_persist(&self) -> Result<(ExistingTarget, DeployConfig), CliError> {
        let file = self.options.layout.deploy_config_file();
        let config = self.effects.read_deploy_config(&file).await?;
        config.validate(&file)?;

        let (target, mut config) = self.resolve(config).await?;
        let target = self.ensure_project(target).await?;

        config.project_id = Some(target.project.id.clone());
        config.project_slug = Some(target.project.slug.clone());
        config.workspace_login = Some(target.workspace.login.clone());
        self.effects.write_deploy_config(&file, &config).await?;
        debug!("Saved deploy config to {}", file.path().display());

        Ok((target, config))
    }

    /// Work out the target from `config`, prompting where needed. Does not
    /// create anything or write the config.
    pub async fn resolve(
        &self,
        mut config: DeployConfig,
    ) -> Result<(DeployTargetInfo, DeployConfig), CliError> {
        if config.project_id.is_some()
            && (config.project_slug.is_none() || config.workspace_login.is_none())
        {
            self.backfill_from_project_id(&mut config).await?;
        }

        let mut target = None;
        if let (Some(login), Some(slug)) = (config.bare_workspace_login(), &config.project_slug) {
            match self.session.api.get_project(login, slug).await {
                Ok(project) => target = Some(DeployTargetInfo::Existing(ExistingTarget::from_project(project))),
                Err(e) if e.is_not_found() => {
                    debug!("Project @{}/{} not found", login, slug);
                }
                Err(e) => return Err(e),
            }
        }

        let target = match target {
            Some(target) => target,
            None => self.prompt_target().await?,
        };

        self.check_drift(&config, &target)?;

        if config.continuous_deployment.is_none() && self.effects.is_interactive() {
            let enable = self.effects.prompt().confirm(
                "Do you want to enable continuous deployment? This builds in the cloud from your linked GitHub repository instead of uploading local files.",
                false,
            )?;
            config.continuous_deployment = Some(enable);
        }

        Ok((target, config))
    }

    /// Turn a `Create` target into an existing project
    pub async fn ensure_project(&self, target: DeployTargetInfo) -> Result<ExistingTarget, CliError> {
        let new = match target {
            DeployTargetInfo::Existing(existing) => return Ok(existing),
            DeployTargetInfo::Create(new) => new,
        };

        let request = CreateProjectRequest {
            slug: new.project_slug.clone(),
            title: new.title.clone(),
            workspace: new.workspace.id.clone(),
            access_level: new.access_level,
        };
        match self.session.api.post_project(&request).await {
            Ok(project) => {
                info!("Created project {} in @{}", project.id, new.workspace.login);
                Ok(ExistingTarget {
                    workspace: new.workspace,
                    project,
                })
            }
            Err(e) => {
                if e.api_codes().iter().any(|code| code == TOO_MANY_PROJECTS) {
                    self.effects.warn(&format!(
                        "Workspace @{} has reached its app limit. Upgrade your plan at {}/team/@{}/settings",
                        new.workspace.login,
                        self.effects.ui_url().trim_end_matches('/'),
                        new.workspace.login
                    ));
                } else {
                    self.effects.warn(&format!("Could not create app: {}", e));
                }
                Err(CliError::silent("Error during deploy").with_cause(e))
            }
        }
    }

    /// Legacy configs may only carry the project id
    async fn backfill_from_project_id(&self, config: &mut DeployConfig) -> Result<(), CliError> {
        let Some(project_id) = config.project_id.clone() else {
            return Ok(());
        };

        for workspace in &self.session.user.workspaces {
            let projects = match self.session.api.get_workspace_projects(&workspace.login).await {
                Ok(projects) => projects,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            if let Some(project) = projects.iter().find(|p| p.id == project_id) {
                debug!("Found project {} as @{}/{}", project_id, workspace.login, project.slug);
                config.project_slug = Some(project.slug.clone());
                config.workspace_login = Some(workspace.login.clone());
                return Ok(());
            }
        }

        debug!("Project {} not found in any workspace", project_id);
        Ok(())
    }

    /// Persisted project id points somewhere else than the resolved target
    fn check_drift(&self, config: &DeployConfig, target: &DeployTargetInfo) -> Result<(), CliError> {
        let Some(project_id) = &config.project_id else {
            return Ok(());
        };
        let label = match target {
            DeployTargetInfo::Existing(existing) if &existing.project.id == project_id => {
                return Ok(());
            }
            DeployTargetInfo::Existing(existing) => existing.display_name(),
            DeployTargetInfo::Create(new) => format!("@{}/{}", new.workspace.login, new.project_slug),
        };

        let file = self.options.layout.deploy_config_file();
        self.effects.warn(&format!(
            "The project id {} in {} does not match the app {}",
            project_id,
            file.path().display(),
            label
        ));

        if !self.effects.is_interactive() {
            return Err(CliError::new("Cancelling deploy due to misconfiguration."));
        }
        let overwrite = self.effects.prompt().confirm(
            &format!("Do you want to update the deploy config to point at {}?", label),
            false,
        )?;
        if !overwrite {
            return Err(CliError::canceled());
        }
        Ok(())
    }

    async fn prompt_target(&self) -> Result<DeployTargetInfo, CliError> {
        let prompt = self.effects.interactive("choose where to deploy")?;

        let mut workspaces: Vec<&Workspace> = self.session.user.workspaces.iter().collect();
        let workspace = match workspaces.len() {
            0 => {
                return Err(CliError::new(
                    "You don't have any workspaces you can deploy to.",
                ));
            }
            1 => workspaces[0],
            _ => {
                workspaces.sort_by(|a, b| compare_workspaces(a, b));
                let items: Vec<String> = workspaces.iter().map(|w| w.label()).collect();
                let index = prompt.select("Which workspace do you want to deploy to?", &items, 0)?;
                workspaces[index]
            }
        };

        let projects = match self.session.api.get_workspace_projects(&workspace.login).await {
            Ok(projects) => projects,
            Err(e) if e.is_not_found() => {
                return Err(CliError::new(format!("Workspace {} not found", workspace.login)));
            }
            Err(e) => return Err(e),
        };

        if projects.is_empty() {
            if !prompt.confirm("No apps found. Create a new app?", true)? {
                return Err(CliError::canceled());
            }
        } else {
            let mut items = vec!["Create a new app".to_string()];
            items.extend(projects.iter().map(|p| format!("{} ({})", p.title, p.slug)));
            let index = prompt.select("Which app do you want to deploy to?", &items, 0)?;
            if index > 0 {
                let project = projects.into_iter().nth(index - 1).ok_or_else(CliError::canceled)?;
                return Ok(DeployTargetInfo::Existing(ExistingTarget {
                    workspace: WorkspaceRef::from(workspace),
                    project,
                }));
            }
        }

        let title = match self.options.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => {
                self.effects.warn("You haven't configured a title for your app.");
                let title = prompt.input("What title do you want to use?", None, &|value: &str| {
                    if value.trim().is_empty() {
                        Err("A title is required.".to_string())
                    } else {
                        Ok(())
                    }
                })?;
                self.effects.note("You should add this title to your project config.");
                title
            }
        };

        let default_slug = slugify(&title);
        let project_slug = prompt.input(
            "What slug do you want to use?",
            Some(default_slug.as_str()).filter(|s| !s.is_empty()),
            &|value: &str| {
                if is_valid_slug(value) {
                    Ok(())
                } else {
                    Err("Slugs may only contain lowercase letters, digits and hyphens.".to_string())
                }
            },
        )?;

        let levels = [AccessLevel::Private, AccessLevel::Public];
        let items: Vec<String> = vec![
            "Private (only workspace members)".to_string(),
            "Public (anyone with the link)".to_string(),
        ];
        let index = prompt.select("Who is allowed to access your app?", &items, 0)?;
        let access_level = levels.get(index).copied().ok_or_else(CliError::canceled)?;

        Ok(DeployTargetInfo::Create(NewProject {
            workspace: WorkspaceRef::from(workspace),
            project_slug,
            title,
            access_level,
        }))
    }
}

/// Role descending, then name
fn compare_workspaces(a: &Workspace, b: &Workspace) -> Ordering {
    b.role.cmp(&a.role).then_with(|| a.name.cmp(&b.name))
}

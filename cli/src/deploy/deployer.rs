//! Deploy orchestration
//!
//! One call to [`deploy`] is one attempt: authenticate, resolve the target,
//! publish through either a cloud build or a manifest-diffed upload, then
//! wait for the server to finish processing.

use serde_json::{json, Value};
use tracing::{debug, warn};

use siteship_api_types::{DeployInfo, DeployStatus};

use crate::authn::session::{authenticate, Session};
use crate::deploy::effects::DeployEffects;
use crate::deploy::freshness::{find_build_files, prepare_build};
use crate::deploy::fsm::{DeployEvent, DeployFsm, DeployPhase};
use crate::deploy::github::GitHubLinkValidator;
use crate::deploy::manifest::ManifestUploader;
use crate::deploy::options::{DeployOptions, ForceMode};
use crate::deploy::target::{ExistingTarget, TargetResolver};
use crate::errors::CliError;
use crate::http::api::DeployApi;
use crate::telemetry::record_event;
use crate::workers::poller::{poll_until, PollStep};
use crate::workers::runner::ConcurrencyRunner;

/// Run one deploy attempt
pub async fn deploy(
    options: &DeployOptions,
    effects: &dyn DeployEffects,
) -> Result<DeployInfo, CliError> {
    Deployer::new(effects, options).deploy().await
}

/// Map a polled deploy record onto the completion loop
pub fn completion_step(info: DeployInfo) -> Result<PollStep<DeployInfo>, CliError> {
    match &info.status {
        DeployStatus::Created | DeployStatus::Pending => Ok(PollStep::Continue {
            status: Some(info.status.to_string()),
        }),
        DeployStatus::Uploaded => Ok(PollStep::Done(info)),
        DeployStatus::Failed | DeployStatus::Canceled => Err(CliError::new(format!(
            "Deploy {} {}",
            info.id, info.status
        ))),
        DeployStatus::Unknown(status) => Err(CliError::UnknownStatus(status.clone())),
    }
}

fn force_label(force: Option<ForceMode>) -> Value {
    match force {
        Some(ForceMode::Build) => json!("build"),
        Some(ForceMode::Deploy) => json!("deploy"),
        None => Value::Null,
    }
}

pub struct Deployer<'a> {
    effects: &'a dyn DeployEffects,
    options: &'a DeployOptions,
    fsm: DeployFsm,
}

impl<'a> Deployer<'a> {
    pub fn new(effects: &'a dyn DeployEffects, options: &'a DeployOptions) -> Self {
        Self {
            effects,
            options,
            fsm: DeployFsm::new(),
        }
    }

    pub fn phase(&self) -> DeployPhase {
        self.fsm.phase()
    }

    pub async fn deploy(mut self) -> Result<DeployInfo, CliError> {
        let effects = self.effects;
        let telemetry = effects.telemetry();
        record_event(
            telemetry,
            "start",
            Some(json!({
                "force": force_label(self.options.force),
                "resume": self.options.deploy_id.is_some(),
            })),
        )
        .await;

        match self.run().await {
            Ok(info) => {
                if let Some(url) = &info.url {
                    effects.step(&format!("Deployed app now visible at {}", url));
                }
                record_event(
                    telemetry,
                    "finish",
                    Some(json!({ "deploy_id": info.id, "phase": self.fsm.phase() })),
                )
                .await;
                Ok(info)
            }
            Err(e) => {
                let phase = self.fsm.phase();
                if !self.fsm.is_terminal() {
                    // the run already failed, the FSM only records where
                    let _ = self.fsm.process(DeployEvent::Failed(e.to_string()));
                }
                debug!("Deploy failed during {}: {}", phase, e);
                record_event(
                    telemetry,
                    "error",
                    Some(json!({ "phase": phase, "canceled": e.is_canceled() })),
                )
                .await;
                Err(e)
            }
        }
    }

    fn advance(&mut self, event: DeployEvent) -> Result<(), CliError> {
        let phase = self.fsm.process(event)?;
        debug!("Deploy phase: {}", phase);
        Ok(())
    }

    async fn run(&mut self) -> Result<DeployInfo, CliError> {
        let session = authenticate(self.effects).await?;
        self.advance(DeployEvent::Authenticated)?;
        let api = session.api.as_ref();
        let options = self.options;

        let deploy_id = match &options.deploy_id {
            Some(deploy_id) => {
                self.check_deploy_created(api, deploy_id).await?;
                let files = find_build_files(&options.layout).await?;
                self.upload_and_mark(api, deploy_id, &files).await?;
                deploy_id.clone()
            }
            None => self.start_new_deploy(&session).await?,
        };

        self.advance(DeployEvent::PollingStarted)?;
        let info = self.poll_for_processing_completion(api, &deploy_id).await?;
        self.advance(DeployEvent::Succeeded)?;
        Ok(info)
    }

    async fn start_new_deploy(&mut self, session: &Session) -> Result<String, CliError> {
        let effects = self.effects;
        let options = self.options;
        let api = session.api.as_ref();

        let (target, config) = TargetResolver::new(effects, session, options)
            .resolve_and_persist()
            .await?;
        self.advance(DeployEvent::TargetResolved)?;

        match config.continuous_deployment {
            Some(true) => {
                GitHubLinkValidator::new(effects, api, &options.poll)
                    .validate(&target, &options.working_dir)
                    .await?;
                self.cloud_build(api, &target).await
            }
            Some(false) => {
                prepare_build(effects, &options.layout, options.force).await?;
                let files = find_build_files(&options.layout).await?;
                let deploy_id = self.create_new_deploy(api, &target).await?;
                self.upload_and_mark(api, &deploy_id, &files).await?;
                Ok(deploy_id)
            }
            None => Err(CliError::NonInteractive(format!(
                "choose between local and cloud builds; set continuousDeployment in {}",
                options.layout.deploy_config_file().path().display()
            ))),
        }
    }

    /// Trigger a cloud build and wait for the deploy it creates
    async fn cloud_build(
        &mut self,
        api: &dyn DeployApi,
        target: &ExistingTarget,
    ) -> Result<String, CliError> {
        let effects = self.effects;
        let login = target.workspace.login.as_str();
        let slug = target.project.slug.as_str();

        let previous = api.get_project(login, slug).await?.latest_created_deploy_id;
        api.post_project_build(&target.project.id).await?;
        self.advance(DeployEvent::CloudBuildTriggered)?;
        effects.step("Cloud build requested, waiting for it to start");

        let previous = previous.as_deref();
        poll_until(
            "Cloud build",
            &self.options.poll,
            move || async move {
                let project = api.get_project(login, slug).await?;
                Ok::<_, CliError>(match project.latest_created_deploy_id {
                    Some(id) if Some(id.as_str()) != previous => PollStep::Done(id),
                    _ => PollStep::Continue {
                        status: Some("waiting for build".to_string()),
                    },
                })
            },
            |duration| effects.sleep(duration),
        )
        .await
    }

    async fn create_new_deploy(
        &self,
        api: &dyn DeployApi,
        target: &ExistingTarget,
    ) -> Result<String, CliError> {
        match api
            .post_deploy(&target.project.id, self.options.message.as_deref())
            .await
        {
            Ok(deploy_id) => {
                debug!("Created deploy {}", deploy_id);
                Ok(deploy_id)
            }
            Err(e) if e.status() == Some(404) => Err(CliError::new(format!(
                "Project {} not found.",
                target.display_name()
            ))
            .with_cause(e)),
            Err(e) if e.status() == Some(403) => Err(CliError::new(format!(
                "You don't have permission to deploy to {}.",
                target.display_name()
            ))
            .with_cause(e)),
            Err(e) => Err(e),
        }
    }

    /// Resume mode only continues deploys nothing was uploaded to yet
    async fn check_deploy_created(&self, api: &dyn DeployApi, deploy_id: &str) -> Result<(), CliError> {
        let info = match api.get_deploy(deploy_id).await {
            Ok(info) => info,
            Err(e) if e.is_http() => {
                return Err(CliError::new(format!("Deploy {} not found.", deploy_id)).with_cause(e));
            }
            Err(e) => return Err(e),
        };
        if info.status != DeployStatus::Created {
            return Err(CliError::new(format!(
                "Deploy {} has an unexpected status: {}",
                deploy_id, info.status
            )));
        }
        Ok(())
    }

    async fn upload_and_mark(
        &mut self,
        api: &dyn DeployApi,
        deploy_id: &str,
        files: &[String],
    ) -> Result<(), CliError> {
        let runner = ConcurrencyRunner::new(self.options.max_concurrency);
        ManifestUploader::new(self.effects, api, runner)
            .upload(deploy_id, &self.options.layout.output, files)
            .await?;
        self.advance(DeployEvent::FilesUploaded)?;

        self.mark_deploy_uploaded(api, deploy_id).await?;
        self.advance(DeployEvent::MarkedUploaded)?;
        Ok(())
    }

    async fn mark_deploy_uploaded(&self, api: &dyn DeployApi, deploy_id: &str) -> Result<(), CliError> {
        let file = self.options.layout.build_manifest_file();
        let (build_manifest, status) = match file.read_json::<Value>().await {
            Ok(manifest) => (Some(manifest), "found"),
            Err(e) if e.is_missing_file() => (None, "missing"),
            Err(e) => {
                warn!("Unable to read build manifest {}: {}", file.path().display(), e);
                (None, "error")
            }
        };
        record_event(
            self.effects.telemetry(),
            "build_manifest",
            Some(json!({ "status": status })),
        )
        .await;

        api.post_deploy_uploaded(deploy_id, build_manifest.as_ref())
            .await?;
        Ok(())
    }

    async fn poll_for_processing_completion(
        &self,
        api: &dyn DeployApi,
        deploy_id: &str,
    ) -> Result<DeployInfo, CliError> {
        let effects = self.effects;
        effects.step("Waiting for the deploy to be processed");
        poll_until(
            "Deploy processing",
            &self.options.poll,
            move || async move { completion_step(api.get_deploy(deploy_id).await?) },
            |duration| effects.sleep(duration),
        )
        .await
    }
}

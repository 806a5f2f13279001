//! Production side effects

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::authn::api_key::{resolve_api_key, store_api_key, ApiKey, KeySource, TOKEN_ENV_VAR};
use crate::deploy::effects::DeployEffects;
use crate::errors::CliError;
use crate::filesys::file::File;
use crate::http::api::DeployApi;
use crate::http::client::HttpClient;
use crate::storage::deploy_config::{load_deploy_config, save_deploy_config, DeployConfig};
use crate::storage::layout::{ProjectLayout, StateLayout};
use crate::storage::settings::Settings;
use crate::telemetry::{FileTelemetry, NoopTelemetry, TelemetrySink};
use crate::ui::output;
use crate::ui::prompt::{stdio_is_interactive, DialoguerPrompt, Prompt};

/// Effects backed by the terminal, the network, and child processes
pub struct DefaultEffects {
    settings: Settings,
    state: StateLayout,
    build_command: Option<String>,
    interactive: bool,
    prompt: DialoguerPrompt,
    telemetry: Box<dyn TelemetrySink>,
}

impl DefaultEffects {
    pub fn new(settings: Settings, state: StateLayout, build_command: Option<String>) -> Self {
        let telemetry: Box<dyn TelemetrySink> = if settings.telemetry_disabled {
            Box::new(NoopTelemetry)
        } else {
            Box::new(FileTelemetry::new(state.telemetry_file()))
        };
        Self {
            settings,
            state,
            build_command,
            interactive: stdio_is_interactive(),
            prompt: DialoguerPrompt::new(),
            telemetry,
        }
    }
}

#[async_trait]
impl DeployEffects for DefaultEffects {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn prompt(&self) -> &dyn Prompt {
        &self.prompt
    }

    fn note(&self, message: &str) {
        output::note(message);
    }

    fn step(&self, message: &str) {
        output::step(message);
    }

    fn warn(&self, message: &str) {
        output::warn(message);
    }

    fn progress(&self, message: &str) {
        output::progress(message);
    }

    fn ui_url(&self) -> String {
        self.settings.ui_url.clone()
    }

    async fn build(&self, layout: &ProjectLayout) -> Result<(), CliError> {
        let command = self.build_command.as_deref().ok_or_else(|| {
            CliError::Config(
                "No build command configured. Pass --build-command or set build_command in the settings file"
                    .to_string(),
            )
        })?;

        info!("Running build command: {}", command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("SITESHIP_ROOT", &layout.root)
            .env("SITESHIP_OUTPUT", &layout.output)
            .status()
            .await?;

        if !status.success() {
            return Err(CliError::new(format!("Build command failed ({})", status)));
        }
        Ok(())
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn api_key(&self) -> Option<ApiKey> {
        resolve_api_key(&self.settings, std::env::var(TOKEN_ENV_VAR).ok())
    }

    async fn login(&self) -> Result<ApiKey, CliError> {
        let message = format!(
            "Paste an API key from {}/settings/api-keys",
            self.settings.ui_url.trim_end_matches('/')
        );
        let key = self.prompt.secret(&message)?;
        if key.is_empty() {
            return Err(CliError::new("No API key entered"));
        }

        let key = ApiKey::new(key, KeySource::Login);
        store_api_key(&self.state.settings_file(), &key).await?;
        debug!("Stored API key in {}", self.state.settings_file().path().display());
        Ok(key)
    }

    fn api_client(&self, key: &ApiKey) -> Result<Arc<dyn DeployApi>, CliError> {
        let client = HttpClient::new(&self.settings.api_url, key.clone())?;
        Ok(Arc::new(client))
    }

    async fn read_deploy_config(&self, file: &File) -> Result<DeployConfig, CliError> {
        load_deploy_config(file).await
    }

    async fn write_deploy_config(
        &self,
        file: &File,
        config: &DeployConfig,
    ) -> Result<(), CliError> {
        save_deploy_config(file, config).await
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String, CliError> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            return Err(CliError::new(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn telemetry(&self) -> &dyn TelemetrySink {
        self.telemetry.as_ref()
    }
}

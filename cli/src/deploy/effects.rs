//! Side effects the deploy flow depends on
//!
//! Everything that touches the terminal, the clock, the network client,
//! the local build or git goes through [`DeployEffects`], so the flow can be
//! driven end to end against in-memory fakes.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::authn::api_key::ApiKey;
use crate::errors::CliError;
use crate::filesys::file::File;
use crate::http::api::DeployApi;
use crate::storage::deploy_config::DeployConfig;
use crate::storage::layout::ProjectLayout;
use crate::telemetry::TelemetrySink;
use crate::ui::prompt::Prompt;

#[async_trait]
pub trait DeployEffects: Send + Sync {
    /// Whether prompts can be shown
    fn is_interactive(&self) -> bool;

    fn prompt(&self) -> &dyn Prompt;

    /// Plain message
    fn note(&self, message: &str);

    /// Start of a phase
    fn step(&self, message: &str);

    fn warn(&self, message: &str);

    /// Transient progress line
    fn progress(&self, message: &str);

    /// Web UI root, used to build links shown to the user
    fn ui_url(&self) -> String;

    /// Run the local build for `layout`
    async fn build(&self, layout: &ProjectLayout) -> Result<(), CliError>;

    async fn sleep(&self, duration: Duration);

    fn now(&self) -> SystemTime;

    /// Currently configured API key, if any
    fn api_key(&self) -> Option<ApiKey>;

    /// Obtain and store a new API key
    async fn login(&self) -> Result<ApiKey, CliError>;

    fn api_client(&self, key: &ApiKey) -> Result<Arc<dyn DeployApi>, CliError>;

    async fn read_deploy_config(&self, file: &File) -> Result<DeployConfig, CliError>;

    async fn write_deploy_config(&self, file: &File, config: &DeployConfig)
        -> Result<(), CliError>;

    /// Run `git <args>` in `dir` and return trimmed stdout
    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String, CliError>;

    fn telemetry(&self) -> &dyn TelemetrySink;

    /// The prompt, or a non-interactive error naming what needed input
    fn interactive(&self, context: &str) -> Result<&dyn Prompt, CliError> {
        if self.is_interactive() {
            Ok(self.prompt())
        } else {
            Err(CliError::NonInteractive(context.to_string()))
        }
    }
}

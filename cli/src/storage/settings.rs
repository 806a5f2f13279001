//! Settings file management

use serde::{Deserialize, Serialize};

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

pub const API_URL_ENV_VAR: &str = "SITESHIP_API_URL";
pub const UI_URL_ENV_VAR: &str = "SITESHIP_UI_URL";
pub const TELEMETRY_DISABLE_ENV_VAR: &str = "SITESHIP_TELEMETRY_DISABLE";

/// CLI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the hosting API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the web UI, used for links
    #[serde(default = "default_ui_url")]
    pub ui_url: String,

    /// Stored API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Shell command that builds the site
    #[serde(default)]
    pub build_command: Option<String>,

    #[serde(default)]
    pub telemetry_disabled: bool,
}

fn default_api_url() -> String {
    "https://api.siteship.dev".to_string()
}

fn default_ui_url() -> String {
    "https://siteship.dev".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ui_url: default_ui_url(),
            api_key: None,
            log_level: LogLevel::default(),
            build_command: None,
            telemetry_disabled: false,
        }
    }
}

impl Settings {
    /// Apply environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV_VAR).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(url) = lookup(UI_URL_ENV_VAR).filter(|v| !v.is_empty()) {
            self.ui_url = url;
        }
        if lookup(TELEMETRY_DISABLE_ENV_VAR).is_some_and(|v| !v.is_empty() && v != "0") {
            self.telemetry_disabled = true;
        }
        self
    }
}

/// Load settings; a missing file yields defaults
pub async fn load_settings(file: &File) -> Result<Settings, CliError> {
    match file.read_json::<Settings>().await {
        Ok(settings) => Ok(settings),
        Err(e) if e.is_missing_file() => Ok(Settings::default()),
        Err(e) => Err(e),
    }
}

/// Save settings, readable only by the owner since they may hold a key
pub async fn save_settings(file: &File, settings: &Settings) -> Result<(), CliError> {
    file.write_json(settings).await?;
    file.set_permissions_600().await
}

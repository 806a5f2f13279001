//! API key resolution and storage

use secrecy::{ExposeSecret, SecretString};

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::storage::settings::{load_settings, save_settings, Settings};

pub const TOKEN_ENV_VAR: &str = "SITESHIP_TOKEN";

/// Where an API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Env,
    File,
    Login,
}

impl KeySource {
    pub fn describe(&self) -> String {
        match self {
            KeySource::Env => format!("the {} environment variable", TOKEN_ENV_VAR),
            KeySource::File => "the settings file".to_string(),
            KeySource::Login => "login".to_string(),
        }
    }
}

/// An API key and its source
#[derive(Debug)]
pub struct ApiKey {
    key: SecretString,
    source: KeySource,
}

impl ApiKey {
    pub fn new(key: impl Into<String>, source: KeySource) -> Self {
        Self {
            key: SecretString::from(key.into()),
            source,
        }
    }

    pub fn expose(&self) -> &str {
        self.key.expose_secret()
    }

    pub fn source(&self) -> KeySource {
        self.source
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string(), self.source)
    }
}

/// The environment wins over the settings file. Empty values count as unset.
pub fn resolve_api_key(settings: &Settings, env_value: Option<String>) -> Option<ApiKey> {
    if let Some(key) = env_value.filter(|k| !k.trim().is_empty()) {
        return Some(ApiKey::new(key.trim(), KeySource::Env));
    }
    settings
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(|k| ApiKey::new(k.trim(), KeySource::File))
}

/// Persist a key into the settings file, keeping other settings
pub async fn store_api_key(settings_file: &File, key: &ApiKey) -> Result<(), CliError> {
    let mut settings = load_settings(settings_file).await?;
    settings.api_key = Some(key.expose().to_string());
    save_settings(settings_file, &settings).await
}

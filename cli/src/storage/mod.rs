//! Persisted local state

pub mod deploy_config;
pub mod layout;
pub mod settings;

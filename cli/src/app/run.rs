//! Command dispatch

use tracing::debug;

use crate::app::effects::DefaultEffects;
use crate::app::options::{Cli, Command, DeployArgs};
use crate::authn::session::authenticate;
use crate::deploy::deployer::deploy;
use crate::deploy::effects::DeployEffects;
use crate::errors::CliError;
use crate::logs::{init_logging, LogOptions};
use crate::storage::layout::StateLayout;
use crate::storage::settings::{load_settings, Settings};
use crate::ui::output;
use crate::utils::version_info;

/// Run one CLI invocation
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let state = StateLayout::default();
    let settings = load_settings(&state.settings_file())
        .await?
        .with_env_overrides();

    init_logging(LogOptions {
        log_level: cli.log_level.clone().unwrap_or_else(|| settings.log_level.clone()),
        json_format: cli.json_logs,
    })?;
    debug!("Loaded settings from {}", state.settings_file().path().display());

    match cli.command {
        Command::Deploy(args) => run_deploy(args, settings, state).await,
        Command::Login => {
            let effects = DefaultEffects::new(settings, state, None);
            login(&effects).await
        }
        Command::Whoami => {
            let effects = DefaultEffects::new(settings, state, None);
            whoami(&effects).await
        }
        Command::Version => {
            println!("{}", serde_json::to_string_pretty(&version_info())?);
            Ok(())
        }
    }
}

async fn run_deploy(args: DeployArgs, settings: Settings, state: StateLayout) -> Result<(), CliError> {
    let build_command = args
        .build_command
        .clone()
        .or_else(|| settings.build_command.clone());
    let effects = DefaultEffects::new(settings, state, build_command);
    let options = args.into_options();

    let info = deploy(&options, &effects).await?;
    if let Some(url) = info.url {
        println!("{}", url);
    }
    Ok(())
}

async fn login(effects: &dyn DeployEffects) -> Result<(), CliError> {
    effects.interactive("enter an API key; set SITESHIP_TOKEN instead")?;
    let key = effects.login().await?;
    let user = effects.api_client(&key)?.get_current_user().await?;
    output::success(&format!("Logged in as @{}", user.login));
    Ok(())
}

async fn whoami(effects: &dyn DeployEffects) -> Result<(), CliError> {
    let session = authenticate(effects).await?;
    println!("@{}", session.user.login);
    if session.user.workspaces.is_empty() {
        effects.warn("No workspaces you can deploy to");
    }
    for workspace in &session.user.workspaces {
        println!("  {} [{}]", workspace.label(), workspace.role);
    }
    Ok(())
}

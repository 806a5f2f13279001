//! Command line options

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::deploy::options::{DeployOptions, ForceMode};
use crate::logs::LogLevel;
use crate::storage::layout::ProjectLayout;

/// Deploy static sites
#[derive(Debug, Parser)]
#[command(name = "siteship", version, about)]
pub struct Cli {
    /// Log level, overriding the settings file (RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Emit diagnostics as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build if needed and deploy the site
    Deploy(DeployArgs),

    /// Store an API key
    Login,

    /// Show the authenticated user and deployable workspaces
    Whoami,

    /// Print version and build information
    Version,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// Source root
    #[arg(long, default_value = "src")]
    pub root: PathBuf,

    /// Build output directory
    #[arg(long, default_value = "dist")]
    pub output: PathBuf,

    /// Title used when creating a new app
    #[arg(long)]
    pub title: Option<String>,

    /// Deploy config file, instead of <root>/.siteship/deploy.json
    #[arg(long)]
    pub deploy_config: Option<PathBuf>,

    /// Continue an existing deploy that has not received files yet
    #[arg(long)]
    pub deploy_id: Option<String>,

    /// Always build first, or deploy the existing build as is
    #[arg(long, value_enum)]
    pub force: Option<ForceMode>,

    /// Maximum parallel hashes and uploads
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    #[arg(long, default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Budget for each wait on the server
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Deploy message
    #[arg(long, short = 'm')]
    pub message: Option<String>,

    /// Shell command that builds the site, overriding the settings file
    #[arg(long)]
    pub build_command: Option<String>,
}

impl DeployArgs {
    pub fn into_options(self) -> DeployOptions {
        let mut layout = ProjectLayout::new(self.root, self.output);
        layout.deploy_config = self.deploy_config;

        DeployOptions {
            layout,
            title: self.title,
            deploy_id: self.deploy_id,
            force: self.force,
            max_concurrency: self.max_concurrency,
            message: self.message,
            ..Default::default()
        }
        .with_poll_timing(
            Duration::from_millis(self.poll_interval_ms.max(1)),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

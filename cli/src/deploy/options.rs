//! Deploy options

use std::path::PathBuf;
use std::time::Duration;

use crate::storage::layout::ProjectLayout;
use crate::workers::poller;

/// Skip the build freshness dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ForceMode {
    /// Always build first
    Build,

    /// Deploy the existing build as is
    Deploy,
}

/// Options for one deploy run
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub layout: ProjectLayout,

    /// Title for a project created by this deploy
    pub title: Option<String>,

    /// Resume an already created deploy instead of creating one
    pub deploy_id: Option<String>,

    pub force: Option<ForceMode>,

    /// Parallel hashing and upload limit
    pub max_concurrency: Option<usize>,

    /// Shared by every polling loop of the run
    pub poll: poller::Options,

    /// Deploy message
    pub message: Option<String>,

    /// Where git commands run
    pub working_dir: PathBuf,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            layout: ProjectLayout::default(),
            title: None,
            deploy_id: None,
            force: None,
            max_concurrency: None,
            poll: poller::Options::default(),
            message: None,
            working_dir: PathBuf::from("."),
        }
    }
}

impl DeployOptions {
    pub fn with_poll_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll = poller::Options { interval, timeout };
        self
    }
}

//! Finite state machine for a single deploy attempt

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CliError;

/// Deploy attempt phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
    /// Nothing done yet
    Start,

    /// API key accepted
    Authenticated,

    /// Target project known (created if needed)
    TargetResolved,

    /// Remote build requested
    CloudBuildTriggered,

    /// Manifest submitted and required files uploaded
    FilesUploaded,

    /// Server told upload is complete
    Uploaded,

    /// Waiting for the deploy to be processed
    Polling,

    /// Deploy is live
    Succeeded,

    /// Deploy attempt failed
    Failed,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployPhase::Start => "start",
            DeployPhase::Authenticated => "authenticated",
            DeployPhase::TargetResolved => "target_resolved",
            DeployPhase::CloudBuildTriggered => "cloud_build_triggered",
            DeployPhase::FilesUploaded => "files_uploaded",
            DeployPhase::Uploaded => "uploaded",
            DeployPhase::Polling => "polling",
            DeployPhase::Succeeded => "succeeded",
            DeployPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Deploy attempt event
#[derive(Debug, Clone)]
pub enum DeployEvent {
    Authenticated,

    TargetResolved,

    CloudBuildTriggered,

    /// Files uploaded. Resume mode goes here straight from `Authenticated`.
    FilesUploaded,

    MarkedUploaded,

    PollingStarted,

    Succeeded,

    Failed(String),
}

/// Deploy attempt FSM
#[derive(Debug, Clone)]
pub struct DeployFsm {
    phase: DeployPhase,
    error: Option<String>,
}

impl DeployFsm {
    pub fn new() -> Self {
        Self {
            phase: DeployPhase::Start,
            error: None,
        }
    }

    pub fn phase(&self) -> DeployPhase {
        self.phase
    }

    /// Failure reason, once failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, DeployPhase::Succeeded | DeployPhase::Failed)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeployEvent) -> Result<DeployPhase, CliError> {
        use DeployPhase as P;

        let next = match (self.phase, &event) {
            (P::Start, DeployEvent::Authenticated) => P::Authenticated,

            (P::Authenticated, DeployEvent::TargetResolved) => P::TargetResolved,
            (P::Authenticated, DeployEvent::FilesUploaded) => P::FilesUploaded,

            (P::TargetResolved, DeployEvent::CloudBuildTriggered) => P::CloudBuildTriggered,
            (P::TargetResolved, DeployEvent::FilesUploaded) => P::FilesUploaded,

            (P::CloudBuildTriggered, DeployEvent::PollingStarted) => P::Polling,

            (P::FilesUploaded, DeployEvent::MarkedUploaded) => P::Uploaded,

            (P::Uploaded, DeployEvent::PollingStarted) => P::Polling,

            (P::Polling, DeployEvent::Succeeded) => P::Succeeded,

            (phase, DeployEvent::Failed(reason))
                if !matches!(phase, P::Succeeded | P::Failed) =>
            {
                self.error = Some(reason.clone());
                P::Failed
            }

            (phase, event) => {
                return Err(CliError::Internal(anyhow::anyhow!(
                    "Invalid deploy transition: {} -> {:?}",
                    phase,
                    event
                )));
            }
        };

        self.phase = next;
        Ok(next)
    }
}

impl Default for DeployFsm {
    fn default() -> Self {
        Self::new()
    }
}

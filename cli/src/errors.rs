//! Error types for the siteship CLI

use std::error::Error as StdError;
use std::io::ErrorKind;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Main error type for the siteship CLI
#[derive(Error, Debug)]
pub enum CliError {
    /// User-facing failure. Cancellation is an operational error with
    /// `exit_code == 0` and `print == false`.
    #[error("{message}")]
    Operational {
        message: String,
        #[source]
        cause: Option<BoxError>,
        print: bool,
        exit_code: i32,
    },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API error {status} [{}]: {body}", codes.join(", "))]
    Api {
        status: u16,
        codes: Vec<String>,
        body: String,
    },

    #[error("Unknown deploy status: {0}")]
    UnknownStatus(String),

    #[error("{what} timed out (last status: {})", last_status.as_deref().unwrap_or("none"))]
    Timeout {
        what: String,
        last_status: Option<String>,
    },

    #[error("Cannot prompt in a non-interactive session: {0}")]
    NonInteractive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    /// A printed, non-zero operational error
    pub fn new(message: impl Into<String>) -> Self {
        CliError::Operational {
            message: message.into(),
            cause: None,
            print: true,
            exit_code: 1,
        }
    }

    /// The user declined or canceled a prompt
    pub fn canceled() -> Self {
        CliError::Operational {
            message: "User canceled deploy".to_string(),
            cause: None,
            print: false,
            exit_code: 0,
        }
    }

    /// A fatal error whose details were already shown to the user
    pub fn silent(message: impl Into<String>) -> Self {
        CliError::Operational {
            message: message.into(),
            cause: None,
            print: false,
            exit_code: 1,
        }
    }

    /// Attach an underlying cause to an operational error
    pub fn with_cause(self, err: impl Into<BoxError>) -> Self {
        match self {
            CliError::Operational {
                message,
                print,
                exit_code,
                ..
            } => CliError::Operational {
                message,
                cause: Some(err.into()),
                print,
                exit_code,
            },
            other => other,
        }
    }

    /// HTTP status of a transport or API error
    pub fn status(&self) -> Option<u16> {
        match self {
            CliError::Http { status, .. } | CliError::Api { status, .. } => Some(*status),
            CliError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_http(&self) -> bool {
        self.status().is_some()
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Structured API error codes, if any
    pub fn api_codes(&self) -> &[String] {
        match self {
            CliError::Api { codes, .. } => codes,
            _ => &[],
        }
    }

    /// An expected "file does not exist" condition
    pub fn is_missing_file(&self) -> bool {
        matches!(self, CliError::Io(e) if e.kind() == ErrorKind::NotFound)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            CliError::Operational {
                exit_code: 0,
                print: false,
                ..
            }
        )
    }

    pub fn should_print(&self) -> bool {
        match self {
            CliError::Operational { print, .. } => *print,
            _ => true,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Operational { exit_code, .. } => *exit_code,
            _ => 1,
        }
    }
}

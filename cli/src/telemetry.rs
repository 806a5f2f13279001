//! Usage telemetry
//!
//! Events are best effort: a sink that fails never affects a deploy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::errors::CliError;
use crate::filesys::file::File;

/// One telemetry record
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Destination for telemetry events
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record(&self, event: &str, data: Option<Value>) -> Result<(), CliError>;
}

/// Record an event, swallowing sink failures
pub async fn record_event(sink: &dyn TelemetrySink, event: &str, data: Option<Value>) {
    if let Err(e) = sink.record(event, data).await {
        debug!("Dropping telemetry event {}: {}", event, e);
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NoopTelemetry;

#[async_trait]
impl TelemetrySink for NoopTelemetry {
    async fn record(&self, _event: &str, _data: Option<Value>) -> Result<(), CliError> {
        Ok(())
    }
}

/// Appends events as JSON lines to a local file
#[derive(Debug)]
pub struct FileTelemetry {
    file: File,
    session_id: Uuid,
}

impl FileTelemetry {
    pub fn new(file: File) -> Self {
        Self {
            file,
            session_id: Uuid::new_v4(),
        }
    }
}

#[async_trait]
impl TelemetrySink for FileTelemetry {
    async fn record(&self, event: &str, data: Option<Value>) -> Result<(), CliError> {
        let record = TelemetryEvent {
            session_id: self.session_id,
            timestamp: Utc::now(),
            event: event.to_string(),
            data,
        };
        self.file.append_line(&serde_json::to_string(&record)?).await
    }
}

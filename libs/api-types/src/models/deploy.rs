//! Deploy, manifest and upload models

use serde::{Deserialize, Serialize};

/// Server-side status of a deploy
///
/// Values the client does not know are kept as `Unknown` so callers can
/// report them instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeployStatus {
    Created,
    Pending,
    Uploaded,
    Failed,
    Canceled,
    Unknown(String),
}

impl From<String> for DeployStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "created" => DeployStatus::Created,
            "pending" => DeployStatus::Pending,
            "uploaded" => DeployStatus::Uploaded,
            "failed" => DeployStatus::Failed,
            "canceled" => DeployStatus::Canceled,
            _ => DeployStatus::Unknown(value),
        }
    }
}

impl From<DeployStatus> for String {
    fn from(value: DeployStatus) -> Self {
        value.as_str().to_string()
    }
}

impl DeployStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeployStatus::Created => "created",
            DeployStatus::Pending => "pending",
            DeployStatus::Uploaded => "uploaded",
            DeployStatus::Failed => "failed",
            DeployStatus::Canceled => "canceled",
            DeployStatus::Unknown(other) => other,
        }
    }
}

impl std::fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `GET /cli/deploy/:id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployInfo {
    pub id: String,
    pub status: DeployStatus,
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of `POST /cli/project/:id/deploy`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDeployRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of `POST /cli/project/:id/deploy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeployResponse {
    pub id: String,
}

/// One built artifact in a deploy manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFileInfo {
    /// Path relative to the build output root, `/` separated
    pub path: String,
    pub size: u64,
    /// Base64 SHA-512 of the raw file bytes
    pub hash: String,
}

/// Body of `POST /cli/deploy/:id/manifest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployManifestRequest {
    pub files: Vec<ManifestFileInfo>,
}

/// Per-file instruction returned for a submitted manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Upload,
    Skip,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadInstruction {
    pub path: String,
    pub status: UploadStatus,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    Ok,
    Error,
}

/// Response of `POST /cli/deploy/:id/manifest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployManifestResponse {
    pub status: ManifestStatus,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub files: Vec<UploadInstruction>,
}

/// Body of `POST /cli/deploy/:id/uploaded`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployUploadedRequest {
    pub build_manifest: Option<serde_json::Value>,
}

//! Manifest-diffed file upload

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use siteship_api_types::{ManifestFileInfo, ManifestStatus, UploadStatus};

use crate::deploy::effects::DeployEffects;
use crate::errors::CliError;
use crate::http::api::DeployApi;
use crate::utils::{sha512_base64, truncate_path};
use crate::workers::rate_limiter::RateLimiter;
use crate::workers::runner::ConcurrencyRunner;

/// Uploads beyond this count go through the rate limiter
pub const RATE_LIMIT_THRESHOLD: usize = 300;

/// Rate limiter slots per second for large uploads
pub const RATE_LIMIT_SLOTS: u32 = 5;

const PROGRESS_PATH_CHARS: usize = 60;

/// Counts reported after an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub unchanged: usize,
    pub total: usize,
}

/// A limiter only for uploads large enough to need one
pub fn rate_limiter_for(upload_count: usize) -> Option<RateLimiter> {
    (upload_count > RATE_LIMIT_THRESHOLD).then(|| RateLimiter::new(RATE_LIMIT_SLOTS))
}

fn hash_file(path: &Path, client_name: String) -> Result<ManifestFileInfo, CliError> {
    let bytes = std::fs::read(path)?;
    Ok(ManifestFileInfo {
        path: client_name,
        size: bytes.len() as u64,
        hash: sha512_base64(&bytes),
    })
}

pub struct ManifestUploader<'a> {
    effects: &'a dyn DeployEffects,
    api: &'a dyn DeployApi,
    runner: ConcurrencyRunner,
}

impl<'a> ManifestUploader<'a> {
    pub fn new(
        effects: &'a dyn DeployEffects,
        api: &'a dyn DeployApi,
        runner: ConcurrencyRunner,
    ) -> Self {
        Self {
            effects,
            api,
            runner,
        }
    }

    /// Size and digest of every file, relative to `root`
    pub async fn hash_files(
        &self,
        root: &Path,
        files: &[String],
    ) -> Result<Vec<ManifestFileInfo>, CliError> {
        self.runner
            .run(files.to_vec(), |_, name: String| {
                let path = root.join(&name);
                async move {
                    tokio::task::spawn_blocking(move || hash_file(&path, name))
                        .await
                        .map_err(anyhow::Error::from)?
                }
            })
            .await
    }

    /// Upload the files under `root` the server does not already have
    pub async fn upload(
        &self,
        deploy_id: &str,
        root: &Path,
        files: &[String],
    ) -> Result<UploadSummary, CliError> {
        self.effects.step(&format!("Hashing {} files", files.len()));
        let manifest = self.hash_files(root, files).await?;

        let response = self.api.post_deploy_manifest(deploy_id, &manifest).await?;

        let errors: Vec<String> = response
            .files
            .iter()
            .filter(|f| f.status == UploadStatus::Error)
            .map(|f| match &f.detail {
                Some(detail) => format!("{}: {}", f.path, detail),
                None => f.path.clone(),
            })
            .collect();
        if !errors.is_empty() || response.status == ManifestStatus::Error {
            for error in &errors {
                self.effects.warn(error);
            }
            let detail = response
                .detail
                .clone()
                .unwrap_or_else(|| format!("{} file(s) were rejected", errors.len()));
            return Err(CliError::new(format!("Deploy manifest rejected: {}", detail)));
        }

        // only paths this client submitted may be read from disk
        let submitted: HashSet<&str> = manifest.iter().map(|f| f.path.as_str()).collect();
        if let Some(unknown) = response
            .files
            .iter()
            .find(|f| f.status == UploadStatus::Upload && !submitted.contains(f.path.as_str()))
        {
            return Err(CliError::new(format!(
                "Deploy manifest requested a file that was not submitted: {}",
                unknown.path
            )));
        }

        let to_upload: Vec<(PathBuf, String)> = response
            .files
            .into_iter()
            .filter(|f| f.status == UploadStatus::Upload)
            .map(|f| (root.join(&f.path), f.path))
            .collect();
        let total = to_upload.len();
        debug!("{} of {} files need uploading", total, manifest.len());

        let limiter = rate_limiter_for(total);
        if limiter.is_some() {
            warn!("Rate limiting {} uploads", total);
        }
        let limiter = limiter.as_ref();
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        self.runner
            .run(to_upload, |_, (local_path, client_name)| async move {
                if let Some(limiter) = limiter {
                    limiter.wait().await;
                }
                self.api
                    .post_deploy_file(deploy_id, &local_path, &client_name)
                    .await?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                self.effects.progress(&format!(
                    "Uploading file {} of {}: {}",
                    done,
                    total,
                    truncate_path(&client_name, PROGRESS_PATH_CHARS)
                ));
                Ok::<(), CliError>(())
            })
            .await?;

        let summary = UploadSummary {
            uploaded: total,
            unchanged: manifest.len().saturating_sub(total),
            total: manifest.len(),
        };
        self.effects.note(&format!(
            "{} uploaded, {} unchanged, {} total",
            summary.uploaded, summary.unchanged, summary.total
        ));
        Ok(summary)
    }
}

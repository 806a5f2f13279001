//! Directory operations

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;

use crate::errors::CliError;

/// A directory wrapper with path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> crate::filesys::file::File {
        crate::filesys::file::File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Recursively list files, as `/` separated paths relative to this
    /// directory, sorted. Fails with a NotFound io error if the directory
    /// is missing.
    pub async fn walk_files(&self, skip_hidden_dirs: bool) -> Result<Vec<String>, CliError> {
        let mut files = Vec::new();
        self.walk(skip_hidden_dirs, |path, _| {
            files.push(path.to_string());
        })
        .await?;
        files.sort();
        Ok(files)
    }

    /// Oldest and newest modification time over all files below this
    /// directory. `None` when the directory holds no files.
    pub async fn mtime_range(
        &self,
        skip_hidden_dirs: bool,
    ) -> Result<Option<(SystemTime, SystemTime)>, CliError> {
        let mut range: Option<(SystemTime, SystemTime)> = None;
        self.walk(skip_hidden_dirs, |_, modified| {
            range = Some(match range {
                None => (modified, modified),
                Some((min, max)) => (min.min(modified), max.max(modified)),
            });
        })
        .await?;
        Ok(range)
    }

    async fn walk<F>(&self, skip_hidden_dirs: bool, mut visit: F) -> Result<(), CliError>
    where
        F: FnMut(&str, SystemTime),
    {
        let mut pending = vec![(self.path.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                let relative = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", prefix, name)
                };
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    if skip_hidden_dirs && name.starts_with('.') {
                        continue;
                    }
                    pending.push((entry.path(), relative));
                } else if metadata.is_file() {
                    visit(&relative, metadata.modified()?);
                }
            }
        }

        Ok(())
    }
}

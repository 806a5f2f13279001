//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Name of the per-project and per-user state directories
pub const STATE_DIR_NAME: &str = ".siteship";

/// Per-user state, `~/.siteship` by default
#[derive(Debug, Clone)]
pub struct StateLayout {
    /// Base directory for all user state
    pub base_dir: PathBuf,
}

impl StateLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Get the telemetry log path
    pub fn telemetry_file(&self) -> File {
        File::new(self.base_dir.join("telemetry.jsonl"))
    }
}

impl Default for StateLayout {
    fn default() -> Self {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STATE_DIR_NAME);
        Self::new(base_dir)
    }
}

/// Layout of the project being deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Source root
    pub root: PathBuf,

    /// Build output root
    pub output: PathBuf,

    /// Explicit deploy config location, overriding the default
    pub deploy_config: Option<PathBuf>,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: output.into(),
            deploy_config: None,
        }
    }

    pub fn root_dir(&self) -> Dir {
        Dir::new(&self.root)
    }

    pub fn output_dir(&self) -> Dir {
        Dir::new(&self.output)
    }

    fn state_dir(&self) -> Dir {
        Dir::new(self.root.join(STATE_DIR_NAME))
    }

    /// Build cache, which may not exist
    pub fn cache_dir(&self) -> Dir {
        self.state_dir().subdir("cache")
    }

    /// Persisted deploy target, `<root>/.siteship/deploy.json` by default
    pub fn deploy_config_file(&self) -> File {
        match &self.deploy_config {
            Some(path) => File::new(path),
            None => self.state_dir().file("deploy.json"),
        }
    }

    /// Manifest written by the build pipeline
    pub fn build_manifest_file(&self) -> File {
        self.cache_dir().file("_build.json")
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new("src", "dist")
    }
}

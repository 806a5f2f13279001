//! Build freshness checks before a local deploy

use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::deploy::effects::DeployEffects;
use crate::deploy::options::ForceMode;
use crate::errors::CliError;
use crate::filesys::dir::Dir;
use crate::storage::layout::ProjectLayout;
use crate::utils::format_age;

/// Builds older than this prompt for a rebuild
pub const BUILD_AGE_WARNING: Duration = Duration::from_secs(5 * 60);

/// Modification times relevant to freshness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildTimes {
    /// Newest source or cache file
    pub source_newest: Option<SystemTime>,

    /// Oldest build output file, `None` when there is no build
    pub build_oldest: Option<SystemTime>,
}

/// What to do before uploading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPlan {
    /// Build without asking
    Build,

    /// Deploy the existing output as is
    UseExisting,

    /// No build yet; ask whether to build now
    AskMissing,

    /// Existing build may be stale; ask whether to rebuild
    AskStale { source_newer: bool, age: Duration },
}

async fn mtime_range_if_present(
    dir: &Dir,
    skip_hidden_dirs: bool,
) -> Result<Option<(SystemTime, SystemTime)>, CliError> {
    match dir.mtime_range(skip_hidden_dirs).await {
        Ok(range) => Ok(range),
        Err(e) if e.is_missing_file() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Scan the source root, build cache and output root
pub async fn scan_build_times(layout: &ProjectLayout) -> Result<BuildTimes, CliError> {
    let build_oldest = mtime_range_if_present(&layout.output_dir(), false)
        .await?
        .map(|(min, _)| min);

    // hidden directories under the root hold state, the cache is added back
    let source = mtime_range_if_present(&layout.root_dir(), true).await?;
    let cache = mtime_range_if_present(&layout.cache_dir(), false).await?;
    let source_newest = match (source, cache) {
        (Some((_, a)), Some((_, b))) => Some(a.max(b)),
        (Some((_, a)), None) | (None, Some((_, a))) => Some(a),
        (None, None) => None,
    };

    Ok(BuildTimes {
        source_newest,
        build_oldest,
    })
}

/// Decide how to get a deployable build
pub fn plan_build(
    times: &BuildTimes,
    force: Option<ForceMode>,
    interactive: bool,
    now: SystemTime,
) -> Result<BuildPlan, CliError> {
    let Some(build_oldest) = times.build_oldest else {
        return match force {
            Some(ForceMode::Deploy) => Err(CliError::new(
                "No build files found. Build the app first or drop --force deploy.",
            )),
            Some(ForceMode::Build) => Ok(BuildPlan::Build),
            None if interactive => Ok(BuildPlan::AskMissing),
            None => Ok(BuildPlan::Build),
        };
    };

    match force {
        Some(ForceMode::Build) => return Ok(BuildPlan::Build),
        Some(ForceMode::Deploy) => return Ok(BuildPlan::UseExisting),
        None if !interactive => return Ok(BuildPlan::UseExisting),
        None => {}
    }

    let source_newer = times
        .source_newest
        .is_some_and(|newest| newest > build_oldest);
    let age = now.duration_since(build_oldest).unwrap_or_default();

    if source_newer || age > BUILD_AGE_WARNING {
        Ok(BuildPlan::AskStale { source_newer, age })
    } else {
        Ok(BuildPlan::UseExisting)
    }
}

/// Make sure the output directory holds a build worth deploying, running the
/// build collaborator when needed.
pub async fn prepare_build(
    effects: &dyn DeployEffects,
    layout: &ProjectLayout,
    force: Option<ForceMode>,
) -> Result<(), CliError> {
    let times = scan_build_times(layout).await?;
    let plan = plan_build(&times, force, effects.is_interactive(), effects.now())?;
    debug!("Build times {:?}, plan {:?}", times, plan);

    let build = match plan {
        BuildPlan::Build => true,
        BuildPlan::UseExisting => false,
        BuildPlan::AskMissing => {
            if !effects.prompt().confirm("No build files found. Do you want to build the app now?", true)? {
                return Err(CliError::canceled());
            }
            true
        }
        BuildPlan::AskStale { source_newer, age } => {
            let message = if source_newer {
                format!(
                    "Your source files have changed since you built {}. Do you want to build again?",
                    format_age(age)
                )
            } else {
                format!("You built this app {}. Do you want to build again?", format_age(age))
            };
            effects.prompt().confirm(&message, source_newer)?
        }
    };

    if build {
        effects.step("Building");
        effects.build(layout).await?;
    } else if let Some(oldest) = times.build_oldest {
        let age = effects.now().duration_since(oldest).unwrap_or_default();
        effects.note(&format!("Deploying the build from {}", format_age(age)));
    }
    Ok(())
}

/// Files of the build output, relative to the output root
pub async fn find_build_files(layout: &ProjectLayout) -> Result<Vec<String>, CliError> {
    let output = layout.output_dir();
    let files = match output.walk_files(false).await {
        Ok(files) => files,
        Err(e) if e.is_missing_file() => Vec::new(),
        Err(e) => return Err(e),
    };
    if files.is_empty() {
        return Err(CliError::new(format!(
            "No build files found at {}",
            output.path().display()
        )));
    }
    Ok(files)
}

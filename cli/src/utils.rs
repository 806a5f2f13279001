//! Utility functions

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Version information for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Base64-encoded SHA-512 digest of `data`
pub fn sha512_base64(data: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data);
    STANDARD.encode(hasher.finalize())
}

/// Slugs are lowercase ASCII letters, digits and hyphens
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Workspace logins are slugs with an optional leading `@`
pub fn is_valid_login(s: &str) -> bool {
    is_valid_slug(s.strip_prefix('@').unwrap_or(s))
}

/// Turn a title into a slug suggestion: `My Great App!` -> `my-great-app`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Human readable age, e.g. `3 minutes ago`
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    let (value, unit) = match secs {
        0..=59 => return "just now".to_string(),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if value == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", value, unit)
    }
}

/// Keep the tail of a long path so progress lines fit a terminal
pub fn truncate_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars || max_chars < 2 {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - (max_chars - 1)).collect();
    format!("…{}", tail)
}

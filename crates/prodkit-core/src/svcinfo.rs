//! Service identity (build date, commit, version).
//!
//! Values baked in at build time win; the environment is consulted only when
//! the compiled value is absent or empty.

use serde::Serialize;

pub const COMMIT_SHA_ENV: &str = "COMMIT_SHA";
pub const BUILD_DATE_ENV: &str = "BUILD_DATE";
pub const VERSION_ENV: &str = "VERSION";

/// Build-time identity supplied by the embedding binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMetadata {
    pub commit_sha: Option<String>,
    pub build_date: Option<String>,
    pub version: Option<String>,
}

impl BuildMetadata {
    /// Identity captured from the build environment of this crate.
    ///
    /// Binaries that want their own `COMMIT_SHA` etc. should build a
    /// `BuildMetadata` with `option_env!` in their own crate instead.
    pub fn compiled() -> Self {
        Self {
            commit_sha: option_env!("COMMIT_SHA").map(str::to_string),
            build_date: option_env!("BUILD_DATE").map(str::to_string),
            version: option_env!("VERSION").map(str::to_string),
        }
    }
}

/// Resolved identity of the running service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub build_date: String,
    pub commit_sha: String,
    pub version: String,
}

impl ServiceInfo {
    /// Resolve against the process environment.
    pub fn resolve(meta: &BuildMetadata) -> Self {
        Self::resolve_with(meta, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(meta: &BuildMetadata, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |compiled: &Option<String>, key: &str| -> String {
            match compiled.as_deref() {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => lookup(key).filter(|v| !v.is_empty()).unwrap_or_default(),
            }
        };

        Self {
            build_date: pick(&meta.build_date, BUILD_DATE_ENV),
            commit_sha: pick(&meta.commit_sha, COMMIT_SHA_ENV),
            version: pick(&meta.version, VERSION_ENV),
        }
    }

    /// Labels for the `info` gauge; empty values are left out.
    pub fn tags(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.commit_sha.is_empty() {
            out.push(crate::tags::tag("commit", &self.commit_sha));
        }
        if !self.build_date.is_empty() {
            out.push(crate::tags::tag("build_date", &self.build_date));
        }
        if !self.version.is_empty() {
            out.push(crate::tags::tag("version", &self.version));
        }
        out
    }
}

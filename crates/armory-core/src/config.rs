//! Armory repository configuration (`.armory.toml`).
//!
//! Defines the single immutable configuration record threaded into every
//! component at startup: the store root, release/scratch directories, the
//! configured VCS binary, and audit/download tuning. No component reads
//! process-wide statics or environment variables of its own — everything
//! flows through [`ArmoryConfig`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level armory configuration, parsed from `<store_root>/.armory.toml`.
///
/// Missing file → all defaults (no error); this mirrors the store's
/// first-run story where `armory init` has not yet written the file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
#[derive(Default)]
pub struct ArmoryConfig {
    /// VCS settings for the transactional store.
    #[serde(default)]
    pub vcs: VcsConfig,

    /// Release composition settings.
    #[serde(default)]
    pub release: ReleaseConfig,

    /// Audit transport settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ArmoryConfig {
    /// Load configuration from `<store_root>/.armory.toml`.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(store_root: &Path) -> Result<Self, crate::error::ArmoryError> {
        let path = store_root.join(".armory.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| {
            crate::error::ArmoryError::Io {
                path: path.clone(),
                source,
            }
        })?;
        toml::from_str(&content).map_err(|e| crate::error::ArmoryError::InvalidInput {
            field: "config",
            reason: format!("{} ({})", e, path.display()),
        })
    }
}

// ---------------------------------------------------------------------------
// VcsConfig
// ---------------------------------------------------------------------------

/// Version-control settings for the transactional store.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VcsConfig {
    /// Name or path of the git-compatible binary to shell out to.
    #[serde(default = "default_vcs_binary")]
    pub binary: String,

    /// Name of the trunk (accepted-history) branch.
    #[serde(default = "default_trunk")]
    pub trunk: String,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            binary: default_vcs_binary(),
            trunk: default_trunk(),
        }
    }
}

fn default_vcs_binary() -> String {
    "git".to_owned()
}

fn default_trunk() -> String {
    "trunk".to_owned()
}

// ---------------------------------------------------------------------------
// ReleaseConfig
// ---------------------------------------------------------------------------

/// Release composition settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Directory where generated `.tgz` releases are written.
    #[serde(default = "default_release_dir")]
    pub output_dir: PathBuf,

    /// Attempts for a `download`-type install step (§4.5).
    #[serde(default = "default_download_attempts")]
    pub download_attempts: u32,

    /// Delay in seconds between download attempts.
    #[serde(default = "default_download_delay_secs")]
    pub download_delay_secs: u64,
}

impl ReleaseConfig {
    /// The configured download retry delay as a [`Duration`].
    #[must_use]
    pub const fn download_delay(&self) -> Duration {
        Duration::from_secs(self.download_delay_secs)
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            output_dir: default_release_dir(),
            download_attempts: default_download_attempts(),
            download_delay_secs: default_download_delay_secs(),
        }
    }
}

fn default_release_dir() -> PathBuf {
    PathBuf::from("release")
}

const fn default_download_attempts() -> u32 {
    1
}

const fn default_download_delay_secs() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// AuditConfig
// ---------------------------------------------------------------------------

/// Audit transport settings (§9 Open Questions: pluggable fetch interface).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Command template used to fetch a remote file, with `{host}` and
    /// `{path}` placeholders substituted before execution. The command must
    /// write the fetched file's bytes to stdout.
    #[serde(default = "default_fetch_command")]
    pub fetch_command: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            fetch_command: default_fetch_command(),
        }
    }
}

fn default_fetch_command() -> String {
    "ssh {host} cat {path}".to_owned()
}

impl fmt::Display for ArmoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vcs={} trunk={} release_dir={} fetch=\"{}\"",
            self.vcs.binary,
            self.vcs.trunk,
            self.release.output_dir.display(),
            self.audit.fetch_command
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ArmoryConfig::load(dir.path()).unwrap();
        assert_eq!(config.vcs.binary, "git");
        assert_eq!(config.vcs.trunk, "trunk");
        assert_eq!(config.release.download_attempts, 1);
    }

    #[test]
    fn parses_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".armory.toml"),
            "[vcs]\nbinary = \"git2\"\n\n[release]\noutput_dir = \"out\"\n",
        )
        .unwrap();
        let config = ArmoryConfig::load(dir.path()).unwrap();
        assert_eq!(config.vcs.binary, "git2");
        assert_eq!(config.release.output_dir, PathBuf::from("out"));
    }
}

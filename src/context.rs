//! The per-invocation context threaded into every command: the store root,
//! the loaded configuration, and a `Store` handle over a `CliGitRepo`. Built
//! once in `main` and passed by reference, never rebuilt mid-command (§9
//! Design Notes: one immutable configuration record, no process globals).

use std::path::{Path, PathBuf};

use armory_core::{ArmoryConfig, Store};
use armory_git::CliGitRepo;

pub struct AppContext {
    pub root: PathBuf,
    pub config: ArmoryConfig,
    pub store: Store,
}

impl AppContext {
    /// Load configuration and open the store at `root`.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be parsed.
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let config = ArmoryConfig::load(root)?;
        let repo = CliGitRepo::with_binary(root.to_path_buf(), config.vcs.binary.clone());
        let store = Store::new(root.to_path_buf(), Box::new(repo), config.vcs.trunk.clone());
        Ok(Self { root: root.to_path_buf(), config, store })
    }
}

/// Resolve the current operator's identity (§6: `SUDO_USER` environment
/// variable). The interactive prompt the source falls back to is the
/// prompt loop this rewrite treats as an external collaborator (§1); a
/// missing `SUDO_USER` is surfaced as an actionable error instead.
///
/// # Errors
/// Returns an error if `SUDO_USER` is not set.
pub fn operator() -> anyhow::Result<String> {
    std::env::var("SUDO_USER")
        .map_err(|_| anyhow::anyhow!("SUDO_USER is not set; re-run with sudo, or export SUDO_USER=<you>"))
}

/// Verify the process is running as the superuser (§6 precondition).
///
/// Reads the effective UID from `/proc/self/status` rather than calling
/// `geteuid(2)` through FFI, so this crate needs no `unsafe` code.
///
/// # Errors
/// Returns [`armory_core::ArmoryError::NotRoot`] if the effective UID is not 0.
pub fn require_root() -> Result<(), armory_core::ArmoryError> {
    let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
    let euid = status
        .lines()
        .find(|l| l.starts_with("Uid:"))
        .and_then(|l| l.split_whitespace().nth(2))
        .and_then(|s| s.parse::<u32>().ok());
    if euid != Some(0) {
        return Err(armory_core::ArmoryError::NotRoot);
    }
    Ok(())
}

//! Error type for the git abstraction layer.

use thiserror::Error;

/// Errors produced by a [`crate::GitRepo`] implementation.
#[derive(Debug, Error)]
pub enum GitError {
    /// The configured VCS binary could not be located or spawned.
    #[error("'{binary}' was not found on PATH.\n  To fix: install git and ensure '{binary}' is executable from PATH.")]
    BinaryNotFound {
        /// The binary name that was looked up (e.g. `"git"`).
        binary: String,
    },
    /// A git command exited with a non-zero status.
    #[error("`{command}` failed (exit code {exit_code:?}): {stderr}")]
    CommandFailed {
        /// The command line that was run, for diagnostics.
        command: String,
        /// Captured stderr, trimmed.
        stderr: String,
        /// Process exit code, if available.
        exit_code: Option<i32>,
    },
    /// An I/O error occurred while spawning or communicating with git.
    #[error("I/O error talking to git: {0}")]
    Io(#[from] std::io::Error),
    /// The named branch does not exist.
    #[error("branch '{name}' does not exist")]
    BranchNotFound {
        /// The branch name that was not found.
        name: String,
    },
    /// The directory is not inside a git work tree.
    #[error("directory is not inside a git work tree")]
    NotARepository,
}

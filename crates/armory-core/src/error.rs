//! Unified error type for armory's store and model layers.
//!
//! Error messages are written for an operator at a terminal: each variant
//! states what happened and, where it helps, what command fixes it. No
//! variant here is specific to git — git-layer failures are wrapped as
//! [`ArmoryError::Store`].

use std::fmt;
use std::path::PathBuf;

use armory_git::GitError;

/// Unified error type for armory operations.
#[derive(Debug)]
pub enum ArmoryError {
    /// Invoked by a non-privileged user when root is required.
    NotRoot,
    /// The store directory does not exist and initialization was declined.
    Uninitialized,
    /// Another user's work branch is open; only one may exist at a time.
    Busy {
        /// The branch name currently holding the lock.
        holder: String,
    },
    /// A commit/cancel/diff was attempted from trunk or someone else's branch.
    NotOnYourBranch {
        /// The branch the caller expected to be on.
        expected: String,
        /// The branch actually checked out.
        actual: String,
    },
    /// A create violated a uniqueness constraint (primary or secondary key).
    DuplicateKey {
        /// The entity kind (e.g. "application").
        kind: &'static str,
        /// The key value that already exists.
        key: String,
    },
    /// A reference pointed at a key that does not exist.
    UnknownEntity {
        /// The entity kind referenced.
        kind: &'static str,
        /// The missing key.
        key: String,
    },
    /// A field failed format/regex/enum validation.
    InvalidInput {
        /// What was being validated.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// Trunk was modified by something other than this tool since the work
    /// branch was created; the squash-merge was refused.
    ConflictOnMerge {
        /// Description of the conflicting state.
        detail: String,
    },
    /// An environment patch failed to apply to a template.
    PatchFailed {
        /// The file the patch was for.
        file: String,
        /// The environment whose patch failed.
        environment: String,
    },
    /// A template referenced a `{% kind.name %}` binding with no value.
    UndefinedVariable {
        /// The unresolved token, e.g. `"constant.timeout"`.
        token: String,
    },
    /// A remote copy for audit or a `copy`-type install step failed.
    TransportFailed {
        /// What was being fetched or copied.
        detail: String,
    },
    /// The underlying git repository reported an error.
    Store(GitError),
    /// A filesystem operation on the store failed.
    Io {
        /// The path the operation was attempted on.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl fmt::Display for ArmoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRoot => write!(f, "this command must be run as the superuser"),
            Self::Uninitialized => write!(
                f,
                "store is not initialized.\n  To fix: run `armory init`"
            ),
            Self::Busy { holder } => write!(
                f,
                "another change is in progress on branch '{holder}'.\n  Wait for it to be committed or canceled."
            ),
            Self::NotOnYourBranch { expected, actual } => write!(
                f,
                "expected to be on branch '{expected}' but on '{actual}'.\n  Run `armory begin` or switch back to your branch."
            ),
            Self::DuplicateKey { kind, key } => {
                write!(f, "{kind} '{key}' already exists")
            }
            Self::UnknownEntity { kind, key } => {
                write!(f, "no {kind} named '{key}'")
            }
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid {field}: {reason}")
            }
            Self::ConflictOnMerge { detail } => write!(
                f,
                "trunk was modified outside the tool: {detail}\n  Your branch is left in place; resolve manually."
            ),
            Self::PatchFailed { file, environment } => write!(
                f,
                "patch for '{file}' in environment '{environment}' does not apply"
            ),
            Self::UndefinedVariable { token } => {
                write!(f, "undefined template variable '{token}'")
            }
            Self::TransportFailed { detail } => write!(f, "transport failed: {detail}"),
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Io { path, source } => {
                write!(f, "I/O error at {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ArmoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<GitError> for ArmoryError {
    fn from(e: GitError) -> Self {
        Self::Store(e)
    }
}

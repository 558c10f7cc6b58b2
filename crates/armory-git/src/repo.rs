//! The [`GitRepo`] trait — the single abstraction boundary between armory and git.
//!
//! Armory's store layer uses git branches as a write lock (§4.1 of the
//! design): a "work branch" holds one operator's pending changes, and
//! committing it squash-merges into the trunk branch. Every operation that
//! needs to talk to git goes through this trait so the store can be tested
//! against a real repository without the rest of the codebase caring how
//! that repository is reached.

use crate::error::GitError;

/// The git abstraction trait used by armory's store layer.
///
/// Implementations may shell out to the `git` binary (the shipped
/// implementation) or be an in-memory test double. The trait is object-safe
/// so callers can hold `&dyn GitRepo`.
pub trait GitRepo {
    /// Initialize a new git repository at the implementation's root, if one
    /// does not already exist. No-op if already a repository.
    fn init(&self) -> Result<(), GitError>;

    /// Return the name of the currently checked-out branch.
    fn current_branch(&self) -> Result<String, GitError>;

    /// Return `true` if a local branch with this name exists.
    fn branch_exists(&self, name: &str) -> Result<bool, GitError>;

    /// Create a new branch named `name` starting at `from`, without checking it out.
    fn create_branch(&self, name: &str, from: &str) -> Result<(), GitError>;

    /// Check out an existing branch, updating the working tree to match it.
    fn checkout(&self, name: &str) -> Result<(), GitError>;

    /// Delete a local branch. Fails if the branch is currently checked out.
    fn delete_branch(&self, name: &str) -> Result<(), GitError>;

    /// Stage every change in the working tree (adds, modifications, deletions).
    fn stage_all(&self) -> Result<(), GitError>;

    /// Returns `true` if the working tree or index differs from `HEAD`.
    fn has_changes(&self) -> Result<bool, GitError>;

    /// Commit the staged changes on the current branch and return the new commit's hash.
    fn commit(&self, message: &str) -> Result<String, GitError>;

    /// Produce a unified diff between two revisions (branch names, tags, or commit hashes).
    fn diff(&self, from: &str, to: &str) -> Result<String, GitError>;

    /// Resolve a revision to its full commit hash, or `None` if it cannot be resolved.
    fn rev_parse(&self, rev: &str) -> Result<Option<String>, GitError>;

    /// Squash-merge `branch` into the currently checked-out branch as a single new commit.
    fn squash_merge(&self, branch: &str, message: &str) -> Result<(), GitError>;

    /// Discard all working-tree and index changes and reset the current branch to `target`.
    fn reset_hard(&self, target: &str) -> Result<(), GitError>;

    /// Stash away any uncommitted changes so a branch switch can proceed cleanly.
    /// Returns `true` if anything was stashed.
    fn stash_save(&self) -> Result<bool, GitError>;
}

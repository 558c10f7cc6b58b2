//! The transactional store (§4.1): a git-backed "database" where exactly one
//! work branch may be open at a time. A caller begins work, edits entity
//! files on their own branch, then commits (squash-merged into trunk) or
//! cancels (discarded). Branch existence *is* the lock — there is no
//! separate lock file to get out of sync with reality.

use std::path::{Path, PathBuf};

use armory_git::GitRepo;
use tracing::{info, warn};

use crate::error::ArmoryError;

/// A git-backed store rooted at a working tree.
///
/// Holds no mutable state of its own beyond the repository handle; the
/// branch a caller is on *is* the state, read fresh from git on every call.
pub struct Store {
    root: PathBuf,
    repo: Box<dyn GitRepo>,
    trunk: String,
}

impl Store {
    /// Wrap an existing repository rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf, repo: Box<dyn GitRepo>, trunk: impl Into<String>) -> Self {
        Self {
            root,
            repo,
            trunk: trunk.into(),
        }
    }

    /// The store's working-tree root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configured trunk branch name.
    #[must_use]
    pub fn trunk(&self) -> &str {
        &self.trunk
    }

    /// Initialize a brand-new store: create the working tree, seed empty
    /// entity files, and make the first commit on trunk.
    ///
    /// Idempotent: calling this on an already-initialized store is a no-op
    /// beyond seeding any entity files that happen to be missing.
    ///
    /// # Errors
    /// Returns an error if the git repository or entity files cannot be created.
    pub fn init(&self) -> Result<(), ArmoryError> {
        if self.repo.rev_parse("HEAD")?.is_none() {
            self.repo.init()?;
        }
        crate::layout::seed_empty_store(&self.root).map_err(|source| ArmoryError::Io {
            path: self.root.clone(),
            source,
        })?;
        if self.repo.has_changes()? {
            self.repo.stage_all()?;
            self.repo.commit("armory init")?;
            info!(root = %self.root.display(), "initialized store");
        }
        Ok(())
    }

    /// The branch name a given user's work happens on.
    fn work_branch(user: &str) -> String {
        format!("armory/{user}")
    }

    /// Begin a work transaction for `user`.
    ///
    /// If trunk is checked out, creates and checks out a fresh work branch.
    /// If the user's own work branch is already checked out, resumes it. If
    /// any other work branch exists, refuses with [`ArmoryError::Busy`] —
    /// only one change may be in flight across the whole store at a time
    /// (§4.1, §5: branch-as-lock) — unless `force` is set, in which case the
    /// transaction is opened against whatever branch is actually checked
    /// out, regardless of who holds it.
    ///
    /// # Errors
    /// Returns [`ArmoryError::Busy`] if another work branch exists and
    /// `force` is `false`, or a store error if git operations fail.
    pub fn begin_modify(&self, user: &str, force: bool) -> Result<Transaction<'_>, ArmoryError> {
        let branch = Self::work_branch(user);
        let current = self.repo.current_branch()?;

        if current == branch {
            let base = self.repo.rev_parse(&self.trunk)?.unwrap_or_default();
            return Ok(Transaction {
                store: self,
                user: user.to_owned(),
                branch,
                base_trunk_oid: base,
            });
        }

        if current != self.trunk {
            if force {
                let base = self.repo.rev_parse(&self.trunk)?.unwrap_or_default();
                return Ok(Transaction {
                    store: self,
                    user: user.to_owned(),
                    branch: current,
                    base_trunk_oid: base,
                });
            }
            return Err(ArmoryError::Busy { holder: current });
        }

        if self.repo.branch_exists(&branch)? {
            // Same user reopening after a crash: branch survives, trunk is
            // still checked out. Resume it rather than erroring.
            self.repo.checkout(&branch)?;
        } else {
            self.repo.create_branch(&branch, &self.trunk)?;
            self.repo.checkout(&branch)?;
        }

        let base = self.repo.rev_parse(&self.trunk)?.unwrap_or_default();
        Ok(Transaction {
            store: self,
            user: user.to_owned(),
            branch,
            base_trunk_oid: base,
        })
    }

    /// True if any work branch besides trunk is currently checked out.
    ///
    /// # Errors
    /// Returns an error if the current branch cannot be determined.
    pub fn is_busy(&self) -> Result<Option<String>, ArmoryError> {
        let current = self.repo.current_branch()?;
        if current == self.trunk {
            Ok(None)
        } else {
            Ok(Some(current))
        }
    }
}

/// An open work transaction for one user, holding the store's branch lock.
pub struct Transaction<'a> {
    store: &'a Store,
    user: String,
    branch: String,
    base_trunk_oid: String,
}

impl Transaction<'_> {
    /// The work branch this transaction is on.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// The user this transaction belongs to.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Verify the repository is actually sitting on this transaction's
    /// branch. Catalog mutations call this before touching any file.
    ///
    /// # Errors
    /// Returns [`ArmoryError::NotOnYourBranch`] if the working tree has
    /// moved since `begin_modify`.
    pub fn ensure_active(&self) -> Result<(), ArmoryError> {
        let actual = self.store.repo.current_branch()?;
        if actual != self.branch {
            return Err(ArmoryError::NotOnYourBranch {
                expected: self.branch.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Record that `path` was touched during this transaction.
    ///
    /// A no-op beyond the active-branch check: [`Transaction::commit`]
    /// stages the whole working tree (`git add -A`), matching the
    /// underlying repository's own staging convention, so there is nothing
    /// incremental to track here. Kept as an explicit step so call sites
    /// read the same way §4.1 describes them.
    ///
    /// # Errors
    /// Returns [`ArmoryError::NotOnYourBranch`] if this transaction is stale.
    pub fn stage_file(&self, _path: &Path) -> Result<(), ArmoryError> {
        self.ensure_active()
    }

    /// Unified diff of this transaction's pending changes against trunk.
    ///
    /// # Errors
    /// Returns an error if the diff cannot be computed.
    pub fn diff_trunk(&self) -> Result<String, ArmoryError> {
        self.ensure_active()?;
        Ok(self.store.repo.diff(&self.store.trunk, &self.branch)?)
    }

    /// Commit pending changes: squash-merge the work branch into trunk and
    /// delete it, releasing the lock.
    ///
    /// If trunk has moved since [`Store::begin_modify`] was called (someone
    /// else committed outside this tool, or a previous run left trunk in an
    /// unexpected state), the merge is refused with
    /// [`ArmoryError::ConflictOnMerge`] and the work branch is left in place
    /// for manual reconciliation rather than silently merged or discarded.
    ///
    /// If there are no pending changes, this is a clean no-op: the branch is
    /// dropped and trunk is checked back out without creating an empty
    /// commit on trunk.
    ///
    /// # Errors
    /// Returns [`ArmoryError::NotOnYourBranch`] if stale, or
    /// [`ArmoryError::ConflictOnMerge`] if trunk moved underneath this
    /// transaction.
    pub fn commit(self, message: &str) -> Result<String, ArmoryError> {
        self.ensure_active()?;
        let repo = &self.store.repo;

        if !repo.has_changes()? {
            repo.checkout(&self.store.trunk)?;
            repo.delete_branch(&self.branch)?;
            return repo.rev_parse(&self.store.trunk)?.ok_or(ArmoryError::Store(
                armory_git::GitError::NotARepository,
            ));
        }

        repo.stage_all()?;
        repo.commit(message)?;

        let current_trunk = repo.rev_parse(&self.store.trunk)?.unwrap_or_default();
        if current_trunk != self.base_trunk_oid {
            warn!(
                branch = %self.branch,
                expected = %self.base_trunk_oid,
                found = %current_trunk,
                "trunk moved since begin_modify; refusing squash-merge"
            );
            repo.checkout(&self.branch)?;
            return Err(ArmoryError::ConflictOnMerge {
                detail: format!(
                    "trunk is at {current_trunk} but this change started from {}",
                    self.base_trunk_oid
                ),
            });
        }

        repo.checkout(&self.store.trunk)?;
        repo.squash_merge(&self.branch, message)?;
        repo.delete_branch(&self.branch)?;
        let oid = repo
            .rev_parse(&self.store.trunk)?
            .ok_or(ArmoryError::Store(armory_git::GitError::NotARepository))?;
        info!(branch = %self.branch, oid = %oid, "committed work");
        Ok(oid)
    }

    /// Cancel this transaction: discard all pending changes and delete the
    /// work branch, releasing the lock.
    ///
    /// `force` allows canceling a branch whose working tree is dirty with
    /// changes this process did not itself make (e.g. resumed after a
    /// crash); without it, an unexpectedly dirty tree is left alone.
    ///
    /// # Errors
    /// Returns [`ArmoryError::NotOnYourBranch`] if stale.
    pub fn cancel(self, force: bool) -> Result<(), ArmoryError> {
        self.ensure_active()?;
        let repo = &self.store.repo;
        if force || repo.has_changes()? {
            let target = repo
                .rev_parse(&self.branch)?
                .ok_or(ArmoryError::Store(armory_git::GitError::NotARepository))?;
            repo.reset_hard(&target)?;
        }
        repo.checkout(&self.store.trunk)?;
        repo.delete_branch(&self.branch)?;
        info!(branch = %self.branch, "canceled work");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armory_git::CliGitRepo;

    fn init_store(dir: &Path) -> Store {
        let repo = CliGitRepo::new(dir.to_path_buf());
        repo.init().unwrap();
        std::process::Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir)
            .output()
            .unwrap();
        std::process::Command::new("git")
            .args(["config", "user.name", "test"])
            .current_dir(dir)
            .output()
            .unwrap();
        let store = Store::new(dir.to_path_buf(), Box::new(repo), "trunk");
        store.init().unwrap();
        store
    }

    #[test]
    fn begin_modify_creates_branch_from_trunk() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        assert_eq!(tx.branch(), "armory/alice");
    }

    #[test]
    fn second_user_is_busy() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let _tx = store.begin_modify("alice", false).unwrap();
        let err = store.begin_modify("bob", false).unwrap_err();
        assert!(matches!(err, ArmoryError::Busy { holder } if holder == "armory/alice"));
    }

    #[test]
    fn commit_with_no_changes_is_clean_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        tx.commit("no-op").unwrap();
        assert_eq!(store.is_busy().unwrap(), None);
    }

    #[test]
    fn commit_merges_changes_into_trunk() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        std::fs::write(dir.path().join("application"), "web,main,1\n").unwrap();
        tx.stage_file(Path::new("application")).unwrap();
        tx.commit("add web application").unwrap();
        assert_eq!(store.is_busy().unwrap(), None);
        let content = std::fs::read_to_string(dir.path().join("application")).unwrap();
        assert_eq!(content, "web,main,1\n");
    }

    #[test]
    fn cancel_discards_changes() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        std::fs::write(dir.path().join("application"), "web,main,1\n").unwrap();
        tx.cancel(false).unwrap();
        assert_eq!(store.is_busy().unwrap(), None);
        let content = std::fs::read_to_string(dir.path().join("application")).unwrap();
        assert_eq!(content, "");
    }

    #[test]
    fn commit_from_stale_branch_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        let repo = CliGitRepo::new(dir.path().to_path_buf());
        repo.checkout("trunk").unwrap();
        let err = tx.commit("should fail").unwrap_err();
        assert!(matches!(err, ArmoryError::NotOnYourBranch { .. }));
    }
}

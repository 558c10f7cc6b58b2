//! A [`GitRepo`] implementation that shells out to the system `git` binary.
//!
//! This is the only implementation shipped with armory: the tool's
//! precondition (§6) requires a version-control binary on `PATH`, so there is
//! no embedded git object database to maintain.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::GitError;
use crate::repo::GitRepo;

/// A git repository reached by invoking a `git`-compatible binary as a subprocess.
pub struct CliGitRepo {
    /// Working directory to run git commands in (the store root).
    root: PathBuf,
    /// Name or path of the git binary (default `"git"`, configurable via `ArmoryConfig`).
    binary: String,
}

impl CliGitRepo {
    /// Create a repo handle rooted at `root`, using the default `git` binary.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            binary: "git".to_owned(),
        }
    }

    /// Create a repo handle using an explicitly configured VCS binary.
    pub fn with_binary(root: impl Into<PathBuf>, binary: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            binary: binary.into(),
        }
    }

    /// The directory this repo operates in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output, GitError> {
        Command::new(&self.binary)
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::BinaryNotFound {
                        binary: self.binary.clone(),
                    }
                } else {
                    GitError::Io(e)
                }
            })
    }

    fn stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(GitError::CommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
                exit_code: output.status.code(),
            })
        }
    }

    fn ok(&self, args: &[&str]) -> Result<(), GitError> {
        self.stdout(args).map(|_| ())
    }
}

impl GitRepo for CliGitRepo {
    fn init(&self) -> Result<(), GitError> {
        if self.root.join(".git").exists() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.root)?;
        self.ok(&["init", "--initial-branch=trunk"])?;
        // Older git versions ignore --initial-branch; make sure trunk exists.
        if self.rev_parse("trunk")?.is_none() && self.rev_parse("HEAD")?.is_some() {
            self.ok(&["branch", "-m", "trunk"])?;
        }
        Ok(())
    }

    fn current_branch(&self) -> Result<String, GitError> {
        Ok(self
            .stdout(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_owned())
    }

    fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        let refname = format!("refs/heads/{name}");
        Ok(self.run(&["show-ref", "--verify", "--quiet", &refname])?
            .status
            .success())
    }

    fn create_branch(&self, name: &str, from: &str) -> Result<(), GitError> {
        self.ok(&["branch", name, from])
    }

    fn checkout(&self, name: &str) -> Result<(), GitError> {
        if !self.branch_exists(name)? {
            return Err(GitError::BranchNotFound {
                name: name.to_owned(),
            });
        }
        self.ok(&["checkout", name])
    }

    fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        self.ok(&["branch", "-D", name])
    }

    fn stage_all(&self) -> Result<(), GitError> {
        self.ok(&["add", "-A"])
    }

    fn has_changes(&self) -> Result<bool, GitError> {
        let status = self.stdout(&["status", "--porcelain"])?;
        Ok(!status.trim().is_empty())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        self.ok(&["commit", "--allow-empty", "-m", message])?;
        Ok(self.stdout(&["rev-parse", "HEAD"])?.trim().to_owned())
    }

    fn diff(&self, from: &str, to: &str) -> Result<String, GitError> {
        self.stdout(&["diff", from, to])
    }

    fn rev_parse(&self, rev: &str) -> Result<Option<String>, GitError> {
        let output = self.run(&["rev-parse", "--verify", "--quiet", rev])?;
        if output.status.success() {
            Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_owned(),
            ))
        } else {
            Ok(None)
        }
    }

    fn squash_merge(&self, branch: &str, message: &str) -> Result<(), GitError> {
        self.ok(&["merge", "--squash", branch])?;
        self.stage_all()?;
        self.ok(&["commit", "--allow-empty", "-m", message])
    }

    fn reset_hard(&self, target: &str) -> Result<(), GitError> {
        self.ok(&["reset", "--hard", target])?;
        self.ok(&["clean", "-fd"])
    }

    fn stash_save(&self) -> Result<bool, GitError> {
        if !self.has_changes()? {
            return Ok(false);
        }
        self.ok(&["stash", "push", "--include-untracked"])?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CliGitRepo) {
        let dir = TempDir::new().unwrap();
        let repo = CliGitRepo::new(dir.path());
        repo.init().unwrap();
        Command::new("git")
            .args(["config", "user.email", "test@armory.invalid"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Armory Test"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        (dir, repo)
    }

    #[test]
    fn init_creates_trunk_branch() {
        let (_dir, repo) = setup();
        std::fs::write(repo.root().join("application"), "").unwrap();
        repo.stage_all().unwrap();
        repo.commit("seed").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "trunk");
    }

    #[test]
    fn branch_create_checkout_delete_roundtrip() {
        let (_dir, repo) = setup();
        std::fs::write(repo.root().join("application"), "").unwrap();
        repo.stage_all().unwrap();
        repo.commit("seed").unwrap();

        assert!(!repo.branch_exists("alice").unwrap());
        repo.create_branch("alice", "trunk").unwrap();
        assert!(repo.branch_exists("alice").unwrap());

        repo.checkout("alice").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "alice");

        repo.checkout("trunk").unwrap();
        repo.delete_branch("alice").unwrap();
        assert!(!repo.branch_exists("alice").unwrap());
    }

    #[test]
    fn squash_merge_brings_changes_to_trunk() {
        let (_dir, repo) = setup();
        std::fs::write(repo.root().join("application"), "").unwrap();
        repo.stage_all().unwrap();
        repo.commit("seed").unwrap();

        repo.create_branch("bob", "trunk").unwrap();
        repo.checkout("bob").unwrap();
        std::fs::write(repo.root().join("application"), "web\n").unwrap();
        repo.stage_all().unwrap();
        repo.commit("add web").unwrap();

        repo.checkout("trunk").unwrap();
        repo.squash_merge("bob", "merge bob").unwrap();
        let content = std::fs::read_to_string(repo.root().join("application")).unwrap();
        assert_eq!(content, "web\n");
    }

    #[test]
    fn checkout_unknown_branch_fails() {
        let (_dir, repo) = setup();
        std::fs::write(repo.root().join("application"), "").unwrap();
        repo.stage_all().unwrap();
        repo.commit("seed").unwrap();
        let err = repo.checkout("nonexistent").unwrap_err();
        assert!(matches!(err, GitError::BranchNotFound { .. }));
    }
}

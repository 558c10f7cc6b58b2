//! Audit pipeline: compare a deployed host against a freshly generated
//! reference release (§4.6).

use std::fs;
use std::io::Read as _;
use std::path::Path;

use armory_core::{ArmoryConfig, ArmoryError};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::release;
use crate::transport::Transport;

/// What an operator is offered when a compared file differs (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffChoice {
    SideBySide,
    Unified,
    Skip,
}

/// Outcome for a single file comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Matched,
    Mismatched,
    MissingOnHost,
    SkippedEmpty,
}

/// Result of auditing one system.
pub struct AuditReport {
    pub results: Vec<(String, FileOutcome)>,
}

impl AuditReport {
    /// True iff every compared file matched (§4.6 "Result").
    #[must_use]
    pub fn success(&self) -> bool {
        self.results.iter().all(|(_, outcome)| matches!(outcome, FileOutcome::Matched | FileOutcome::SkippedEmpty))
    }

    #[must_use]
    pub fn mismatches(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, o)| matches!(o, FileOutcome::Mismatched | FileOutcome::MissingOnHost))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Audit `system_name`: generate a reference release, extract it, then
/// compare every non-empty staged file's digest against the same path
/// fetched from the live host (§4.6).
///
/// `remote_host` is the address passed to `transport`; in production this is
/// the system's `ip` field, but tests may point it anywhere.
///
/// # Errors
/// Returns an error if the release cannot be composed or the reference
/// tarball cannot be extracted into the scratch tree.
pub fn audit(
    root: &Path,
    config: &ArmoryConfig,
    system_name: &str,
    remote_host: &str,
    timestamp: &str,
    transport: &dyn Transport,
) -> Result<AuditReport, ArmoryError> {
    let generated = release::compose(root, config, system_name, timestamp)?;

    let scratch = tempfile::TempDir::new().map_err(|source| ArmoryError::Io { path: std::env::temp_dir(), source })?;
    let extracted = scratch.path().join("reference");
    fs::create_dir_all(&extracted).map_err(|source| ArmoryError::Io { path: extracted.clone(), source })?;
    extract_tarball(&generated.tarball_path, &extracted)?;

    let mut results = Vec::new();

    for entry in walk_files(&extracted)? {
        let relative = entry
            .strip_prefix(&extracted)
            .expect("entry was discovered under extracted")
            .to_string_lossy()
            .into_owned();
        if relative == "armory-install.sh" {
            continue;
        }

        let local_bytes = fs::read(&entry).map_err(|source| ArmoryError::Io { path: entry.clone(), source })?;
        if local_bytes.is_empty() {
            results.push((relative, FileOutcome::SkippedEmpty));
            continue;
        }

        let remote_path = format!("/{relative}");
        let outcome = match transport.fetch(remote_host, &remote_path) {
            Ok(remote_bytes) => {
                if digest(&local_bytes) == digest(&remote_bytes) {
                    FileOutcome::Matched
                } else {
                    warn!(file = %relative, "audit mismatch");
                    FileOutcome::Mismatched
                }
            }
            Err(_) => {
                warn!(file = %relative, "missing on host");
                FileOutcome::MissingOnHost
            }
        };
        results.push((relative, outcome));
    }

    Ok(AuditReport { results })
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

fn extract_tarball(tarball_path: &Path, dest: &Path) -> Result<(), ArmoryError> {
    let file = fs::File::open(tarball_path).map_err(|source| ArmoryError::Io { path: tarball_path.to_path_buf(), source })?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest).map_err(|source| ArmoryError::Io { path: dest.to_path_buf(), source })
}

fn walk_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, ArmoryError> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = fs::read_dir(&current).map_err(|source| ArmoryError::Io { path: current.clone(), source })?;
        for entry in entries {
            let entry = entry.map_err(|source| ArmoryError::Io { path: current.clone(), source })?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|source| ArmoryError::Io { path: path.clone(), source })?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Read a file's entire contents for the interactive side-by-side/unified
/// view; pure I/O helper kept separate from [`DiffChoice`] selection so the
/// prompt loop can be tested without a TTY (§9 Design Notes).
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_for_diff(path: &Path) -> Result<String, ArmoryError> {
    let mut file = fs::File::open(path).map_err(|source| ArmoryError::Io { path: path.to_path_buf(), source })?;
    let mut content = String::new();
    file.read_to_string(&mut content).map_err(|source| ArmoryError::Io { path: path.to_path_buf(), source })?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FakeTransport;
    use armory_core::layout;
    use armory_core::store::Store;
    use armory_git::CliGitRepo;
    use std::collections::HashMap;

    fn setup() -> (tempfile::TempDir, Store) {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = CliGitRepo::new(dir.path().to_path_buf());
        repo.init().unwrap();
        std::process::Command::new("git").args(["config", "user.email", "t@example.com"]).current_dir(dir.path()).output().unwrap();
        std::process::Command::new("git").args(["config", "user.name", "t"]).current_dir(dir.path()).output().unwrap();
        let store = Store::new(dir.path().to_path_buf(), Box::new(repo), "trunk");
        store.init().unwrap();
        (dir, store)
    }

    #[test]
    fn empty_reference_files_are_skipped() {
        let (dir, store) = setup();
        let root = dir.path();
        let tx = store.begin_modify("alice", false).unwrap();

        use armory_core::model::catalog::{
            add_file_to_application, create_application, create_build, create_file, create_system, Application, Build,
            FileEntity, System,
        };
        create_build(root, &tx, Build { name: "web".into(), role: "web".into(), description: String::new() }).unwrap();
        create_application(
            root,
            &tx,
            Application { name: "frontend".into(), alias: "fe".into(), build: "web".into(), cluster: false },
        )
        .unwrap();
        create_file(
            root,
            &tx,
            FileEntity {
                name: "empty.conf".into(),
                path: "/etc/empty.conf".into(),
                file_type: "file".into(),
                owner: "root".into(),
                group: "root".into(),
                octal: "644".into(),
                target: String::new(),
                description: String::new(),
            },
        )
        .unwrap();
        add_file_to_application(root, &tx, "empty.conf", "frontend").unwrap();
        std::fs::write(layout::template(root, "empty.conf"), "").unwrap();
        std::fs::write(layout::entity_file(root, "location"), "nyc,New York,\n").unwrap();
        std::fs::write(layout::entity_file(root, "environment"), "prod,P,\n").unwrap();
        create_system(
            root,
            &tx,
            System { name: "host01".into(), build: "web".into(), ip: "10.0.0.1".into(), location: "nyc".into(), environment: "prod".into() },
        )
        .unwrap();
        tx.commit("seed").unwrap();

        let config = ArmoryConfig { release: armory_core::config::ReleaseConfig { output_dir: dir.path().join("out"), ..Default::default() }, ..Default::default() };
        let transport = FakeTransport { files: HashMap::new() };
        let report = audit(root, &config, "host01", "10.0.0.1", "20260101-000000", &transport).unwrap();
        assert!(report.success());
    }
}

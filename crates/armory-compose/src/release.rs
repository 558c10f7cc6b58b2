//! Release composition: resolve a System into a deployable tarball +
//! installer (§4.5).

use std::fmt::Write as _;
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use armory_core::model::catalog::{self, Application, FileEntity, FileMapRow, System};
use armory_core::model::variables::{self, ResolutionContext, VariableTable};
use armory_core::records::{self, Record};
use armory_core::{layout, ArmoryConfig, ArmoryError};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{info, warn};

use crate::patch;

/// A generated release: where the tarball landed and the variable table it
/// was rendered with (exposed for `system --vars`, §6).
pub struct Release {
    pub tarball_path: PathBuf,
    pub variables: VariableTable,
}

/// Compose a release for `system_name` (§4.5).
///
/// `timestamp` is the `YYYYMMDD-HHMMSS` string embedded in the file name;
/// callers stamp it from wall-clock time so this function stays pure and
/// testable with a fixed value.
///
/// # Errors
/// Returns an error for any missing referenced entity, failed patch
/// application, undefined variable, or missing binary blob (§4.5 "Failure
/// modes"). The scratch directory is removed on any error path since it is
/// a [`tempfile::TempDir`].
pub fn compose(root: &Path, config: &ArmoryConfig, system_name: &str, timestamp: &str) -> Result<Release, ArmoryError> {
    let systems: Vec<System> = records::load(&layout::entity_file(root, System::KIND))?;
    let system = systems
        .iter()
        .find(|s| s.name == system_name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: System::KIND, key: system_name.to_owned() })?;

    let applications: Vec<Application> = records::load(&layout::entity_file(root, Application::KIND))?;
    let placed = catalog::applications_for_build(&applications, &system.build);
    let app_names: Vec<String> = placed.iter().map(|a| a.name.clone()).collect();

    let map_rows: Vec<FileMapRow> = records::load(&layout::file_map(root))?;
    let mut file_names: Vec<String> = Vec::new();
    for app in &app_names {
        for name in catalog::files_for_application(&map_rows, app) {
            if !file_names.contains(&name) {
                file_names.push(name);
            }
        }
    }

    let ctx = ResolutionContext {
        system_name: &system.name,
        build: &system.build,
        location: &system.location,
        environment: &system.environment,
        ip: &system.ip,
        applications: &app_names,
    };
    let variable_table = variables::resolve(root, &ctx)?;

    let files: Vec<FileEntity> = records::load(&layout::entity_file(root, FileEntity::KIND))?;
    let scratch = tempfile::TempDir::new().map_err(|source| ArmoryError::Io { path: std::env::temp_dir(), source })?;
    let staged = scratch.path().join("staged");
    fs::create_dir_all(&staged).map_err(|source| ArmoryError::Io { path: staged.clone(), source })?;

    let mut install_steps = Vec::new();

    for name in &file_names {
        let file = files
            .iter()
            .find(|f| &f.name == name)
            .ok_or_else(|| ArmoryError::UnknownEntity { kind: FileEntity::KIND, key: name.clone() })?;
        stage_file(root, &staged, file, &system.environment, &variable_table, &mut install_steps)?;
    }

    let script = render_install_script(&system.name, &install_steps, config);
    let script_path = staged.join("armory-install.sh");
    fs::write(&script_path, script).map_err(|source| ArmoryError::Io { path: script_path.clone(), source })?;
    let mut perms = fs::metadata(&script_path)
        .map_err(|source| ArmoryError::Io { path: script_path.clone(), source })?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script_path, perms).map_err(|source| ArmoryError::Io { path: script_path.clone(), source })?;

    fs::create_dir_all(&config.release.output_dir)
        .map_err(|source| ArmoryError::Io { path: config.release.output_dir.clone(), source })?;
    let tarball_path = config.release.output_dir.join(format!("{system_name}-release-{timestamp}.tgz"));
    write_tarball(&staged, &tarball_path)?;

    info!(system = %system_name, tarball = %tarball_path.display(), "composed release");
    Ok(Release { tarball_path, variables: variable_table })
}

/// One line of install-script work: either a `copy`/`download` step (§4.5
/// step 5) or an ownership/permission fixup appended for every staged file
/// (§4.5 step 6).
struct InstallStep {
    kind: StepKind,
    source: String,
    dest: String,
}

enum StepKind {
    Copy,
    Download,
    Own { owner: String, group: String, octal: String },
}

fn stage_file(
    root: &Path,
    staged: &Path,
    file: &FileEntity,
    environment: &str,
    variables: &VariableTable,
    install_steps: &mut Vec<InstallStep>,
) -> Result<(), ArmoryError> {
    let relative = file.path.trim_start_matches('/');
    let dest = staged.join(relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| ArmoryError::Io { path: parent.to_path_buf(), source })?;
    }

    match file.file_type.as_str() {
        "file" => {
            let content = patch::reconstruct(root, environment, &file.name)?;
            let rendered = variables.substitute(&content)?;
            fs::write(&dest, rendered).map_err(|source| ArmoryError::Io { path: dest.clone(), source })?;
        }
        "binary" => {
            let blob = layout::binary(root, &file.name);
            if !blob.exists() {
                return Err(ArmoryError::InvalidInput {
                    field: "file.name",
                    reason: format!("backing bytes for binary file '{}' are missing from the store", file.name),
                });
            }
            fs::copy(&blob, &dest).map_err(|source| ArmoryError::Io { path: dest.clone(), source })?;
        }
        "symlink" => {
            if dest.exists() {
                fs::remove_file(&dest).map_err(|source| ArmoryError::Io { path: dest.clone(), source })?;
            }
            symlink(&file.target, &dest).map_err(|source| ArmoryError::Io { path: dest, source })?;
            push_ownership_step(install_steps, file);
            return Ok(());
        }
        "copy" => {
            install_steps.push(InstallStep {
                kind: StepKind::Copy,
                source: file.target.clone(),
                dest: file.path.clone(),
            });
            push_ownership_step(install_steps, file);
            return Ok(());
        }
        "download" => {
            install_steps.push(InstallStep {
                kind: StepKind::Download,
                source: file.target.clone(),
                dest: file.path.clone(),
            });
            push_ownership_step(install_steps, file);
            return Ok(());
        }
        other => {
            return Err(ArmoryError::InvalidInput {
                field: "file.type",
                reason: format!("unknown file type '{other}'"),
            });
        }
    }

    let mut perms = fs::metadata(&dest).map_err(|source| ArmoryError::Io { path: dest.clone(), source })?.permissions();
    if let Ok(mode) = u32::from_str_radix(&file.octal, 8) {
        perms.set_mode(mode);
        fs::set_permissions(&dest, perms).map_err(|source| ArmoryError::Io { path: dest, source })?;
    }
    push_ownership_step(install_steps, file);
    Ok(())
}

fn push_ownership_step(install_steps: &mut Vec<InstallStep>, file: &FileEntity) {
    install_steps.push(InstallStep {
        kind: StepKind::Own {
            owner: file.owner.clone(),
            group: file.group.clone(),
            octal: file.octal.clone(),
        },
        source: String::new(),
        dest: file.path.clone(),
    });
}

fn render_install_script(system_name: &str, steps: &[InstallStep], config: &ArmoryConfig) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str("set -e\n");
    let _ = writeln!(
        script,
        "if [ \"$(hostname)\" != \"{system_name}\" ]; then\n  echo 'refusing to install: hostname does not match {system_name}' >&2\n  exit 1\nfi"
    );
    script.push('\n');

    for step in steps {
        match &step.kind {
            StepKind::Copy => {
                let _ = writeln!(script, "cp '{}' '{}'", step.source, step.dest);
            }
            StepKind::Download => {
                let _ = writeln!(
                    script,
                    "armory_download_retry {} {} '{}' '{}' || echo 'download failed for {}' >&2",
                    config.release.download_attempts,
                    config.release.download_delay_secs,
                    step.source,
                    step.dest,
                    step.dest
                );
            }
            StepKind::Own { owner, group, octal } => {
                let _ = writeln!(script, "chown '{owner}:{group}' '{}'", step.dest);
                let _ = writeln!(script, "chmod '{octal}' '{}'", step.dest);
            }
        }
    }

    script.push_str("\necho 'armory install complete'\n");
    script
}

fn write_tarball(staged: &Path, tarball_path: &Path) -> Result<(), ArmoryError> {
    let file = fs::File::create(tarball_path).map_err(|source| ArmoryError::Io { path: tarball_path.to_path_buf(), source })?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);
    builder
        .append_dir_all(".", staged)
        .map_err(|source| ArmoryError::Io { path: staged.to_path_buf(), source })?;
    builder
        .into_inner()
        .map_err(|source| ArmoryError::Io { path: tarball_path.to_path_buf(), source })?
        .finish()
        .map_err(|source| ArmoryError::Io { path: tarball_path.to_path_buf(), source })?;
    Ok(())
}

/// Warn about resources released by an unplacement cascade (§9), surfaced
/// here so the CLI layer can print it after `environment application
/// --unplace` without the model layer depending on any output abstraction.
pub fn warn_released_resources(released: &[String]) {
    if !released.is_empty() {
        warn!(resources = ?released, "released resources back to unassigned");
    }
}

//! Context-format patch generation and application, shelling out to the
//! host's `diff`/`patch` utilities (§6 precondition: "a patch utility" on
//! `PATH`) rather than re-implementing a patch engine.

use std::path::Path;
use std::process::Command;

use armory_core::ArmoryError;

/// Apply `patch_content` (unified or context diff) to `base`, returning the
/// patched content.
///
/// # Errors
/// Returns [`ArmoryError::PatchFailed`] if the patch utility reports the
/// patch does not apply.
pub fn apply(base: &str, patch_content: &str, file_label: &str, environment_label: &str) -> Result<String, ArmoryError> {
    let scratch = tempfile::TempDir::new().map_err(|source| ArmoryError::Io {
        path: std::env::temp_dir(),
        source,
    })?;
    let base_path = scratch.path().join("base");
    let patch_path = scratch.path().join("changes.patch");
    std::fs::write(&base_path, base).map_err(|source| ArmoryError::Io { path: base_path.clone(), source })?;
    std::fs::write(&patch_path, patch_content).map_err(|source| ArmoryError::Io { path: patch_path.clone(), source })?;

    let status = Command::new("patch")
        .arg("--quiet")
        .arg(&base_path)
        .arg(&patch_path)
        .status();

    match status {
        Ok(s) if s.success() => {
            std::fs::read_to_string(&base_path).map_err(|source| ArmoryError::Io { path: base_path, source })
        }
        _ => Err(ArmoryError::PatchFailed {
            file: file_label.to_owned(),
            environment: environment_label.to_owned(),
        }),
    }
}

/// Generate a context-format diff of `base` against `modified`, suitable for
/// storing as `template/patch/<env>/<file>` and replaying with [`apply`].
///
/// # Errors
/// Returns an error if the scratch files cannot be written, or if `diff`
/// exits with a status other than 0 (no differences) or 1 (differences found).
pub fn generate(base: &str, modified: &str) -> Result<String, ArmoryError> {
    let scratch = tempfile::TempDir::new().map_err(|source| ArmoryError::Io {
        path: std::env::temp_dir(),
        source,
    })?;
    let base_path = scratch.path().join("base");
    let modified_path = scratch.path().join("modified");
    std::fs::write(&base_path, base).map_err(|source| ArmoryError::Io { path: base_path.clone(), source })?;
    std::fs::write(&modified_path, modified).map_err(|source| ArmoryError::Io { path: modified_path.clone(), source })?;

    let output = Command::new("diff")
        .arg("-c")
        .arg(&base_path)
        .arg(&modified_path)
        .output()
        .map_err(|source| ArmoryError::Io { path: base_path.clone(), source })?;

    match output.status.code() {
        Some(0) | Some(1) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        _ => Err(ArmoryError::PatchFailed {
            file: modified_path.display().to_string(),
            environment: "diff generation".to_owned(),
        }),
    }
}

/// Reconstruct the effective content of a file for an environment: base
/// template plus its patch, if one exists (§4.7 "Environment patch edit").
///
/// # Errors
/// Returns an error if the template or patch cannot be read, or the patch
/// does not apply.
pub fn reconstruct(root: &Path, environment: &str, file_name: &str) -> Result<String, ArmoryError> {
    let base = std::fs::read_to_string(armory_core::layout::template(root, file_name))
        .map_err(|source| ArmoryError::Io { path: armory_core::layout::template(root, file_name), source })?;
    let patch_path = armory_core::layout::patch(root, environment, file_name);
    if !patch_path.exists() {
        return Ok(base);
    }
    let patch_content =
        std::fs::read_to_string(&patch_path).map_err(|source| ArmoryError::Io { path: patch_path, source })?;
    apply(&base, &patch_content, file_name, environment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_apply_round_trips() {
        let base = "line one\nline two\nline three\n";
        let modified = "line one\nline TWO\nline three\n";
        let patch_content = generate(base, modified).unwrap();
        let applied = apply(base, &patch_content, "sample.conf", "prod").unwrap();
        assert_eq!(applied, modified);
    }

    #[test]
    fn apply_fails_when_context_does_not_match() {
        let base = "line one\nline two\n";
        let bogus_patch = "*** base\n--- modified\n***************\n*** 1 ****\n! nope\n--- 1 ----\n! nope too\n";
        let err = apply(base, bogus_patch, "sample.conf", "prod").unwrap_err();
        assert!(matches!(err, ArmoryError::PatchFailed { .. }));
    }
}

//! Invokes the platform-native editor for `armory file edit` (§4.7). The
//! editor binary itself is an external collaborator (§1); this module only
//! owns the scratch-file lifecycle around it.

use std::process::Command;

use armory_core::ArmoryError;

/// Open `$EDITOR` (falling back to `vi`) on a scratch file seeded with
/// `initial_content`, and return what the user saved.
///
/// # Errors
/// Returns an error if the scratch file cannot be created, the editor
/// cannot be launched, or exits non-zero.
pub fn edit(initial_content: &str) -> Result<String, ArmoryError> {
    let scratch = tempfile::TempDir::new().map_err(|source| ArmoryError::Io { path: std::env::temp_dir(), source })?;
    let path = scratch.path().join("armory-edit");
    std::fs::write(&path, initial_content).map_err(|source| ArmoryError::Io { path: path.clone(), source })?;

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_owned());
    let status = Command::new(&editor).arg(&path).status().map_err(|source| ArmoryError::Io { path: path.clone(), source })?;
    if !status.success() {
        return Err(ArmoryError::InvalidInput {
            field: "editor",
            reason: format!("'{editor}' exited with {status}"),
        });
    }

    std::fs::read_to_string(&path).map_err(|source| ArmoryError::Io { path, source })
}

//! Store directory layout (§3, §6): where every entity kind, association
//! index, scoped constant file, template, and binary blob lives under the
//! store root.

use std::path::PathBuf;

/// Entity record file names, one per kind, directly under the store root.
pub const ENTITY_FILES: &[&str] = &[
    "application",
    "build",
    "environment",
    "location",
    "network",
    "constant",
    "resource",
    "file",
    "system",
];

/// The many-to-many File↔Application association index.
pub const FILE_MAP: &str = "file-map";

/// Path to an entity record file.
#[must_use]
pub fn entity_file(root: &std::path::Path, kind: &str) -> PathBuf {
    root.join(kind)
}

/// Path to the file-map association index.
#[must_use]
pub fn file_map(root: &std::path::Path) -> PathBuf {
    root.join(FILE_MAP)
}

/// Path to `<location>/<environment>`, the placement membership list.
#[must_use]
pub fn placement_file(root: &std::path::Path, location: &str, environment: &str) -> PathBuf {
    root.join(location).join(environment)
}

/// Path to `<location>/network`, the cached network summary file.
#[must_use]
pub fn location_network_file(root: &std::path::Path, location: &str) -> PathBuf {
    root.join(location).join("network")
}

/// Path to `<location>/` itself, for cascading deletes.
#[must_use]
pub fn location_dir(root: &std::path::Path, location: &str) -> PathBuf {
    root.join(location)
}

/// Path to `value/constant`, the global constant value file.
#[must_use]
pub fn global_values(root: &std::path::Path) -> PathBuf {
    root.join("value").join("constant")
}

/// Path to `value/<environment>/constant`, the per-environment override file.
#[must_use]
pub fn environment_values(root: &std::path::Path, environment: &str) -> PathBuf {
    root.join("value").join(environment).join("constant")
}

/// Path to `value/<environment>/<application>`, the per-placement override file.
#[must_use]
pub fn placement_values(root: &std::path::Path, environment: &str, application: &str) -> PathBuf {
    root.join("value").join(environment).join(application)
}

/// Path to `value/<location>/<environment>`, the per-(location,environment) override file.
#[must_use]
pub fn location_environment_values(
    root: &std::path::Path,
    location: &str,
    environment: &str,
) -> PathBuf {
    root.join("value").join(location).join(environment)
}

/// Path to `value/<environment>/`, for cascading renames.
#[must_use]
pub fn environment_value_dir(root: &std::path::Path, environment: &str) -> PathBuf {
    root.join("value").join(environment)
}

/// Path to `template/<fileName>`, the base template for a `file`-type File.
#[must_use]
pub fn template(root: &std::path::Path, file_name: &str) -> PathBuf {
    root.join("template").join(file_name)
}

/// Path to `template/patch/<environment>/<fileName>`, an environment patch.
///
/// §9 fixes this as the one patch-tree layout; `template/<environment>/<fileName>`
/// is never used.
#[must_use]
pub fn patch(root: &std::path::Path, environment: &str, file_name: &str) -> PathBuf {
    root.join("template").join("patch").join(environment).join(file_name)
}

/// Path to `template/patch/<environment>/`, for cascading renames.
#[must_use]
pub fn patch_dir(root: &std::path::Path, environment: &str) -> PathBuf {
    root.join("template").join("patch").join(environment)
}

/// Path to `binary/<fileName>`, the opaque bytes for a `binary`-type File.
#[must_use]
pub fn binary(root: &std::path::Path, file_name: &str) -> PathBuf {
    root.join("binary").join(file_name)
}

/// Create every entity file (empty) under `root`, for `armory init`.
///
/// # Errors
/// Returns an error if a file cannot be created.
pub fn seed_empty_store(root: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(root)?;
    for kind in ENTITY_FILES {
        let path = entity_file(root, kind);
        if !path.exists() {
            std::fs::write(path, "")?;
        }
    }
    let map = file_map(root);
    if !map.exists() {
        std::fs::write(map, "")?;
    }
    Ok(())
}

//! The placement association: Application membership at a (Location,
//! Environment) pair (§4.3). Represented by one line-per-application file at
//! `<location>/<environment>`, not by a `Record` impl — it has no other
//! fields to carry.

use std::path::{Path, PathBuf};

use crate::error::ArmoryError;
use crate::layout;
use crate::model::catalog::{self, Application, Environment, Location};
use crate::records;
use crate::records::Record;
use crate::store::Transaction;

/// Read the membership list at `path`; a missing file means no placements yet.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn read_placement(path: &Path) -> Result<Vec<String>, ArmoryError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().filter(|l| !l.trim().is_empty()).map(str::to_owned).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(ArmoryError::Io { path: path.to_path_buf(), source }),
    }
}

fn write_placement(path: &Path, members: &[String]) -> Result<(), ArmoryError> {
    let mut body = String::new();
    for m in members {
        body.push_str(m);
        body.push('\n');
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ArmoryError::Io { path: parent.to_path_buf(), source })?;
    }
    std::fs::write(path, body).map_err(|source| ArmoryError::Io { path: path.to_path_buf(), source })
}

/// Place an Application at a (Location, Environment); idempotent, and
/// touches its constant-override file so it exists for later edits (§4.3).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the location, environment, or
/// application does not exist.
pub fn place_app(
    root: &Path,
    tx: &Transaction<'_>,
    location: &str,
    environment: &str,
    application: &str,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let locations: Vec<Location> = records::load(&layout::entity_file(root, Location::KIND))?;
    if records::find(&locations, location).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Location::KIND, key: location.to_owned() });
    }
    let environments: Vec<Environment> = records::load(&layout::entity_file(root, Environment::KIND))?;
    if records::find(&environments, environment).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Environment::KIND, key: environment.to_owned() });
    }
    let applications: Vec<Application> = records::load(&layout::entity_file(root, Application::KIND))?;
    if records::find(&applications, application).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Application::KIND, key: application.to_owned() });
    }

    let path = layout::placement_file(root, location, environment);
    let mut members = read_placement(&path)?;
    if !members.iter().any(|m| m == application) {
        members.push(application.to_owned());
        write_placement(&path, &members)?;
    }

    let values_path = layout::placement_values(root, environment, application);
    if !values_path.exists() {
        if let Some(parent) = values_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ArmoryError::Io { path: parent.to_path_buf(), source })?;
        }
        std::fs::write(&values_path, "").map_err(|source| ArmoryError::Io { path: values_path, source })?;
    }

    tx.stage_file(&path)
}

/// Remove an Application from a placement. Per §9, this cascades: any
/// Resource assigned to `(location, environment, application)` is released
/// back to `unassigned` in the same transaction, and the released values are
/// returned so the caller can warn the operator.
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the application is not a member
/// of the placement.
pub fn unplace_app(
    root: &Path,
    tx: &Transaction<'_>,
    location: &str,
    environment: &str,
    application: &str,
) -> Result<Vec<String>, ArmoryError> {
    tx.ensure_active()?;
    let path = layout::placement_file(root, location, environment);
    let mut members = read_placement(&path)?;
    let before = members.len();
    members.retain(|m| m != application);
    if members.len() == before {
        return Err(ArmoryError::UnknownEntity {
            kind: "placement",
            key: format!("{location}/{environment}/{application}"),
        });
    }
    write_placement(&path, &members)?;
    tx.stage_file(&path)?;

    catalog::release_resources_for_placement(root, tx, location, environment, application)
}

/// List the applications placed at (location, environment), sorted (§4.3, §4.2 "List").
///
/// # Errors
/// Returns an error if the membership file cannot be read.
pub fn list_placements(root: &Path, location: &str, environment: &str) -> Result<Vec<String>, ArmoryError> {
    let path = layout::placement_file(root, location, environment);
    let mut members = read_placement(&path)?;
    members.sort();
    Ok(members)
}

/// Every (location, environment) pair an application is placed at, by
/// scanning each known location's environment files. Used by `system show`
/// to report linked applications transitively (§8 scenario 1).
///
/// # Errors
/// Returns an error if a location or environment catalog cannot be read.
pub fn placements_for_application(root: &Path, application: &str) -> Result<Vec<(String, String)>, ArmoryError> {
    let locations: Vec<Location> = records::load(&layout::entity_file(root, Location::KIND))?;
    let environments: Vec<Environment> = records::load(&layout::entity_file(root, Environment::KIND))?;
    let mut found = Vec::new();
    for loc in &locations {
        for env in &environments {
            let path = layout::placement_file(root, &loc.code, &env.name);
            if read_placement(&path)?.iter().any(|m| m == application) {
                found.push((loc.code.clone(), env.name.clone()));
            }
        }
    }
    Ok(found)
}

/// `<location>/network` cached summaries, as one line per Network row for
/// that location (§3).
#[must_use]
pub fn network_summary_path(root: &Path, location: &str) -> PathBuf {
    layout::location_network_file(root, location)
}

//! Entity catalogs: one record type and one set of CRUD operations per
//! kind in §3. Every mutating function takes a [`crate::store::Transaction`]
//! reference so a caller cannot touch a catalog file outside an open
//! transaction (§4.1: "any mutation path that does not call beginModify
//! first is a bug").

use std::path::Path;

use std::str::FromStr;

use crate::error::ArmoryError;
use crate::layout;
use crate::model::types::{
    ApplicationName, Assignment, BuildName, ConstantName, EnvironmentAlias, EnvironmentName, FileName, LocationCode,
    ResourceKind, ResourceValue, SystemName, Zone,
};
use crate::records::{self, Record};
use crate::sanitize::sanitize;
use crate::store::Transaction;

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub alias: String,
    pub build: String,
    pub cluster: bool,
}

impl Record for Application {
    const KIND: &'static str = "application";

    fn key(&self) -> &str {
        &self.name
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 4)?;
        Ok(Self {
            name: f[0].to_owned(),
            alias: f[1].to_owned(),
            build: f[2].to_owned(),
            cluster: f[3] == "y",
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.name,
            sanitize(&self.alias),
            self.build,
            if self.cluster { "y" } else { "n" }
        )
    }
}

/// Create an Application: name and alias must each be unique, and `build`
/// (if non-empty) must reference an existing Build.
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] or [`ArmoryError::UnknownEntity`].
pub fn create_application(root: &Path, tx: &Transaction<'_>, app: Application) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    ApplicationName::new(&app.name)?;
    let path = layout::entity_file(root, Application::KIND);
    let mut apps: Vec<Application> = records::load(&path)?;
    if records::find(&apps, &app.name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: Application::KIND, key: app.name });
    }
    if apps.iter().any(|a| a.alias == app.alias) {
        return Err(ArmoryError::DuplicateKey { kind: "application.alias", key: app.alias });
    }
    if !app.build.is_empty() {
        let builds: Vec<Build> = records::load(&layout::entity_file(root, Build::KIND))?;
        if records::find(&builds, &app.build).is_none() {
            return Err(ArmoryError::UnknownEntity { kind: Build::KIND, key: app.build });
        }
    }
    apps.push(app);
    records::save(&path, &apps)?;
    tx.stage_file(&path)
}

/// Delete an Application, cascading `file-map` rows that reference it and
/// releasing its placement membership rows is left to the placement catalog.
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the application does not exist.
pub fn delete_application(root: &Path, tx: &Transaction<'_>, name: &str) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Application::KIND);
    let mut apps: Vec<Application> = records::load(&path)?;
    let before = apps.len();
    apps.retain(|a| a.name != name);
    if apps.len() == before {
        return Err(ArmoryError::UnknownEntity { kind: Application::KIND, key: name.to_owned() });
    }
    records::save(&path, &apps)?;

    let map_path = layout::file_map(root);
    let mut rows: Vec<FileMapRow> = records::load(&map_path)?;
    rows.retain(|r| r.application != name);
    records::save(&map_path, &rows)?;

    tx.stage_file(&path)
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Build {
    pub name: String,
    pub role: String,
    pub description: String,
}

impl Record for Build {
    const KIND: &'static str = "build";

    fn key(&self) -> &str {
        &self.name
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 3)?;
        Ok(Self { name: f[0].to_owned(), role: f[1].to_owned(), description: f[2].to_owned() })
    }

    fn to_line(&self) -> String {
        format!("{},{},{}", self.name, sanitize(&self.role), sanitize(&self.description))
    }
}

/// Create a Build.
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] if the name already exists.
pub fn create_build(root: &Path, tx: &Transaction<'_>, build: Build) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    BuildName::new(&build.name)?;
    let path = layout::entity_file(root, Build::KIND);
    let mut builds: Vec<Build> = records::load(&path)?;
    if records::find(&builds, &build.name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: Build::KIND, key: build.name });
    }
    builds.push(build);
    records::save(&path, &builds)?;
    tx.stage_file(&path)
}

/// Update a Build's `role`/`description` in place (§4.2 "Update").
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the name does not exist.
pub fn update_build(
    root: &Path,
    tx: &Transaction<'_>,
    name: &str,
    role: Option<String>,
    description: Option<String>,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Build::KIND);
    let mut builds: Vec<Build> = records::load(&path)?;
    let build = builds
        .iter_mut()
        .find(|b| b.name == name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Build::KIND, key: name.to_owned() })?;
    if let Some(role) = role {
        build.role = role;
    }
    if let Some(description) = description {
        build.description = description;
    }
    records::save(&path, &builds)?;
    tx.stage_file(&path)
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub alias: String,
    pub description: String,
}

impl Record for Environment {
    const KIND: &'static str = "environment";

    fn key(&self) -> &str {
        &self.name
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 3)?;
        Ok(Self { name: f[0].to_owned(), alias: f[1].to_owned(), description: f[2].to_owned() })
    }

    fn to_line(&self) -> String {
        format!("{},{},{}", self.name, self.alias, sanitize(&self.description))
    }
}

/// Create an Environment: name and alias must each be unique.
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] on collision.
pub fn create_environment(root: &Path, tx: &Transaction<'_>, env: Environment) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    EnvironmentName::new(&env.name)?;
    EnvironmentAlias::new(&env.alias)?;
    let path = layout::entity_file(root, Environment::KIND);
    let mut envs: Vec<Environment> = records::load(&path)?;
    if records::find(&envs, &env.name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: Environment::KIND, key: env.name });
    }
    if envs.iter().any(|e| e.alias == env.alias) {
        return Err(ArmoryError::DuplicateKey { kind: "environment.alias", key: env.alias });
    }
    envs.push(env);
    records::save(&path, &envs)?;
    tx.stage_file(&path)
}

/// Rename an Environment, cascading `template/patch/<env>`, `value/<env>`,
/// and `<loc>/<env>` across every Location (§4.2).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] or [`ArmoryError::DuplicateKey`].
pub fn rename_environment(
    root: &Path,
    tx: &Transaction<'_>,
    old_name: &str,
    new_name: &str,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Environment::KIND);
    let mut envs: Vec<Environment> = records::load(&path)?;
    if records::find(&envs, new_name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: Environment::KIND, key: new_name.to_owned() });
    }
    let env = envs
        .iter_mut()
        .find(|e| e.name == old_name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Environment::KIND, key: old_name.to_owned() })?;
    env.name = new_name.to_owned();
    records::save(&path, &envs)?;

    rename_dir(&layout::patch_dir(root, old_name), &layout::patch_dir(root, new_name))?;
    rename_dir(&layout::environment_value_dir(root, old_name), &layout::environment_value_dir(root, new_name))?;

    let locations: Vec<Location> = records::load(&layout::entity_file(root, Location::KIND))?;
    for loc in &locations {
        rename_file_on_disk(
            &layout::placement_file(root, &loc.code, old_name),
            &layout::placement_file(root, &loc.code, new_name),
        )?;
    }

    tx.stage_file(&path)
}

/// Update an Environment's `alias`/`description` in place, distinct from the
/// primary-key rename in [`rename_environment`] (§4.2 "Update").
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the name does not exist, or
/// [`ArmoryError::DuplicateKey`] if the new alias collides with another
/// environment's.
pub fn update_environment(
    root: &Path,
    tx: &Transaction<'_>,
    name: &str,
    alias: Option<String>,
    description: Option<String>,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Environment::KIND);
    let mut envs: Vec<Environment> = records::load(&path)?;
    if let Some(alias) = &alias {
        let alias = EnvironmentAlias::new(alias)?.as_str().to_owned();
        if envs.iter().any(|e| e.name != name && e.alias == alias) {
            return Err(ArmoryError::DuplicateKey { kind: "environment.alias", key: alias });
        }
    }
    let env = envs
        .iter_mut()
        .find(|e| e.name == name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Environment::KIND, key: name.to_owned() })?;
    if let Some(alias) = alias {
        env.alias = EnvironmentAlias::new(&alias)?.as_str().to_owned();
    }
    if let Some(description) = description {
        env.description = description;
    }
    records::save(&path, &envs)?;
    tx.stage_file(&path)
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub code: String,
    pub name: String,
    pub description: String,
}

impl Record for Location {
    const KIND: &'static str = "location";

    fn key(&self) -> &str {
        &self.code
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 3)?;
        Ok(Self { code: f[0].to_owned(), name: f[1].to_owned(), description: f[2].to_owned() })
    }

    fn to_line(&self) -> String {
        format!("{},{},{}", self.code, sanitize(&self.name), sanitize(&self.description))
    }
}

/// Create a Location.
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] if the code already exists.
pub fn create_location(root: &Path, tx: &Transaction<'_>, mut loc: Location) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    loc.code = LocationCode::new(&loc.code)?.as_str().to_owned();
    let path = layout::entity_file(root, Location::KIND);
    let mut locs: Vec<Location> = records::load(&path)?;
    if records::find(&locs, &loc.code).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: Location::KIND, key: loc.code });
    }
    locs.push(loc);
    records::save(&path, &locs)?;
    tx.stage_file(&path)
}

/// Update a Location's `name`/`description` in place (§4.2 "Update").
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the code does not exist.
pub fn update_location(
    root: &Path,
    tx: &Transaction<'_>,
    code: &str,
    name: Option<String>,
    description: Option<String>,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let code = LocationCode::new(code)?.as_str().to_owned();
    let path = layout::entity_file(root, Location::KIND);
    let mut locs: Vec<Location> = records::load(&path)?;
    let loc = locs
        .iter_mut()
        .find(|l| l.code == code)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Location::KIND, key: code.clone() })?;
    if let Some(name) = name {
        loc.name = name;
    }
    if let Some(description) = description {
        loc.description = description;
    }
    records::save(&path, &locs)?;
    tx.stage_file(&path)
}

/// Delete a Location, cascading the `<location>/` subtree and its network rows.
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the code does not exist.
pub fn delete_location(root: &Path, tx: &Transaction<'_>, code: &str) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let code = LocationCode::new(code)?.as_str().to_owned();
    let code = code.as_str();
    let path = layout::entity_file(root, Location::KIND);
    let mut locs: Vec<Location> = records::load(&path)?;
    let before = locs.len();
    locs.retain(|l| l.code != code);
    if locs.len() == before {
        return Err(ArmoryError::UnknownEntity { kind: Location::KIND, key: code.to_owned() });
    }
    records::save(&path, &locs)?;

    let dir = layout::location_dir(root, code);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).map_err(|source| ArmoryError::Io { path: dir, source })?;
    }

    let net_path = layout::entity_file(root, Network::KIND);
    let mut nets: Vec<Network> = records::load(&net_path)?;
    nets.retain(|n| n.location != code);
    records::save(&net_path, &nets)?;

    tx.stage_file(&path)
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    pub location: String,
    pub zone: String,
    pub alias: String,
    pub net: String,
    pub mask: String,
    pub bits: String,
    pub gateway: String,
    pub vlan: String,
    pub description: String,
}

impl Record for Network {
    const KIND: &'static str = "network";

    fn key(&self) -> &str {
        &self.alias
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 9)?;
        Ok(Self {
            location: f[0].to_owned(),
            zone: f[1].to_owned(),
            alias: f[2].to_owned(),
            net: f[3].to_owned(),
            mask: f[4].to_owned(),
            bits: f[5].to_owned(),
            gateway: f[6].to_owned(),
            vlan: f[7].to_owned(),
            description: f[8].to_owned(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            self.location,
            self.zone,
            self.alias,
            self.net,
            self.mask,
            self.bits,
            self.gateway,
            self.vlan,
            sanitize(&self.description)
        )
    }
}

/// Create a Network row: the (location, zone, alias) tuple must be unique
/// and `location` must reference an existing Location.
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] or [`ArmoryError::UnknownEntity`].
pub fn create_network(root: &Path, tx: &Transaction<'_>, net: Network) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    Zone::from_str(&net.zone)?;
    let locs: Vec<Location> = records::load(&layout::entity_file(root, Location::KIND))?;
    if records::find(&locs, &net.location).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Location::KIND, key: net.location });
    }
    let path = layout::entity_file(root, Network::KIND);
    let mut nets: Vec<Network> = records::load(&path)?;
    if nets.iter().any(|n| n.location == net.location && n.zone == net.zone && n.alias == net.alias) {
        return Err(ArmoryError::DuplicateKey {
            kind: Network::KIND,
            key: format!("{}:{}:{}", net.location, net.zone, net.alias),
        });
    }
    nets.push(net);
    records::save(&path, &nets)?;
    tx.stage_file(&path)
}

/// Update a Network row's non-key fields in place (§4.2 "Update").
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the (location,zone,alias) tuple
/// does not exist.
#[allow(clippy::too_many_arguments)]
pub fn update_network(
    root: &Path,
    tx: &Transaction<'_>,
    location: &str,
    zone: &str,
    alias: &str,
    net: Option<String>,
    mask: Option<String>,
    bits: Option<String>,
    gateway: Option<String>,
    vlan: Option<String>,
    description: Option<String>,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Network::KIND);
    let mut nets: Vec<Network> = records::load(&path)?;
    let row = nets
        .iter_mut()
        .find(|n| n.location == location && n.zone == zone && n.alias == alias)
        .ok_or_else(|| ArmoryError::UnknownEntity {
            kind: Network::KIND,
            key: format!("{location}:{zone}:{alias}"),
        })?;
    if let Some(net) = net {
        row.net = net;
    }
    if let Some(mask) = mask {
        row.mask = mask;
    }
    if let Some(bits) = bits {
        row.bits = bits;
    }
    if let Some(gateway) = gateway {
        row.gateway = gateway;
    }
    if let Some(vlan) = vlan {
        row.vlan = vlan;
    }
    if let Some(description) = description {
        row.description = description;
    }
    records::save(&path, &nets)?;
    tx.stage_file(&path)
}

/// Delete a Network row by its (location,zone,alias) tuple (§4.2 "Delete").
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the tuple does not exist.
pub fn delete_network(root: &Path, tx: &Transaction<'_>, location: &str, zone: &str, alias: &str) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Network::KIND);
    let mut nets: Vec<Network> = records::load(&path)?;
    let before = nets.len();
    nets.retain(|n| !(n.location == location && n.zone == zone && n.alias == alias));
    if nets.len() == before {
        return Err(ArmoryError::UnknownEntity { kind: Network::KIND, key: format!("{location}:{zone}:{alias}") });
    }
    records::save(&path, &nets)?;
    tx.stage_file(&path)
}

// ---------------------------------------------------------------------------
// Constant
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub description: String,
}

impl Record for Constant {
    const KIND: &'static str = "constant";

    fn key(&self) -> &str {
        &self.name
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 2)?;
        Ok(Self { name: f[0].to_owned(), description: f[1].to_owned() })
    }

    fn to_line(&self) -> String {
        format!("{},{}", self.name.to_ascii_uppercase(), sanitize(&self.description))
    }
}

/// Create a Constant; `name` is uppercased before the uniqueness check (§4.2).
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] if the uppercased name exists.
pub fn create_constant(root: &Path, tx: &Transaction<'_>, mut constant: Constant) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    constant.name = ConstantName::new(&constant.name)?.as_str().to_owned();
    let path = layout::entity_file(root, Constant::KIND);
    let mut constants: Vec<Constant> = records::load(&path)?;
    if records::find(&constants, &constant.name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: Constant::KIND, key: constant.name });
    }
    constants.push(constant);
    records::save(&path, &constants)?;
    tx.stage_file(&path)
}

/// Update a Constant's `description` in place (§4.2 "Update"); `name` is
/// the primary key and is never changed by this operation.
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the uppercased name does not exist.
pub fn update_constant(root: &Path, tx: &Transaction<'_>, name: &str, description: Option<String>) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let upper = name.to_ascii_uppercase();
    let path = layout::entity_file(root, Constant::KIND);
    let mut constants: Vec<Constant> = records::load(&path)?;
    let constant = constants
        .iter_mut()
        .find(|c| c.name == upper)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Constant::KIND, key: upper.clone() })?;
    if let Some(description) = description {
        constant.description = description;
    }
    records::save(&path, &constants)?;
    tx.stage_file(&path)
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub kind: String,
    pub value: String,
    pub assign_type: String,
    pub assign_to: String,
    pub name: String,
    pub description: String,
}

impl Record for Resource {
    const KIND: &'static str = "resource";

    fn key(&self) -> &str {
        &self.value
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 6)?;
        Ok(Self {
            kind: f[0].to_owned(),
            value: f[1].to_owned(),
            assign_type: f[2].to_owned(),
            assign_to: f[3].to_owned(),
            name: f[4].to_owned(),
            description: f[5].to_owned(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.kind, self.value, self.assign_type, self.assign_to, self.name, sanitize(&self.description)
        )
    }
}

/// Create an unassigned Resource.
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] if the value already exists.
pub fn create_resource(root: &Path, tx: &Transaction<'_>, mut resource: Resource) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    ResourceKind::from_str(&resource.kind)?;
    ResourceValue::new(&resource.value)?;
    let unassigned = Assignment::Unassigned;
    resource.assign_type = unassigned.assign_type().to_owned();
    resource.assign_to = unassigned.assign_to();
    let path = layout::entity_file(root, Resource::KIND);
    let mut resources: Vec<Resource> = records::load(&path)?;
    if records::find(&resources, &resource.value).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: Resource::KIND, key: resource.value });
    }
    resources.push(resource);
    records::save(&path, &resources)?;
    tx.stage_file(&path)
}

/// Update a Resource's `name`/`description` label in place (§4.2 "Update").
/// Assignment state is changed only through `assign_resource_to_host`,
/// `assign_resource_to_application`, and `unassign_resource`.
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the value does not exist.
pub fn update_resource(
    root: &Path,
    tx: &Transaction<'_>,
    value: &str,
    name: Option<String>,
    description: Option<String>,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Resource::KIND);
    let mut resources: Vec<Resource> = records::load(&path)?;
    let resource = resources
        .iter_mut()
        .find(|r| r.value == value)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Resource::KIND, key: value.to_owned() })?;
    if let Some(name) = name {
        resource.name = name;
    }
    if let Some(description) = description {
        resource.description = description;
    }
    records::save(&path, &resources)?;
    tx.stage_file(&path)
}

/// Assign an unassigned `ip` Resource to a host (§4.2 state machine).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the resource does not exist, or
/// [`ArmoryError::InvalidInput`] if the type cannot be host-assigned or is
/// already assigned.
pub fn assign_resource_to_host(
    root: &Path,
    tx: &Transaction<'_>,
    value: &str,
    host: &str,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Resource::KIND);
    let mut resources: Vec<Resource> = records::load(&path)?;
    let resource = resources
        .iter_mut()
        .find(|r| r.value == value)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Resource::KIND, key: value.to_owned() })?;
    if resource.kind != "ip" {
        return Err(ArmoryError::InvalidInput {
            field: "resource.type",
            reason: format!("only type 'ip' may be assigned to a host, got '{}'", resource.kind),
        });
    }
    if !resource.assign_type.is_empty() {
        return Err(ArmoryError::InvalidInput {
            field: "resource.assignType",
            reason: format!("'{value}' is already assigned ({})", resource.assign_to),
        });
    }
    let assignment = Assignment::Host(host.to_owned());
    resource.assign_type = assignment.assign_type().to_owned();
    resource.assign_to = assignment.assign_to();
    records::save(&path, &resources)?;
    tx.stage_file(&path)
}

/// Assign an unassigned `cluster_ip`/`ha_ip` Resource to an existing
/// placement (§4.2 state machine).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the resource or placement does
/// not exist, or [`ArmoryError::InvalidInput`] for an ineligible type or an
/// already-assigned resource.
pub fn assign_resource_to_application(
    root: &Path,
    tx: &Transaction<'_>,
    value: &str,
    location: &str,
    environment: &str,
    application: &str,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let placement_path = layout::placement_file(root, location, environment);
    let members = crate::model::placement::read_placement(&placement_path)?;
    if !members.iter().any(|m| m == application) {
        return Err(ArmoryError::UnknownEntity {
            kind: "placement",
            key: format!("{location}/{environment}/{application}"),
        });
    }

    let path = layout::entity_file(root, Resource::KIND);
    let mut resources: Vec<Resource> = records::load(&path)?;
    let resource = resources
        .iter_mut()
        .find(|r| r.value == value)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Resource::KIND, key: value.to_owned() })?;
    if resource.kind != "cluster_ip" && resource.kind != "ha_ip" {
        return Err(ArmoryError::InvalidInput {
            field: "resource.type",
            reason: format!("only cluster_ip/ha_ip may be assigned to an application, got '{}'", resource.kind),
        });
    }
    if !resource.assign_type.is_empty() {
        return Err(ArmoryError::InvalidInput {
            field: "resource.assignType",
            reason: format!("'{value}' is already assigned ({})", resource.assign_to),
        });
    }
    let assignment = Assignment::Application {
        location: location.to_owned(),
        environment: environment.to_owned(),
        application: application.to_owned(),
    };
    resource.assign_type = assignment.assign_type().to_owned();
    resource.assign_to = assignment.assign_to();
    records::save(&path, &resources)?;
    tx.stage_file(&path)
}

/// Revert a Resource to `unassigned` (§4.2).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the resource does not exist.
pub fn unassign_resource(root: &Path, tx: &Transaction<'_>, value: &str) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Resource::KIND);
    let mut resources: Vec<Resource> = records::load(&path)?;
    let resource = resources
        .iter_mut()
        .find(|r| r.value == value)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: Resource::KIND, key: value.to_owned() })?;
    let unassigned = Assignment::Unassigned;
    resource.assign_type = unassigned.assign_type().to_owned();
    resource.assign_to = unassigned.assign_to();
    records::save(&path, &resources)?;
    tx.stage_file(&path)
}

/// Revert every Resource assigned to a given placement back to unassigned
/// (used by the unplacement cascade, §9).
///
/// # Errors
/// Returns an error if the resource file cannot be read or written.
pub fn release_resources_for_placement(
    root: &Path,
    tx: &Transaction<'_>,
    location: &str,
    environment: &str,
    application: &str,
) -> Result<Vec<String>, ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, Resource::KIND);
    let mut resources: Vec<Resource> = records::load(&path)?;
    let target = format!("{location}:{environment}:{application}");
    let mut released = Vec::new();
    for resource in &mut resources {
        if resource.assign_type == "application" && resource.assign_to == target {
            let unassigned = Assignment::Unassigned;
            resource.assign_type = unassigned.assign_type().to_owned();
            resource.assign_to = unassigned.assign_to();
            released.push(resource.value.clone());
        }
    }
    if !released.is_empty() {
        records::save(&path, &resources)?;
        tx.stage_file(&path)?;
    }
    Ok(released)
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntity {
    pub name: String,
    pub path: String,
    pub file_type: String,
    pub owner: String,
    pub group: String,
    pub octal: String,
    pub target: String,
    pub description: String,
}

impl Record for FileEntity {
    const KIND: &'static str = "file";

    fn key(&self) -> &str {
        &self.name
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 8)?;
        Ok(Self {
            name: f[0].to_owned(),
            path: f[1].to_owned(),
            file_type: f[2].to_owned(),
            owner: f[3].to_owned(),
            group: f[4].to_owned(),
            octal: f[5].to_owned(),
            target: f[6].to_owned(),
            description: f[7].to_owned(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.name,
            self.path,
            self.file_type,
            self.owner,
            self.group,
            self.octal,
            self.target,
            sanitize(&self.description)
        )
    }
}

/// Create a File entity: name must be unique, `octal` must match
/// `^[0-7]{3,4}$`, and non-`file`/`binary` types require a `target`.
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] or [`ArmoryError::InvalidInput`].
pub fn create_file(root: &Path, tx: &Transaction<'_>, file: FileEntity) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    FileName::new(&file.name)?;
    crate::model::types::Octal::new(&file.octal)?;
    let file_type: crate::model::types::FileType = file.file_type.parse()?;
    if file_type.requires_target() && file.target.is_empty() {
        return Err(ArmoryError::InvalidInput {
            field: "file.target",
            reason: format!("type '{file_type}' requires a target"),
        });
    }
    let path = layout::entity_file(root, FileEntity::KIND);
    let mut files: Vec<FileEntity> = records::load(&path)?;
    if records::find(&files, &file.name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: FileEntity::KIND, key: file.name });
    }
    files.push(file);
    records::save(&path, &files)?;
    tx.stage_file(&path)
}

/// Rename a File of type `binary`, rejecting the rename before any record is
/// rewritten if the backing blob is absent from the store (§9 Open
/// Questions: binary files on update).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`], [`ArmoryError::DuplicateKey`], or
/// [`ArmoryError::InvalidInput`] if the backing bytes are missing.
pub fn rename_file(root: &Path, tx: &Transaction<'_>, old_name: &str, new_name: &str) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, FileEntity::KIND);
    let mut files: Vec<FileEntity> = records::load(&path)?;
    if records::find(&files, new_name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: FileEntity::KIND, key: new_name.to_owned() });
    }
    let file = files
        .iter()
        .find(|f| f.name == old_name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: FileEntity::KIND, key: old_name.to_owned() })?
        .clone();

    match file.file_type.as_str() {
        "binary" => {
            let blob = layout::binary(root, old_name);
            if !blob.exists() {
                return Err(ArmoryError::InvalidInput {
                    field: "file.name",
                    reason: format!("backing bytes for binary file '{old_name}' are missing from the store"),
                });
            }
            rename_file_on_disk(&blob, &layout::binary(root, new_name))?;
        }
        "file" => {
            let tmpl = layout::template(root, old_name);
            if !tmpl.exists() {
                return Err(ArmoryError::InvalidInput {
                    field: "file.name",
                    reason: format!("backing template for file '{old_name}' is missing from the store"),
                });
            }
            rename_file_on_disk(&tmpl, &layout::template(root, new_name))?;
            let environments: Vec<Environment> = records::load(&layout::entity_file(root, Environment::KIND))?;
            for env in &environments {
                let from = layout::patch(root, &env.name, old_name);
                if from.exists() {
                    rename_file_on_disk(&from, &layout::patch(root, &env.name, new_name))?;
                }
            }
        }
        _ => {}
    }

    for f in &mut files {
        if f.name == old_name {
            f.name = new_name.to_owned();
        }
    }
    records::save(&path, &files)?;

    let map_path = layout::file_map(root);
    let mut rows: Vec<FileMapRow> = records::load(&map_path)?;
    for row in &mut rows {
        if row.file == old_name {
            row.file = new_name.to_owned();
        }
    }
    records::save(&map_path, &rows)?;

    tx.stage_file(&path)
}

/// Update a File's non-key fields in place, distinct from the primary-key
/// rename in [`rename_file`] (§4.2 "Update").
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the name does not exist, or
/// [`ArmoryError::InvalidInput`] if the new `octal`/`type` fails validation
/// or the resulting type requires a `target` that is not set.
#[allow(clippy::too_many_arguments)]
pub fn update_file(
    root: &Path,
    tx: &Transaction<'_>,
    name: &str,
    path_field: Option<String>,
    file_type: Option<String>,
    owner: Option<String>,
    group: Option<String>,
    octal: Option<String>,
    target: Option<String>,
    description: Option<String>,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    if let Some(octal) = &octal {
        crate::model::types::Octal::new(octal)?;
    }
    if let Some(file_type) = &file_type {
        let _: crate::model::types::FileType = file_type.parse()?;
    }
    let path = layout::entity_file(root, FileEntity::KIND);
    let mut files: Vec<FileEntity> = records::load(&path)?;
    let file = files
        .iter_mut()
        .find(|f| f.name == name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: FileEntity::KIND, key: name.to_owned() })?;
    if let Some(path_field) = path_field {
        file.path = path_field;
    }
    if let Some(file_type) = file_type {
        file.file_type = file_type;
    }
    if let Some(owner) = owner {
        file.owner = owner;
    }
    if let Some(group) = group {
        file.group = group;
    }
    if let Some(octal) = octal {
        file.octal = octal;
    }
    if let Some(target) = target {
        file.target = target;
    }
    if let Some(description) = description {
        file.description = description;
    }
    let parsed_type: crate::model::types::FileType = file.file_type.parse()?;
    if parsed_type.requires_target() && file.target.is_empty() {
        return Err(ArmoryError::InvalidInput {
            field: "file.target",
            reason: format!("type '{parsed_type}' requires a target"),
        });
    }
    records::save(&path, &files)?;
    tx.stage_file(&path)
}

/// Delete a File, cascading its template/binary bytes and `file-map` rows (§3).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the file does not exist.
pub fn delete_file(root: &Path, tx: &Transaction<'_>, name: &str) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::entity_file(root, FileEntity::KIND);
    let mut files: Vec<FileEntity> = records::load(&path)?;
    let before = files.len();
    files.retain(|f| f.name != name);
    if files.len() == before {
        return Err(ArmoryError::UnknownEntity { kind: FileEntity::KIND, key: name.to_owned() });
    }
    records::save(&path, &files)?;

    remove_if_exists(&layout::template(root, name))?;
    remove_if_exists(&layout::binary(root, name))?;
    let environments: Vec<Environment> = records::load(&layout::entity_file(root, Environment::KIND))?;
    for env in &environments {
        remove_if_exists(&layout::patch(root, &env.name, name))?;
    }

    let map_path = layout::file_map(root);
    let mut rows: Vec<FileMapRow> = records::load(&map_path)?;
    rows.retain(|r| r.file != name);
    records::save(&map_path, &rows)?;

    tx.stage_file(&path)
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct System {
    pub name: String,
    pub build: String,
    pub ip: String,
    pub location: String,
    pub environment: String,
}

impl Record for System {
    const KIND: &'static str = "system";

    fn key(&self) -> &str {
        &self.name
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 5)?;
        Ok(Self {
            name: f[0].to_owned(),
            build: f[1].to_owned(),
            ip: f[2].to_owned(),
            location: f[3].to_owned(),
            environment: f[4].to_owned(),
        })
    }

    fn to_line(&self) -> String {
        format!("{},{},{},{},{}", self.name, self.build, self.ip, self.location, self.environment)
    }
}

/// Create a System: name must be unique; build/location/environment must
/// each reference an existing entity (§3).
///
/// # Errors
/// Returns [`ArmoryError::DuplicateKey`] or [`ArmoryError::UnknownEntity`].
pub fn create_system(root: &Path, tx: &Transaction<'_>, system: System) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    SystemName::new(&system.name)?;
    let builds: Vec<Build> = records::load(&layout::entity_file(root, Build::KIND))?;
    if records::find(&builds, &system.build).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Build::KIND, key: system.build });
    }
    let locations: Vec<Location> = records::load(&layout::entity_file(root, Location::KIND))?;
    if records::find(&locations, &system.location).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Location::KIND, key: system.location });
    }
    let environments: Vec<Environment> = records::load(&layout::entity_file(root, Environment::KIND))?;
    if records::find(&environments, &system.environment).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Environment::KIND, key: system.environment });
    }

    let path = layout::entity_file(root, System::KIND);
    let mut systems: Vec<System> = records::load(&path)?;
    if records::find(&systems, &system.name).is_some() {
        return Err(ArmoryError::DuplicateKey { kind: System::KIND, key: system.name });
    }
    systems.push(system);
    records::save(&path, &systems)?;
    tx.stage_file(&path)
}

/// Update a System's `build`/`ip`/`location`/`environment` in place (§4.2 "Update").
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if the name does not exist, or if a
/// newly-provided `build`/`location`/`environment` reference does not exist.
pub fn update_system(
    root: &Path,
    tx: &Transaction<'_>,
    name: &str,
    build: Option<String>,
    ip: Option<String>,
    location: Option<String>,
    environment: Option<String>,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    if let Some(build) = &build {
        let builds: Vec<Build> = records::load(&layout::entity_file(root, Build::KIND))?;
        if records::find(&builds, build).is_none() {
            return Err(ArmoryError::UnknownEntity { kind: Build::KIND, key: build.clone() });
        }
    }
    if let Some(location) = &location {
        let locations: Vec<Location> = records::load(&layout::entity_file(root, Location::KIND))?;
        if records::find(&locations, location).is_none() {
            return Err(ArmoryError::UnknownEntity { kind: Location::KIND, key: location.clone() });
        }
    }
    if let Some(environment) = &environment {
        let environments: Vec<Environment> = records::load(&layout::entity_file(root, Environment::KIND))?;
        if records::find(&environments, environment).is_none() {
            return Err(ArmoryError::UnknownEntity { kind: Environment::KIND, key: environment.clone() });
        }
    }
    let path = layout::entity_file(root, System::KIND);
    let mut systems: Vec<System> = records::load(&path)?;
    let system = systems
        .iter_mut()
        .find(|s| s.name == name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: System::KIND, key: name.to_owned() })?;
    if let Some(build) = build {
        system.build = build;
    }
    if let Some(ip) = ip {
        system.ip = ip;
    }
    if let Some(location) = location {
        system.location = location;
    }
    if let Some(environment) = environment {
        system.environment = environment;
    }
    records::save(&path, &systems)?;
    tx.stage_file(&path)
}

/// Applications running on a System's build (§4.5 step 2).
#[must_use]
pub fn applications_for_build(applications: &[Application], build: &str) -> Vec<Application> {
    applications.iter().filter(|a| a.build == build).cloned().collect()
}

// ---------------------------------------------------------------------------
// File-map association index
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMapRow {
    pub file: String,
    pub application: String,
}

impl Record for FileMapRow {
    const KIND: &'static str = "file-map";

    fn key(&self) -> &str {
        &self.file
    }

    fn parse(line: &str) -> Result<Self, ArmoryError> {
        let f = records::split_fields(Self::KIND, line, 2)?;
        Ok(Self { file: f[0].to_owned(), application: f[1].to_owned() })
    }

    fn to_line(&self) -> String {
        format!("{},{}", self.file, self.application)
    }
}

/// Link a File to an Application (`armory application file --add`, §6).
///
/// # Errors
/// Returns [`ArmoryError::UnknownEntity`] if either side does not exist, or
/// is a no-op if the row already exists.
pub fn add_file_to_application(
    root: &Path,
    tx: &Transaction<'_>,
    file: &str,
    application: &str,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let files: Vec<FileEntity> = records::load(&layout::entity_file(root, FileEntity::KIND))?;
    if records::find(&files, file).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: FileEntity::KIND, key: file.to_owned() });
    }
    let apps: Vec<Application> = records::load(&layout::entity_file(root, Application::KIND))?;
    if records::find(&apps, application).is_none() {
        return Err(ArmoryError::UnknownEntity { kind: Application::KIND, key: application.to_owned() });
    }
    let path = layout::file_map(root);
    let mut rows: Vec<FileMapRow> = records::load(&path)?;
    if rows.iter().any(|r| r.file == file && r.application == application) {
        return Ok(());
    }
    rows.push(FileMapRow { file: file.to_owned(), application: application.to_owned() });
    records::save(&path, &rows)?;
    tx.stage_file(&path)
}

/// Unlink a File from an Application.
///
/// # Errors
/// Returns an error if the association file cannot be written.
pub fn remove_file_from_application(
    root: &Path,
    tx: &Transaction<'_>,
    file: &str,
    application: &str,
) -> Result<(), ArmoryError> {
    tx.ensure_active()?;
    let path = layout::file_map(root);
    let mut rows: Vec<FileMapRow> = records::load(&path)?;
    rows.retain(|r| !(r.file == file && r.application == application));
    records::save(&path, &rows)?;
    tx.stage_file(&path)
}

/// File names mapped to an application.
#[must_use]
pub fn files_for_application(rows: &[FileMapRow], application: &str) -> Vec<String> {
    rows.iter().filter(|r| r.application == application).map(|r| r.file.clone()).collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rename_dir(from: &Path, to: &Path) -> Result<(), ArmoryError> {
    if from.exists() {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ArmoryError::Io { path: parent.to_path_buf(), source })?;
        }
        std::fs::rename(from, to).map_err(|source| ArmoryError::Io { path: from.to_path_buf(), source })?;
    }
    Ok(())
}

fn rename_file_on_disk(from: &Path, to: &Path) -> Result<(), ArmoryError> {
    rename_dir(from, to)
}

fn remove_if_exists(path: &Path) -> Result<(), ArmoryError> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|source| ArmoryError::Io { path: path.to_path_buf(), source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armory_git::CliGitRepo;
    use crate::store::Store;

    fn init_store(dir: &Path) -> Store {
        let repo = CliGitRepo::new(dir.to_path_buf());
        repo.init().unwrap();
        std::process::Command::new("git").args(["config", "user.email", "test@example.com"]).current_dir(dir).output().unwrap();
        std::process::Command::new("git").args(["config", "user.name", "test"]).current_dir(dir).output().unwrap();
        let store = Store::new(dir.to_path_buf(), Box::new(repo), "trunk");
        store.init().unwrap();
        store
    }

    #[test]
    fn create_location_normalizes_code_case() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        create_location(dir.path(), &tx, Location { code: "DAL".to_owned(), name: "Dallas".to_owned(), description: String::new() }).unwrap();
        let locations: Vec<Location> = records::load(&layout::entity_file(dir.path(), Location::KIND)).unwrap();
        assert_eq!(locations[0].code, "dal");
    }

    #[test]
    fn create_environment_rejects_multi_char_alias() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        let err = create_environment(
            dir.path(),
            &tx,
            Environment { name: "prod".to_owned(), alias: "PR".to_owned(), description: String::new() },
        )
        .unwrap_err();
        assert!(matches!(err, ArmoryError::InvalidInput { .. }));
    }

    #[test]
    fn assign_resource_to_host_then_unassign_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        create_resource(
            dir.path(),
            &tx,
            Resource {
                kind: "ip".to_owned(),
                value: "10.0.0.5".to_owned(),
                assign_type: String::new(),
                assign_to: String::new(),
                name: String::new(),
                description: String::new(),
            },
        )
        .unwrap();
        assign_resource_to_host(dir.path(), &tx, "10.0.0.5", "host01").unwrap();
        let resources: Vec<Resource> = records::load(&layout::entity_file(dir.path(), Resource::KIND)).unwrap();
        assert_eq!(resources[0].assign_type, "host");
        assert_eq!(resources[0].assign_to, "host01");

        unassign_resource(dir.path(), &tx, "10.0.0.5").unwrap();
        let resources: Vec<Resource> = records::load(&layout::entity_file(dir.path(), Resource::KIND)).unwrap();
        assert_eq!(resources[0].assign_type, "");
        assert_eq!(resources[0].assign_to, "not assigned");
    }

    #[test]
    fn create_network_rejects_unknown_zone() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = init_store(dir.path());
        let tx = store.begin_modify("alice", false).unwrap();
        create_location(dir.path(), &tx, Location { code: "dal".to_owned(), name: "Dallas".to_owned(), description: String::new() }).unwrap();
        let err = create_network(
            dir.path(),
            &tx,
            Network {
                location: "dal".to_owned(),
                zone: "dmz".to_owned(),
                alias: "a".to_owned(),
                net: "10.0.0.0".to_owned(),
                mask: "255.255.255.0".to_owned(),
                bits: "24".to_owned(),
                gateway: "10.0.0.1".to_owned(),
                vlan: "100".to_owned(),
                description: String::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ArmoryError::InvalidInput { .. }));
    }
}

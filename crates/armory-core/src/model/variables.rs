//! Variable resolution and template substitution (§4.4).
//!
//! The binding table is built once per release and never re-reads scope
//! files during substitution (§9 Design Notes): callers compute a
//! [`VariableTable`] up front, then call [`VariableTable::substitute`]
//! against it as many times as there are files to render.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ArmoryError;
use crate::layout;
use crate::model::catalog::{Constant, Resource};
use crate::records;
use crate::records::Record;

/// An ordered `(name -> value)` binding table, built once per release.
///
/// Insertion order reflects precedence: [`VariableTable::insert`] never
/// overwrites an existing key, so the first scope to set a key wins exactly
/// as §4.4 specifies ("first wins").
#[derive(Clone, Debug, Default)]
pub struct VariableTable {
    bindings: BTreeMap<String, String>,
}

impl VariableTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding unless one already exists for this key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.bindings.entry(key.into()).or_insert_with(|| value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.bindings.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate bindings in key order, for `system --vars` output.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every `{% kind.name %}` token in `content` with its bound
    /// value (§4.4). Scans byte-by-byte rather than via a regex engine, so
    /// arbitrary bytes in a bound value never interact with the delimiter.
    ///
    /// # Errors
    /// Returns [`ArmoryError::UndefinedVariable`] on the first token with no binding.
    pub fn substitute(&self, content: &str) -> Result<String, ArmoryError> {
        let mut out = String::with_capacity(content.len());
        let mut rest = content;
        loop {
            let Some(start) = rest.find("{% ") else {
                out.push_str(rest);
                break;
            };
            let Some(end_rel) = rest[start..].find(" %}") else {
                out.push_str(rest);
                break;
            };
            let end = start + end_rel;
            let token = &rest[start + 3..end];
            out.push_str(&rest[..start]);
            match self.get(token) {
                Some(value) => out.push_str(value),
                None => {
                    return Err(ArmoryError::UndefinedVariable { token: token.to_owned() });
                }
            }
            rest = &rest[end + 3..];
        }
        Ok(out)
    }
}

/// Parameters identifying the host a variable table is built for (§4.4).
pub struct ResolutionContext<'a> {
    pub system_name: &'a str,
    pub build: &'a str,
    pub location: &'a str,
    pub environment: &'a str,
    pub ip: &'a str,
    pub applications: &'a [String],
}

/// Build the full variable table for a host (§4.4, in precedence order).
///
/// # Errors
/// Returns an error if any scope file cannot be read.
pub fn resolve(root: &Path, ctx: &ResolutionContext<'_>) -> Result<VariableTable, ArmoryError> {
    let mut table = VariableTable::new();

    // 1. Synthetic system variables.
    table.insert("system.name", ctx.system_name);
    table.insert("system.build", ctx.build);
    table.insert("system.ip", ctx.ip);
    table.insert("system.location", ctx.location);
    table.insert("system.environment", ctx.environment);

    // 2. Host-assigned resources.
    let resources: Vec<Resource> = records::load(&layout::entity_file(root, Resource::KIND))?;
    for resource in &resources {
        if resource.kind == "ip" && resource.assign_type == "host" && resource.assign_to == ctx.system_name {
            let key = if resource.name.is_empty() {
                format!("system.{}", resource.kind)
            } else {
                format!("system.{}", resource.name)
            };
            table.insert(key, resource.value.clone());
        }
    }

    // 3. Placement-assigned resources, one scan per application in order.
    for app in ctx.applications {
        let target = format!("{}:{}:{}", ctx.location, ctx.environment, app);
        for resource in &resources {
            if resource.assign_type != "application" || resource.assign_to != target {
                continue;
            }
            let base = if resource.kind == "cluster_ip" { "resource" } else { "system" };
            let key = if resource.name.is_empty() {
                format!("{base}.{}", resource.kind)
            } else {
                format!("{base}.{}", resource.name)
            };
            table.insert(key, resource.value.clone());
        }
    }

    // 4. Constants, per-(env,app) > per-(loc,env) > per-env > global.
    for app in ctx.applications {
        insert_constants(&mut table, &layout::placement_values(root, ctx.environment, app))?;
    }
    insert_constants(&mut table, &layout::location_environment_values(root, ctx.location, ctx.environment))?;
    insert_constants(&mut table, &layout::environment_values(root, ctx.environment))?;
    insert_constants(&mut table, &layout::global_values(root))?;

    Ok(table)
}

/// Constant-value override files store `NAME,value` lines, reusing the
/// `Constant` field shape but keyed to an arbitrary value rather than a
/// description.
fn insert_constants(table: &mut VariableTable, path: &Path) -> Result<(), ArmoryError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => return Err(ArmoryError::Io { path: path.to_path_buf(), source }),
    };
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let fields = records::split_fields(Constant::KIND, line, 2)?;
        table.insert(format!("constant.{}", fields[0].to_ascii_lowercase()), fields[1].to_owned());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_replaces_known_token() {
        let mut table = VariableTable::new();
        table.insert("system.name", "host01");
        let rendered = table.substitute("server_name {% system.name %};").unwrap();
        assert_eq!(rendered, "server_name host01;");
    }

    #[test]
    fn substitute_fails_on_unbound_token() {
        let table = VariableTable::new();
        let err = table.substitute("{% constant.timeout %}").unwrap_err();
        assert!(matches!(err, ArmoryError::UndefinedVariable { token } if token == "constant.timeout"));
    }

    #[test]
    fn first_scope_wins_on_insert() {
        let mut table = VariableTable::new();
        table.insert("constant.timeout", "30");
        table.insert("constant.timeout", "10");
        assert_eq!(table.get("constant.timeout"), Some("30"));
    }

    #[test]
    fn resolve_honors_constant_precedence() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        write_value(&layout::global_values(root), "TIMEOUT,10\n");
        write_value(&layout::environment_values(root, "prod"), "TIMEOUT,20\n");
        write_value(&layout::placement_values(root, "prod", "frontend"), "TIMEOUT,30\n");

        let ctx = ResolutionContext {
            system_name: "host01",
            build: "web-1.0",
            location: "nyc",
            environment: "prod",
            ip: "10.0.0.1",
            applications: &["frontend".to_owned()],
        };
        let table = resolve(root, &ctx).unwrap();
        assert_eq!(table.get("constant.timeout"), Some("30"));
    }

    fn write_value(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

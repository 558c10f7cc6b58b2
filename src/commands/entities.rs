//! Handlers for the catalog subjects whose verbs are plain CRUD:
//! application, build, environment, location, network, constant (§4.2).

use armory_core::model::catalog::{
    self, add_file_to_application, create_application, create_build, create_constant, create_environment,
    create_location, create_network, delete_application, delete_location, rename_environment,
    remove_file_from_application, Application, Build, Constant, Environment, FileMapRow, Location, Network,
};
use armory_core::records::{self, Record};
use armory_core::{layout, ArmoryError};

use crate::cli::{ApplicationVerb, BuildVerb, ConstantVerb, EnvironmentVerb, LocationVerb, NetworkVerb};
use crate::context::{operator, AppContext};
use crate::format::{print_fields, print_list, OutputFormat};

pub fn run_application(ctx: &AppContext, verb: ApplicationVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        ApplicationVerb::Create { name, alias, build, cluster } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_application(&ctx.root, &tx, Application { name, alias, build, cluster })?;
            println!("created application (run `armory commit` to persist)");
        }
        ApplicationVerb::List => {
            let apps: Vec<Application> = records::load(&layout::entity_file(&ctx.root, Application::KIND))?;
            let mut keys: Vec<String> = apps.into_iter().map(|a| a.name).collect();
            keys.sort();
            print_list(format, "application", &keys);
        }
        ApplicationVerb::Show { name } => {
            let apps: Vec<Application> = records::load(&layout::entity_file(&ctx.root, Application::KIND))?;
            let app = records::find(&apps, &name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Application::KIND, key: name.clone() })?;
            let placements = armory_core::model::placement::placements_for_application(&ctx.root, &name)?;
            let linked = placements.iter().map(|(l, e)| format!("{l}/{e}")).collect::<Vec<_>>().join(", ");
            print_fields(
                format,
                &[
                    ("name", app.name.clone()),
                    ("alias", app.alias.clone()),
                    ("build", app.build.clone()),
                    ("cluster", app.cluster.to_string()),
                    ("placements", linked),
                ],
            );
        }
        ApplicationVerb::Update { name, alias, build, cluster } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            tx.ensure_active()?;
            let path = layout::entity_file(&ctx.root, Application::KIND);
            let mut apps: Vec<Application> = records::load(&path)?;
            let app = apps
                .iter_mut()
                .find(|a| a.name == name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Application::KIND, key: name.clone() })?;
            if let Some(alias) = alias {
                app.alias = alias;
            }
            if let Some(build) = build {
                app.build = build;
            }
            if let Some(cluster) = cluster {
                app.cluster = cluster;
            }
            records::save(&path, &apps)?;
            tx.stage_file(&path)?;
            println!("updated application (run `armory commit` to persist)");
        }
        ApplicationVerb::Delete { name } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            delete_application(&ctx.root, &tx, &name)?;
            println!("deleted application (run `armory commit` to persist)");
        }
        ApplicationVerb::File { name, add, remove, list } => {
            if let Some(file) = add {
                let user = operator()?;
                let tx = ctx.store.begin_modify(&user, false)?;
                add_file_to_application(&ctx.root, &tx, &file, &name)?;
                println!("linked file '{file}' to application '{name}' (run `armory commit` to persist)");
            } else if let Some(file) = remove {
                let user = operator()?;
                let tx = ctx.store.begin_modify(&user, false)?;
                remove_file_from_application(&ctx.root, &tx, &file, &name)?;
                println!("unlinked file '{file}' from application '{name}' (run `armory commit` to persist)");
            } else if list {
                let rows: Vec<FileMapRow> = records::load(&layout::file_map(&ctx.root))?;
                let files = catalog::files_for_application(&rows, &name);
                print_list(format, "file", &files);
            }
        }
    }
    Ok(())
}

pub fn run_build(ctx: &AppContext, verb: BuildVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        BuildVerb::Create { name, role, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_build(&ctx.root, &tx, Build { name, role, description })?;
            println!("created build (run `armory commit` to persist)");
        }
        BuildVerb::List => {
            let builds: Vec<Build> = records::load(&layout::entity_file(&ctx.root, Build::KIND))?;
            let mut keys: Vec<String> = builds.into_iter().map(|b| b.name).collect();
            keys.sort();
            print_list(format, "build", &keys);
        }
        BuildVerb::Show { name } => {
            let builds: Vec<Build> = records::load(&layout::entity_file(&ctx.root, Build::KIND))?;
            let build = records::find(&builds, &name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Build::KIND, key: name.clone() })?;
            print_fields(format, &[("name", build.name.clone()), ("role", build.role.clone()), ("description", build.description.clone())]);
        }
        BuildVerb::Update { name, role, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            catalog::update_build(&ctx.root, &tx, &name, role, description)?;
            println!("updated build (run `armory commit` to persist)");
        }
        BuildVerb::Delete { name } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            tx.ensure_active()?;
            let path = layout::entity_file(&ctx.root, Build::KIND);
            let mut builds: Vec<Build> = records::load(&path)?;
            let before = builds.len();
            builds.retain(|b| b.name != name);
            if builds.len() == before {
                return Err(ArmoryError::UnknownEntity { kind: Build::KIND, key: name }.into());
            }
            records::save(&path, &builds)?;
            tx.stage_file(&path)?;
            println!("deleted build (run `armory commit` to persist)");
        }
    }
    Ok(())
}

pub fn run_environment(ctx: &AppContext, verb: EnvironmentVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        EnvironmentVerb::Create { name, alias, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_environment(&ctx.root, &tx, Environment { name, alias, description })?;
            println!("created environment (run `armory commit` to persist)");
        }
        EnvironmentVerb::List => {
            let envs: Vec<Environment> = records::load(&layout::entity_file(&ctx.root, Environment::KIND))?;
            let mut keys: Vec<String> = envs.into_iter().map(|e| e.name).collect();
            keys.sort();
            print_list(format, "environment", &keys);
        }
        EnvironmentVerb::Show { name } => {
            let envs: Vec<Environment> = records::load(&layout::entity_file(&ctx.root, Environment::KIND))?;
            let env = records::find(&envs, &name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Environment::KIND, key: name.clone() })?;
            print_fields(format, &[("name", env.name.clone()), ("alias", env.alias.clone()), ("description", env.description.clone())]);
        }
        EnvironmentVerb::Update { name, rename, alias, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            let target = if let Some(new_name) = &rename {
                rename_environment(&ctx.root, &tx, &name, new_name)?;
                println!("renamed environment '{name}' to '{new_name}' (run `armory commit` to persist)");
                new_name.clone()
            } else {
                name
            };
            if alias.is_some() || description.is_some() {
                catalog::update_environment(&ctx.root, &tx, &target, alias, description)?;
                println!("updated environment (run `armory commit` to persist)");
            }
        }
        EnvironmentVerb::Delete { name } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            tx.ensure_active()?;
            let path = layout::entity_file(&ctx.root, Environment::KIND);
            let mut envs: Vec<Environment> = records::load(&path)?;
            let before = envs.len();
            envs.retain(|e| e.name != name);
            if envs.len() == before {
                return Err(ArmoryError::UnknownEntity { kind: Environment::KIND, key: name }.into());
            }
            records::save(&path, &envs)?;
            tx.stage_file(&path)?;
            println!("deleted environment (run `armory commit` to persist)");
        }
        EnvironmentVerb::Application { environment, location, place, unplace, list, assign_resource, to_application } => {
            if let Some(app) = place {
                let user = operator()?;
                let tx = ctx.store.begin_modify(&user, false)?;
                armory_core::model::placement::place_app(&ctx.root, &tx, &location, &environment, &app)?;
                println!("placed '{app}' at {location}/{environment} (run `armory commit` to persist)");
            } else if let Some(app) = unplace {
                let user = operator()?;
                let tx = ctx.store.begin_modify(&user, false)?;
                let released = armory_core::model::placement::unplace_app(&ctx.root, &tx, &location, &environment, &app)?;
                armory_compose::release::warn_released_resources(&released);
                if !released.is_empty() {
                    println!("released resources: {}", released.join(", "));
                }
                println!("unplaced '{app}' from {location}/{environment} (run `armory commit` to persist)");
            } else if list {
                let members = armory_core::model::placement::list_placements(&ctx.root, &location, &environment)?;
                print_list(format, "application", &members);
            } else if let Some(value) = assign_resource {
                let app = to_application
                    .ok_or_else(|| anyhow::anyhow!("--assign-resource requires --to-application"))?;
                let user = operator()?;
                let tx = ctx.store.begin_modify(&user, false)?;
                catalog::assign_resource_to_application(&ctx.root, &tx, &value, &location, &environment, &app)?;
                println!("assigned resource '{value}' to {location}:{environment}:{app} (run `armory commit` to persist)");
            }
        }
        EnvironmentVerb::Constant { environment, set, value } => {
            if let Some(name) = set {
                let value = value.unwrap_or_default();
                let user = operator()?;
                let tx = ctx.store.begin_modify(&user, false)?;
                tx.ensure_active()?;
                set_scoped_constant(&layout::environment_values(&ctx.root, &environment), &name, &value)?;
                tx.stage_file(&layout::environment_values(&ctx.root, &environment))?;
                println!("set {name}={value} for environment '{environment}' (run `armory commit` to persist)");
            }
        }
    }
    Ok(())
}

/// Insert or replace one `NAME,value` line in a scoped constant override file.
fn set_scoped_constant(path: &std::path::Path, name: &str, value: &str) -> Result<(), ArmoryError> {
    let upper = name.to_ascii_uppercase();
    let mut lines: Vec<String> = match std::fs::read_to_string(path) {
        Ok(content) => content.lines().filter(|l| !l.trim().is_empty()).map(str::to_owned).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(source) => return Err(ArmoryError::Io { path: path.to_path_buf(), source }),
    };
    lines.retain(|l| !l.starts_with(&format!("{upper},")));
    lines.push(format!("{upper},{}", armory_core::sanitize::sanitize(value)));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ArmoryError::Io { path: parent.to_path_buf(), source })?;
    }
    std::fs::write(path, lines.join("\n") + "\n").map_err(|source| ArmoryError::Io { path: path.to_path_buf(), source })
}

pub fn run_location(ctx: &AppContext, verb: LocationVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        LocationVerb::Create { code, name, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_location(&ctx.root, &tx, Location { code, name, description })?;
            println!("created location (run `armory commit` to persist)");
        }
        LocationVerb::List => {
            let locs: Vec<Location> = records::load(&layout::entity_file(&ctx.root, Location::KIND))?;
            let mut keys: Vec<String> = locs.into_iter().map(|l| l.code).collect();
            keys.sort();
            print_list(format, "location", &keys);
        }
        LocationVerb::Show { code } => {
            let locs: Vec<Location> = records::load(&layout::entity_file(&ctx.root, Location::KIND))?;
            let loc = records::find(&locs, &code)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Location::KIND, key: code.clone() })?;
            print_fields(format, &[("code", loc.code.clone()), ("name", loc.name.clone()), ("description", loc.description.clone())]);
        }
        LocationVerb::Update { code, name, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            catalog::update_location(&ctx.root, &tx, &code, name, description)?;
            println!("updated location (run `armory commit` to persist)");
        }
        LocationVerb::Delete { code } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            delete_location(&ctx.root, &tx, &code)?;
            println!("deleted location (run `armory commit` to persist)");
        }
        LocationVerb::Environment { code, environment } => {
            let members = armory_core::model::placement::list_placements(&ctx.root, &code, &environment)?;
            print_list(format, "application", &members);
        }
    }
    Ok(())
}

pub fn run_network(ctx: &AppContext, verb: NetworkVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        NetworkVerb::Create { location, zone, alias, net, mask, bits, gateway, vlan, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_network(&ctx.root, &tx, Network { location, zone, alias, net, mask, bits, gateway, vlan, description })?;
            println!("created network (run `armory commit` to persist)");
        }
        NetworkVerb::List => {
            let nets: Vec<Network> = records::load(&layout::entity_file(&ctx.root, Network::KIND))?;
            let mut keys: Vec<String> = nets.into_iter().map(|n| format!("{}:{}:{}", n.location, n.zone, n.alias)).collect();
            keys.sort();
            print_list(format, "network", &keys);
        }
        NetworkVerb::Show { location, zone, alias } => {
            let nets: Vec<Network> = records::load(&layout::entity_file(&ctx.root, Network::KIND))?;
            let net = nets
                .iter()
                .find(|n| n.location == location && n.zone == zone && n.alias == alias)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Network::KIND, key: format!("{location}:{zone}:{alias}") })?;
            print_fields(
                format,
                &[
                    ("location", net.location.clone()),
                    ("zone", net.zone.clone()),
                    ("alias", net.alias.clone()),
                    ("net", net.net.clone()),
                    ("mask", net.mask.clone()),
                    ("bits", net.bits.clone()),
                    ("gateway", net.gateway.clone()),
                    ("vlan", net.vlan.clone()),
                    ("description", net.description.clone()),
                ],
            );
        }
        NetworkVerb::Update { location, zone, alias, net, mask, bits, gateway, vlan, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            catalog::update_network(&ctx.root, &tx, &location, &zone, &alias, net, mask, bits, gateway, vlan, description)?;
            println!("updated network (run `armory commit` to persist)");
        }
        NetworkVerb::Delete { location, zone, alias } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            catalog::delete_network(&ctx.root, &tx, &location, &zone, &alias)?;
            println!("deleted network (run `armory commit` to persist)");
        }
    }
    Ok(())
}

pub fn run_constant(ctx: &AppContext, verb: ConstantVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        ConstantVerb::Create { name, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_constant(&ctx.root, &tx, Constant { name, description })?;
            println!("created constant (run `armory commit` to persist)");
        }
        ConstantVerb::List => {
            let constants: Vec<Constant> = records::load(&layout::entity_file(&ctx.root, Constant::KIND))?;
            let mut keys: Vec<String> = constants.into_iter().map(|c| c.name).collect();
            keys.sort();
            print_list(format, "constant", &keys);
        }
        ConstantVerb::Show { name } => {
            let upper = name.to_ascii_uppercase();
            let constants: Vec<Constant> = records::load(&layout::entity_file(&ctx.root, Constant::KIND))?;
            let constant = records::find(&constants, &upper)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Constant::KIND, key: upper.clone() })?;
            print_fields(format, &[("name", constant.name.clone()), ("description", constant.description.clone())]);
        }
        ConstantVerb::Update { name, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            catalog::update_constant(&ctx.root, &tx, &name, description)?;
            println!("updated constant (run `armory commit` to persist)");
        }
        ConstantVerb::Delete { name } => {
            let upper = name.to_ascii_uppercase();
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            tx.ensure_active()?;
            let path = layout::entity_file(&ctx.root, Constant::KIND);
            let mut constants: Vec<Constant> = records::load(&path)?;
            let before = constants.len();
            constants.retain(|c| c.name != upper);
            if constants.len() == before {
                return Err(ArmoryError::UnknownEntity { kind: Constant::KIND, key: upper }.into());
            }
            records::save(&path, &constants)?;
            tx.stage_file(&path)?;
            println!("deleted constant (run `armory commit` to persist)");
        }
    }
    Ok(())
}

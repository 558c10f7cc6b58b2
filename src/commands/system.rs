//! Handler for the `system` subject: plain CRUD plus the `release`,
//! `audit`, and `vars` operations that drive the composer (§4.5, §4.6).

use armory_compose::transport::CommandTransport;
use armory_core::model::catalog::{create_system, update_system, System};
use armory_core::model::variables::{self, ResolutionContext};
use armory_core::records::{self, Record};
use armory_core::{layout, ArmoryError};

use crate::cli::SystemVerb;
use crate::context::{operator, AppContext};
use crate::format::{print_fields, print_list, print_value, OutputFormat};

pub fn run_system(ctx: &AppContext, verb: SystemVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        SystemVerb::Create { name, build, ip, location, environment } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_system(&ctx.root, &tx, System { name, build, ip, location, environment })?;
            println!("created system (run `armory commit` to persist)");
        }
        SystemVerb::List => {
            let systems: Vec<System> = records::load(&layout::entity_file(&ctx.root, System::KIND))?;
            let mut keys: Vec<String> = systems.into_iter().map(|s| s.name).collect();
            keys.sort();
            print_list(format, "system", &keys);
        }
        SystemVerb::Show { name } => {
            let systems: Vec<System> = records::load(&layout::entity_file(&ctx.root, System::KIND))?;
            let system = records::find(&systems, &name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: System::KIND, key: name.clone() })?;
            let members =
                armory_core::model::placement::list_placements(&ctx.root, &system.location, &system.environment)?;
            print_fields(
                format,
                &[
                    ("name", system.name.clone()),
                    ("build", system.build.clone()),
                    ("ip", system.ip.clone()),
                    ("location", system.location.clone()),
                    ("environment", system.environment.clone()),
                    ("applications", members.join(", ")),
                ],
            );
        }
        SystemVerb::Update { name, build, ip, location, environment } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            update_system(&ctx.root, &tx, &name, build, ip, location, environment)?;
            println!("updated system (run `armory commit` to persist)");
        }
        SystemVerb::Delete { name } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            tx.ensure_active()?;
            let path = layout::entity_file(&ctx.root, System::KIND);
            let mut systems: Vec<System> = records::load(&path)?;
            let before = systems.len();
            systems.retain(|s| s.name != name);
            if systems.len() == before {
                return Err(ArmoryError::UnknownEntity { kind: System::KIND, key: name }.into());
            }
            records::save(&path, &systems)?;
            tx.stage_file(&path)?;
            println!("deleted system (run `armory commit` to persist)");
        }
        SystemVerb::Release { name } => {
            let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
            let release = armory_compose::compose_release(&ctx.root, &ctx.config, &name, &timestamp)?;
            println!("wrote release to {}", release.tarball_path.display());
        }
        SystemVerb::Audit { name, host } => {
            let systems: Vec<System> = records::load(&layout::entity_file(&ctx.root, System::KIND))?;
            let system = records::find(&systems, &name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: System::KIND, key: name.clone() })?;
            let remote_host = host.unwrap_or_else(|| system.ip.clone());
            let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
            let transport = CommandTransport::new(ctx.config.audit.fetch_command.clone());
            let report = armory_compose::run_audit(&ctx.root, &ctx.config, &name, &remote_host, &timestamp, &transport)?;
            for (path, outcome) in &report.results {
                println!("{path}: {outcome:?}");
            }
            if !report.success() {
                std::process::exit(2);
            }
        }
        SystemVerb::Vars { name } => {
            let systems: Vec<System> = records::load(&layout::entity_file(&ctx.root, System::KIND))?;
            let system = records::find(&systems, &name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: System::KIND, key: name.clone() })?;
            let applications: Vec<armory_core::model::catalog::Application> =
                records::load(&layout::entity_file(&ctx.root, armory_core::model::catalog::Application::KIND))?;
            let placed = armory_core::model::catalog::applications_for_build(&applications, &system.build);
            let app_names: Vec<String> = placed.iter().map(|a| a.name.clone()).collect();
            let resolution = ResolutionContext {
                system_name: &system.name,
                build: &system.build,
                location: &system.location,
                environment: &system.environment,
                ip: &system.ip,
                applications: &app_names,
            };
            let table = variables::resolve(&ctx.root, &resolution)?;
            let map: std::collections::BTreeMap<String, String> =
                table.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect();
            print_value(format, &map);
        }
    }
    Ok(())
}

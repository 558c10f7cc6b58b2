//! Handler for the `resource` subject (§4.2 state machine).

use armory_core::model::catalog::{create_resource, unassign_resource, Resource};
use armory_core::records::{self, Record};
use armory_core::{layout, ArmoryError};

use crate::cli::ResourceVerb;
use crate::context::{operator, AppContext};
use crate::format::{print_fields, print_list, OutputFormat};

pub fn run_resource(ctx: &AppContext, verb: ResourceVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        ResourceVerb::Create { kind, value, name, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_resource(
                &ctx.root,
                &tx,
                Resource { kind, value, assign_type: String::new(), assign_to: String::new(), name, description },
            )?;
            println!("created resource (run `armory commit` to persist)");
        }
        ResourceVerb::List => {
            let resources: Vec<Resource> = records::load(&layout::entity_file(&ctx.root, Resource::KIND))?;
            let mut keys: Vec<String> = resources.into_iter().map(|r| r.value).collect();
            keys.sort();
            print_list(format, "resource", &keys);
        }
        ResourceVerb::Show { value } => {
            let resources: Vec<Resource> = records::load(&layout::entity_file(&ctx.root, Resource::KIND))?;
            let resource = records::find(&resources, &value)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: Resource::KIND, key: value.clone() })?;
            print_fields(
                format,
                &[
                    ("kind", resource.kind.clone()),
                    ("value", resource.value.clone()),
                    ("assignType", resource.assign_type.clone()),
                    ("assignTo", resource.assign_to.clone()),
                    ("name", resource.name.clone()),
                    ("description", resource.description.clone()),
                ],
            );
        }
        ResourceVerb::Update { value, name, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            armory_core::model::catalog::update_resource(&ctx.root, &tx, &value, name, description)?;
            println!("updated resource (run `armory commit` to persist)");
        }
        ResourceVerb::Delete { value } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            tx.ensure_active()?;
            let path = layout::entity_file(&ctx.root, Resource::KIND);
            let mut resources: Vec<Resource> = records::load(&path)?;
            let before = resources.len();
            resources.retain(|r| r.value != value);
            if resources.len() == before {
                return Err(ArmoryError::UnknownEntity { kind: Resource::KIND, key: value }.into());
            }
            records::save(&path, &resources)?;
            tx.stage_file(&path)?;
            println!("deleted resource (run `armory commit` to persist)");
        }
        ResourceVerb::Assign { value, host, location, environment, application } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            if let Some(host) = host {
                armory_core::model::catalog::assign_resource_to_host(&ctx.root, &tx, &value, &host)?;
                println!("assigned '{value}' to host '{host}' (run `armory commit` to persist)");
            } else {
                let location = location.ok_or_else(|| anyhow::anyhow!("--location is required when not assigning to a host"))?;
                let environment = environment.ok_or_else(|| anyhow::anyhow!("--environment is required when not assigning to a host"))?;
                let application = application.ok_or_else(|| anyhow::anyhow!("--application is required when not assigning to a host"))?;
                armory_core::model::catalog::assign_resource_to_application(
                    &ctx.root,
                    &tx,
                    &value,
                    &location,
                    &environment,
                    &application,
                )?;
                println!("assigned '{value}' to {location}:{environment}:{application} (run `armory commit` to persist)");
            }
        }
        ResourceVerb::Unassign { value } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            unassign_resource(&ctx.root, &tx, &value)?;
            println!("unassigned '{value}' (run `armory commit` to persist)");
        }
    }
    Ok(())
}

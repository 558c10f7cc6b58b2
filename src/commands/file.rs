//! Handler for the `file` subject, including the interactive editor
//! workflows of §4.7 (template edit and environment patch edit).

use armory_compose::patch;
use armory_core::model::catalog::{create_file, delete_file, rename_file, update_file, FileEntity};
use armory_core::records::{self, Record};
use armory_core::{layout, ArmoryError};

use crate::cli::FileVerb;
use crate::context::{operator, AppContext};
use crate::format::{print_fields, print_list, OutputFormat};

pub fn run_file(ctx: &AppContext, verb: FileVerb, format: OutputFormat) -> anyhow::Result<()> {
    match verb {
        FileVerb::Create { name, path, file_type, owner, group, octal, target, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            create_file(&ctx.root, &tx, FileEntity { name, path, file_type, owner, group, octal, target, description })?;
            println!("created file (run `armory commit` to persist)");
        }
        FileVerb::List => {
            let files: Vec<FileEntity> = records::load(&layout::entity_file(&ctx.root, FileEntity::KIND))?;
            let mut keys: Vec<String> = files.into_iter().map(|f| f.name).collect();
            keys.sort();
            print_list(format, "file", &keys);
        }
        FileVerb::Show { name } => {
            let files: Vec<FileEntity> = records::load(&layout::entity_file(&ctx.root, FileEntity::KIND))?;
            let file = records::find(&files, &name)
                .ok_or_else(|| ArmoryError::UnknownEntity { kind: FileEntity::KIND, key: name.clone() })?;
            print_fields(
                format,
                &[
                    ("name", file.name.clone()),
                    ("path", file.path.clone()),
                    ("type", file.file_type.clone()),
                    ("owner", file.owner.clone()),
                    ("group", file.group.clone()),
                    ("octal", file.octal.clone()),
                    ("target", file.target.clone()),
                    ("description", file.description.clone()),
                ],
            );
        }
        FileVerb::Update { name, rename, path, file_type, owner, group, octal, target, description } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            let target_name = if let Some(new_name) = &rename {
                rename_file(&ctx.root, &tx, &name, new_name)?;
                println!("renamed file '{name}' to '{new_name}' (run `armory commit` to persist)");
                new_name.clone()
            } else {
                name
            };
            if path.is_some()
                || file_type.is_some()
                || owner.is_some()
                || group.is_some()
                || octal.is_some()
                || target.is_some()
                || description.is_some()
            {
                update_file(&ctx.root, &tx, &target_name, path, file_type, owner, group, octal, target, description)?;
                println!("updated file (run `armory commit` to persist)");
            }
        }
        FileVerb::Delete { name } => {
            let user = operator()?;
            let tx = ctx.store.begin_modify(&user, false)?;
            delete_file(&ctx.root, &tx, &name)?;
            println!("deleted file (run `armory commit` to persist)");
        }
        FileVerb::Edit { name, environment } => match environment {
            Some(environment) => edit_environment_patch(ctx, &name, &environment)?,
            None => edit_template(ctx, &name)?,
        },
    }
    Ok(())
}

/// Template edit (§4.7): load `template/<name>`, open the editor, and on
/// save re-apply every environment's existing patch to the new content
/// before committing the replacement. Any environment whose patch no
/// longer applies aborts the whole edit so the template stays consistent
/// with every stored patch — the two-pane conflict resolution the
/// specification describes is an interactive prompt-loop concern and is
/// out of scope here; the operator regenerates that environment's patch
/// with `file edit --environment` instead.
fn edit_template(ctx: &AppContext, name: &str) -> anyhow::Result<()> {
    let user = operator()?;
    let tx = ctx.store.begin_modify(&user, false)?;
    tx.ensure_active()?;

    let files: Vec<FileEntity> = records::load(&layout::entity_file(&ctx.root, FileEntity::KIND))?;
    let file = records::find(&files, name)
        .ok_or_else(|| ArmoryError::UnknownEntity { kind: FileEntity::KIND, key: name.to_owned() })?;
    if file.file_type != "file" {
        return Err(ArmoryError::InvalidInput {
            field: "file.type",
            reason: "only files of type 'file' have an editable template".to_owned(),
        }
        .into());
    }

    let template_path = layout::template(&ctx.root, name);
    let old_template = std::fs::read_to_string(&template_path).unwrap_or_default();
    let new_template = crate::editor::edit(&old_template)?;

    let environments: Vec<armory_core::model::catalog::Environment> =
        records::load(&layout::entity_file(&ctx.root, armory_core::model::catalog::Environment::KIND))?;
    let mut reapplied = Vec::new();
    for env in &environments {
        let patch_path = layout::patch(&ctx.root, &env.name, name);
        if !patch_path.exists() {
            continue;
        }
        let patch_content = std::fs::read_to_string(&patch_path).map_err(|source| ArmoryError::Io { path: patch_path.clone(), source })?;
        let applied = patch::apply(&new_template, &patch_content, name, &env.name)?;
        reapplied.push((env.name.clone(), applied));
    }

    if let Some(parent) = template_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ArmoryError::Io { path: parent.to_path_buf(), source })?;
    }
    std::fs::write(&template_path, &new_template).map_err(|source| ArmoryError::Io { path: template_path.clone(), source })?;

    for (env_name, applied) in &reapplied {
        let new_patch = patch::generate(&new_template, applied)?;
        let patch_path = layout::patch(&ctx.root, env_name, name);
        std::fs::write(&patch_path, &new_patch).map_err(|source| ArmoryError::Io { path: patch_path, source })?;
    }

    println!("updated template for '{name}' (run `armory commit` to persist)");
    Ok(())
}

/// Environment patch edit (§4.7): reconstruct the effective file, open the
/// editor, regenerate a context-format patch against the base, and show it
/// for confirmation before replacing `template/patch/<env>/<name>`.
fn edit_environment_patch(ctx: &AppContext, name: &str, environment: &str) -> anyhow::Result<()> {
    let user = operator()?;
    let tx = ctx.store.begin_modify(&user, false)?;
    tx.ensure_active()?;

    let effective = patch::reconstruct(&ctx.root, environment, name)?;
    let edited = crate::editor::edit(&effective)?;
    let base = std::fs::read_to_string(layout::template(&ctx.root, name))
        .map_err(|source| ArmoryError::Io { path: layout::template(&ctx.root, name), source })?;
    let new_patch = patch::generate(&base, &edited)?;

    println!("--- proposed patch for '{name}' in environment '{environment}' ---");
    println!("{new_patch}");
    println!("--- run `armory commit` to persist ---");

    let patch_path = layout::patch(&ctx.root, environment, name);
    if let Some(parent) = patch_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ArmoryError::Io { path: parent.to_path_buf(), source })?;
    }
    std::fs::write(&patch_path, &new_patch).map_err(|source| ArmoryError::Io { path: patch_path, source })
        .map_err(anyhow::Error::from)
}

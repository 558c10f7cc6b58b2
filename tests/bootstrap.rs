//! End-to-end bootstrap scenario: initialize a store, create entities,
//! place an application, assign a resource, and resolve variables.

mod common;

use common::{armory_fails, armory_ok, setup_store};

#[test]
fn init_seeds_an_empty_git_backed_store() {
    let dir = setup_store();
    assert!(dir.path().join(".git").exists());
    let out = armory_ok(dir.path(), &["doctor"]);
    assert!(out.contains("git: found"));
}

#[test]
fn commands_before_init_report_uninitialized() {
    let dir = tempfile::TempDir::new().unwrap();
    let stderr = armory_fails(dir.path(), &["application", "list"]);
    assert!(stderr.contains("not initialized") || stderr.contains("armory init"));
}

#[test]
fn create_list_show_application() {
    let dir = setup_store();
    armory_ok(dir.path(), &["build", "create", "api", "service", "--description", "API tier"]);
    armory_ok(dir.path(), &["application", "create", "billing", "B", "--build", "api"]);

    let list = armory_ok(dir.path(), &["application", "list"]);
    assert!(list.contains("billing"));

    let show = armory_ok(dir.path(), &["application", "show", "billing"]);
    assert!(show.contains("billing"));
    assert!(show.contains('B'));
}

#[test]
fn duplicate_application_name_is_rejected() {
    let dir = setup_store();
    armory_ok(dir.path(), &["application", "create", "billing", "B"]);
    let stderr = armory_fails(dir.path(), &["application", "create", "billing", "C"]);
    assert!(stderr.contains("billing"));
}

#[test]
fn place_application_then_unplace_releases_resources() {
    let dir = setup_store();
    armory_ok(dir.path(), &["application", "create", "billing", "B"]);
    armory_ok(dir.path(), &["environment", "create", "prod", "P"]);
    armory_ok(dir.path(), &["location", "create", "dal", "Dallas"]);
    armory_ok(dir.path(), &["resource", "create", "cluster_ip", "10.0.0.5"]);
    armory_ok(dir.path(), &[
        "resource", "assign", "10.0.0.5",
        "--location", "dal", "--environment", "prod", "--application", "billing",
    ]);

    armory_ok(dir.path(), &["environment", "application", "prod", "dal", "--place", "billing"]);
    let placements = armory_ok(dir.path(), &["environment", "application", "prod", "dal", "--list"]);
    assert!(placements.contains("billing"));

    let unplace_out = armory_ok(dir.path(), &["environment", "application", "prod", "dal", "--unplace", "billing"]);
    assert!(unplace_out.contains("10.0.0.5"));

    let resource_show = armory_ok(dir.path(), &["resource", "show", "10.0.0.5"]);
    assert!(resource_show.contains("not assigned"));
}

#[test]
fn constant_precedence_prefers_most_specific_scope() {
    let dir = setup_store();
    armory_ok(dir.path(), &["build", "create", "api", "service"]);
    armory_ok(dir.path(), &["application", "create", "billing", "B", "--build", "api"]);
    armory_ok(dir.path(), &["environment", "create", "prod", "P"]);
    armory_ok(dir.path(), &["location", "create", "dal", "Dallas"]);
    armory_ok(dir.path(), &["system", "create", "billing-prod", "api", "10.0.0.9", "dal", "prod"]);

    armory_ok(dir.path(), &["constant", "create", "pool_size"]);
    armory_ok(dir.path(), &["environment", "constant", "prod", "--set", "pool_size", "--value", "10"]);

    let vars = armory_ok(dir.path(), &["system", "vars", "billing-prod"]);
    assert!(vars.contains("POOL_SIZE") || vars.contains("pool_size"));
    assert!(vars.contains("10"));
}

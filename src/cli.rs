//! The `<tool> <subject> <verb> [args…]` CLI surface (§6).

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::format::OutputFormat;

#[derive(Parser)]
#[command(name = "armory", about = "Configuration-management authoring tool for a fleet of application servers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output rendering for list/show commands.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize an empty store, seeding empty entity files with an initial commit.
    Init,
    /// Run basic environment checks (VCS binary, patch utility, store state).
    Doctor,
    /// Squash-merge the current work branch into trunk.
    Commit {
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Discard the current work branch.
    Cancel {
        #[arg(long)]
        force: bool,
    },
    /// Show the difference between the current work branch and trunk.
    Diff,
    /// Generate shell completions.
    Completions { shell: Shell },

    Application(ApplicationArgs),
    Build(BuildArgs),
    Environment(EnvironmentArgs),
    Location(LocationArgs),
    Network(NetworkArgs),
    Constant(ConstantArgs),
    Resource(ResourceArgs),
    File(FileArgs),
    System(SystemArgs),
}

macro_rules! entity_args {
    ($name:ident, $verb:ty) => {
        #[derive(Args)]
        pub struct $name {
            #[command(subcommand)]
            pub verb: $verb,
        }
    };
}

entity_args!(ApplicationArgs, ApplicationVerb);
entity_args!(BuildArgs, BuildVerb);
entity_args!(EnvironmentArgs, EnvironmentVerb);
entity_args!(LocationArgs, LocationVerb);
entity_args!(NetworkArgs, NetworkVerb);
entity_args!(ConstantArgs, ConstantVerb);
entity_args!(ResourceArgs, ResourceVerb);
entity_args!(FileArgs, FileVerb);
entity_args!(SystemArgs, SystemVerb);

#[derive(Subcommand)]
pub enum ApplicationVerb {
    Create { name: String, alias: String, #[arg(long, default_value = "")] build: String, #[arg(long)] cluster: bool },
    List,
    Show { name: String },
    Update { name: String, #[arg(long)] alias: Option<String>, #[arg(long)] build: Option<String>, #[arg(long)] cluster: Option<bool> },
    Delete { name: String },
    File {
        name: String,
        #[arg(long)]
        add: Option<String>,
        #[arg(long)]
        remove: Option<String>,
        #[arg(long)]
        list: bool,
    },
}

#[derive(Subcommand)]
pub enum BuildVerb {
    Create { name: String, role: String, #[arg(long, default_value = "")] description: String },
    List,
    Show { name: String },
    Update { name: String, #[arg(long)] role: Option<String>, #[arg(long)] description: Option<String> },
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum EnvironmentVerb {
    Create { name: String, alias: String, #[arg(long, default_value = "")] description: String },
    List,
    Show { name: String },
    Update {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        alias: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { name: String },
    /// `environment application --place/--unplace/--list`, `--assign-resource`.
    Application {
        environment: String,
        location: String,
        #[arg(long)]
        place: Option<String>,
        #[arg(long)]
        unplace: Option<String>,
        #[arg(long)]
        list: bool,
        #[arg(long)]
        assign_resource: Option<String>,
        #[arg(long)]
        to_application: Option<String>,
    },
    /// `environment constant --set/--get`, scoped to this environment.
    Constant {
        environment: String,
        #[arg(long)]
        set: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LocationVerb {
    Create { code: String, name: String, #[arg(long, default_value = "")] description: String },
    List,
    Show { code: String },
    Update { code: String, #[arg(long)] name: Option<String>, #[arg(long)] description: Option<String> },
    Delete { code: String },
    /// `location environment …` network cache refresh / placement listing.
    Environment { code: String, environment: String },
}

#[derive(Subcommand)]
pub enum NetworkVerb {
    Create {
        location: String,
        zone: String,
        alias: String,
        net: String,
        mask: String,
        bits: String,
        gateway: String,
        vlan: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
    Show { location: String, zone: String, alias: String },
    Update {
        location: String,
        zone: String,
        alias: String,
        #[arg(long)]
        net: Option<String>,
        #[arg(long)]
        mask: Option<String>,
        #[arg(long)]
        bits: Option<String>,
        #[arg(long)]
        gateway: Option<String>,
        #[arg(long)]
        vlan: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { location: String, zone: String, alias: String },
}

#[derive(Subcommand)]
pub enum ConstantVerb {
    Create { name: String, #[arg(long, default_value = "")] description: String },
    List,
    Show { name: String },
    Update { name: String, #[arg(long)] description: Option<String> },
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum ResourceVerb {
    Create { kind: String, value: String, #[arg(long, default_value = "")] name: String, #[arg(long, default_value = "")] description: String },
    List,
    Show { value: String },
    Update { value: String, #[arg(long)] name: Option<String>, #[arg(long)] description: Option<String> },
    Delete { value: String },
    /// `resource <value> --assign/--unassign/--list`.
    Assign {
        value: String,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        environment: Option<String>,
        #[arg(long)]
        application: Option<String>,
    },
    Unassign { value: String },
}

#[derive(Subcommand)]
pub enum FileVerb {
    Create {
        name: String,
        path: String,
        #[arg(long = "type")]
        file_type: String,
        #[arg(long, default_value = "root")]
        owner: String,
        #[arg(long, default_value = "root")]
        group: String,
        #[arg(long, default_value = "644")]
        octal: String,
        #[arg(long, default_value = "")]
        target: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
    Show { name: String },
    Update {
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        path: Option<String>,
        #[arg(long = "type")]
        file_type: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        octal: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { name: String },
    /// Open `template/<name>` or `template/patch/<environment>/<name>` in `$EDITOR` (§4.7).
    Edit {
        name: String,
        #[arg(long)]
        environment: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SystemVerb {
    Create { name: String, build: String, ip: String, location: String, environment: String },
    List,
    Show { name: String },
    Update {
        name: String,
        #[arg(long)]
        build: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        environment: Option<String>,
    },
    Delete { name: String },
    /// `system <name> --release`.
    Release { name: String },
    /// `system <name> --audit`.
    Audit { name: String, #[arg(long)] host: Option<String> },
    /// `system <name> --vars`.
    Vars { name: String },
}

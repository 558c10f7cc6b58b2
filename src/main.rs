//! Entry point: parse arguments, build the per-invocation context, and
//! dispatch to the subject/verb handler (§6).

mod cli;
mod commands;
mod context;
mod editor;
mod format;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{Cli, Command};
use context::AppContext;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Command::Completions { shell } = cli.command {
        let mut command = Cli::command();
        let name = command.get_name().to_owned();
        generate(shell, &mut command, name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = context::require_root() {
        eprintln!("armory: {e}");
        std::process::exit(1);
    }

    let root = match std::env::var_os("ARMORY_STORE") {
        Some(value) => std::path::PathBuf::from(value),
        None => std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from(".")),
    };

    if !matches!(cli.command, Command::Init) && !root.join(".git").exists() {
        eprintln!("armory: {}", armory_core::ArmoryError::Uninitialized);
        std::process::exit(1);
    }

    let ctx = match AppContext::open(&root) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("armory: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&ctx, cli.command, cli.format) {
        eprintln!("armory: {e}");
        std::process::exit(1);
    }
}

fn run(ctx: &AppContext, command: Command, format: format::OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Init => commands::init(ctx),
        Command::Doctor => commands::doctor(ctx),
        Command::Commit { message } => commands::commit(ctx, message),
        Command::Cancel { force } => commands::cancel(ctx, force),
        Command::Diff => commands::diff(ctx),
        Command::Completions { .. } => unreachable!("handled before context was built"),
        Command::Application(args) => commands::run_application(ctx, args.verb, format),
        Command::Build(args) => commands::run_build(ctx, args.verb, format),
        Command::Environment(args) => commands::run_environment(ctx, args.verb, format),
        Command::Location(args) => commands::run_location(ctx, args.verb, format),
        Command::Network(args) => commands::run_network(ctx, args.verb, format),
        Command::Constant(args) => commands::run_constant(ctx, args.verb, format),
        Command::Resource(args) => commands::run_resource(ctx, args.verb, format),
        Command::File(args) => commands::run_file(ctx, args.verb, format),
        Command::System(args) => commands::run_system(ctx, args.verb, format),
    }
}

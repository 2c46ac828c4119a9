mod cmd;
mod layers;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, generate::GenerateArgs, persona::PersonaSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dorgu",
    about = "Generate Kubernetes manifests, GitOps and CI config, and an app persona from an application analysis",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .dorgu.yaml or .git/)
    #[arg(long, global = true, env = "DORGU_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a workspace .dorgu.yaml listing the built-in defaults
    Init,

    /// Generate manifests for an application and validate them
    Generate(GenerateArgs),

    /// Work with the ApplicationPersona on its own
    Persona {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },

    /// Manage the global configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Generate(args) => cmd::generate::run(&root, args, cli.json),
        Commands::Persona { subcommand } => cmd::persona::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

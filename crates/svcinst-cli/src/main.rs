mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, state::StateSubcommand};
use context::Context;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "svcinst",
    about = "Install, inspect and revert host services, recording what each install changed",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: /etc/svcinst/svcinst.yaml)
    #[arg(long, global = true, env = "SVCINST_CONFIG")]
    config: Option<PathBuf>,

    /// State database, overriding `state_db` from the config
    #[arg(long, global = true, env = "SVCINST_STATE_DB")]
    state_db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log debug detail, including per-step durations
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a service and enable it at boot, recording its prior state
    Install {
        service: String,
        /// Instance name passed through to `service <name> <verb> <instance>`
        #[arg(long)]
        instance: Option<String>,
    },

    /// Undo what `install` turned on
    Uninstall {
        service: String,
        #[arg(long)]
        instance: Option<String>,
    },

    /// Show whether a service is running, enabled and configured
    Status { service: String },

    /// Inspect or edit recorded state
    State {
        #[command(subcommand)]
        subcommand: StateSubcommand,
    },

    /// Print the service start-order table
    Order,

    /// Show or validate the configuration
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

    let result = Context::load(cli.config.as_deref(), cli.state_db.as_deref()).and_then(|ctx| {
        match cli.command {
            Commands::Install { service, instance } => {
                cmd::install::run(&ctx, &service, instance.as_deref(), cli.json)
            }
            Commands::Uninstall { service, instance } => {
                cmd::uninstall::run(&ctx, &service, instance.as_deref(), cli.json)
            }
            Commands::Status { service } => cmd::status::run(&ctx, &service, cli.json),
            Commands::State { subcommand } => cmd::state::run(&ctx, subcommand, cli.json),
            Commands::Order => cmd::order::run(cli.json),
            Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand, cli.json),
        }
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

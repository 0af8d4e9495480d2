mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::Query;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Setup builds its own configuration
        Command::Setup(args) => commands::setup::handle(args, &cli.global).await,

        // Config commands don't need a cloud connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "diafon", &mut std::io::stdout());
            Ok(())
        }

        // Long-running: push listener and polling stay up until Ctrl-C
        Command::Watch(args) => {
            let coordinator_config = config::resolve_coordinator_config(&cli.global)?;
            commands::watch::handle(coordinator_config, args, &cli.global).await
        }

        Command::OpenDoor(args) => commands::dispatch(Query::OpenDoor(args), &cli.global).await,
        Command::Locations => commands::dispatch(Query::Locations, &cli.global).await,
        Command::Calls(args) => commands::dispatch(Query::Calls(args), &cli.global).await,
        Command::Entities(args) => commands::dispatch(Query::Entities(args), &cli.global).await,
        Command::Snapshot(args) => commands::dispatch(Query::Snapshot(args), &cli.global).await,
    }
}

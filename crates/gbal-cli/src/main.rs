use clap::Parser;
use gbal_cli::cli::{Cli, Commands};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;
mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    let result = match &cli.command {
        Some(command @ Commands::Balance { .. }) => commands::balance::handle(command),
        Some(command @ Commands::NetPosition { .. }) => commands::net_position::handle(command),
        Some(Commands::Pf { command }) => commands::pf::handle(command),
        None => {
            info!("No command provided. Use --help for usage.");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

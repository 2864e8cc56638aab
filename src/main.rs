use std::process::ExitCode;

use clap::Parser;

use fleetcron::cli::{Cli, execute_command, load_and_merge_config};
use fleetcron::logger::init_logger;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logger(&settings.logger) {
        eprintln!("Logger initialization error: {}", e);
        return ExitCode::from(2);
    }

    match execute_command(&cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

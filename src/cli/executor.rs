//! Dispatches a parsed command to its handler.

use super::handlers::{MigrateCommandHandler, RunCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::AppResult;

/// Execute `cli` with already merged and validated `settings`.
///
/// Without a subcommand the worker runs with the configured settings.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    match &cli.command {
        Some(Commands::Run { dry_run, .. }) => {
            RunCommandHandler::new(settings).execute(*dry_run).await
        }
        None => RunCommandHandler::new(settings).execute(false).await,
        Some(Commands::Migrate { dry_run, rollback }) => {
            if let Some(steps) = rollback
                && *steps > 10
            {
                tracing::warn!(steps, "Rolling back a large number of migrations");
            }
            MigrateCommandHandler::new(settings)
                .execute(*dry_run, *rollback)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_execute_run_dry_run() {
        let cli = Cli::try_parse_from(["fleetcron", "run", "--dry-run"]).unwrap();
        assert!(execute_command(&cli, Settings::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_migrate_requires_database() {
        let cli = Cli::try_parse_from(["fleetcron", "migrate", "--dry-run"]).unwrap();
        assert!(execute_command(&cli, Settings::default()).await.is_err());
    }
}

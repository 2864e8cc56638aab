//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::build;

/// Distributed cron worker
#[derive(Parser, Debug)]
#[command(name = "fleetcron")]
#[command(about = "Distributed cron worker")]
#[command(long_about = "
fleetcron runs shell commands on cron schedules. Several workers can share a
job set: a distributed lock makes sure each scheduled run happens on exactly
one of them.

EXAMPLES:
    # Start a worker with the layered configuration in ./config
    fleetcron run

    # Use a single configuration file
    fleetcron --config /etc/fleetcron/worker.toml run

    # Start without the control API
    fleetcron run --no-server

    # Check configuration without starting
    fleetcron run --dry-run

    # Create the job_logs table
    fleetcron migrate
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute, `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load this TOML file instead of the layered files in the config
    /// directory. `FLEETCRON_*` environment overrides still apply.
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the worker (default)
    ///
    /// Examples:
    ///   fleetcron run                         # Start with defaults
    ///   fleetcron run --node-id worker-7      # Override the node id
    ///   fleetcron run --host 0.0.0.0          # Expose the control API
    Run {
        /// Control API bind address
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Control API port
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Disable the control API
        #[arg(long)]
        no_server: bool,

        /// Node id reported by this worker
        #[arg(long, value_name = "ID", value_parser = super::validation::validate_node_id)]
        node_id: Option<String>,

        /// Log level override, takes precedence over --verbose/--quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Database migration operations
    ///
    /// Examples:
    ///   fleetcron migrate                    # Apply all pending migrations
    ///   fleetcron migrate --dry-run          # Count pending migrations
    ///   fleetcron migrate --rollback 1       # Revert the last migration
    Migrate {
        /// Show pending migrations without applying
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of migrations to revert (1-100)
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["fleetcron", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["fleetcron"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from([
            "fleetcron",
            "run",
            "--port",
            "9000",
            "--node-id",
            "worker-7",
            "--no-server",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                port,
                node_id,
                no_server,
                dry_run,
                ..
            }) => {
                assert_eq!(port, Some(9000));
                assert_eq!(node_id.as_deref(), Some("worker-7"));
                assert!(no_server);
                assert!(!dry_run);
            }
            other => panic!("Expected Run command, got {other:?}"),
        }
    }

    #[test]
    fn test_env_aliases() {
        let cli = Cli::try_parse_from(["fleetcron", "--env", "stage"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Staging));
        let cli = Cli::try_parse_from(["fleetcron", "-e", "prod"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Production));
    }

    #[test]
    fn test_migrate_flags_conflict() {
        let err = Cli::try_parse_from(["fleetcron", "migrate", "--dry-run", "--rollback", "1"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["fleetcron", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}

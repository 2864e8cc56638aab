//! Applies CLI overrides on top of file and environment configuration.
//!
//! Precedence, lowest first: config files, `FLEETCRON_*` variables, global
//! flags (`--verbose`/`--quiet`), subcommand flags.

use std::path::Path;

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Environment, Settings};

pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration, optionally from a single file and for
    /// a forced environment.
    pub fn from_sources(
        config_path: Option<&Path>,
        environment: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(path) = config_path {
            loader = loader.with_config_file(path);
        }
        if let Some(environment) = environment {
            loader = loader.with_environment(environment);
        }
        Ok(Self::new(loader.load()?))
    }

    /// Return a validated copy of the base configuration with `cli` applied.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Some(Commands::Run {
            host,
            port,
            no_server,
            node_id,
            log_level,
            dry_run: _,
        }) = &cli.command
        {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if *no_server {
                config.server.enabled = false;
            }
            if let Some(node_id) = node_id {
                config.worker.node_id = node_id.clone();
            }
            if let Some(level) = log_level {
                config.logger.level = level.as_str().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn merge(args: &[&str]) -> Settings {
        let cli = Cli::try_parse_from(args).unwrap();
        ConfigurationMerger::new(Settings::default())
            .merge_cli_args(&cli)
            .unwrap()
    }

    #[test]
    fn test_global_log_flags() {
        assert_eq!(merge(&["fleetcron", "--verbose"]).logger.level, "debug");
        assert_eq!(merge(&["fleetcron", "--quiet"]).logger.level, "error");
    }

    #[test]
    fn test_run_overrides() {
        let config = merge(&[
            "fleetcron",
            "run",
            "--host",
            "0.0.0.0",
            "--port",
            "9100",
            "--node-id",
            "worker-9",
            "--no-server",
        ]);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert!(!config.server.enabled);
        assert_eq!(config.worker.node_id, "worker-9");
    }

    #[test]
    fn test_command_log_level_beats_global_flag() {
        let config = merge(&["fleetcron", "--verbose", "run", "--log-level", "warn"]);
        assert_eq!(config.logger.level, "warn");
    }

    #[test]
    fn test_migrate_leaves_config_untouched() {
        let config = merge(&["fleetcron", "migrate"]);
        assert_eq!(config, Settings::default());
    }

    #[test]
    fn test_merged_config_is_validated() {
        let mut base = Settings::default();
        base.scheduler.shell = String::new();
        let cli = Cli::try_parse_from(["fleetcron"]).unwrap();
        assert!(ConfigurationMerger::new(base).merge_cli_args(&cli).is_err());
    }
}

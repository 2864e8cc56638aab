//! Command-line interface: argument parsing, configuration merging and
//! the `run` / `migrate` command handlers.

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, LogLevel};

use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Load configuration from the sources `cli` points at, then apply its
/// overrides and validate the result.
pub fn load_and_merge_config(cli: &Cli) -> Result<Settings, ConfigError> {
    let merger =
        ConfigurationMerger::from_sources(cli.config.as_deref(), cli.env.map(Into::into))?;
    merger.merge_cli_args(cli)
}

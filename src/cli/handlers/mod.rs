//! Command handlers, one per subcommand.

pub mod migrate;
pub mod run;

pub use migrate::MigrateCommandHandler;
pub use run::RunCommandHandler;

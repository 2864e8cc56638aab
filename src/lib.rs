//! fleetcron
//!
//! A distributed cron worker. Every worker holds the full job set and
//! evaluates schedules locally; a per-job distributed lock decides which
//! worker actually runs each scheduled occurrence.

use shadow_rs::shadow;
shadow!(build);

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod lock;
pub mod logger;
pub mod schema;
pub mod sink;
pub mod state;
pub mod worker;

pub use state::AppState;
pub use worker::Worker;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}

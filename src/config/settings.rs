//! Configuration settings structures for fleetcron
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use serde::{Deserialize, Serialize};

use crate::jobs::Job;
use crate::logger::LoggerConfig;

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "fleetcron".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_node_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string())
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_idle_interval_ms() -> u64 {
    1000
}

fn default_jitter_max_ms() -> u64 {
    1000
}

fn default_shell() -> String {
    "/bin/bash".to_string()
}

fn default_lease_ms() -> u64 {
    5000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    4
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_redis_key_prefix() -> String {
    "fleetcron".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_commit_timeout_ms() -> u64 {
    1000
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8070
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Identity of this worker in the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Free-form node name, reported by `/health` and in startup logs.
    /// Defaults to `$HOSTNAME`.
    #[serde(default = "default_node_id")]
    pub node_id: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
        }
    }
}

// ============================================================================
// Scheduler Configuration
// ============================================================================

/// Engine queues, timing and job execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Capacity of the job event queue; producers wait when it is full
    #[serde(default = "default_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Capacity of the execution result queue
    #[serde(default = "default_queue_capacity")]
    pub result_queue_capacity: usize,

    /// Wake-up interval while no plan has a next fire time
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Upper bound of the random delay before taking a job's lock
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Shell used as `<shell> -c <command>`
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: default_queue_capacity(),
            result_queue_capacity: default_queue_capacity(),
            idle_interval_ms: default_idle_interval_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            shell: default_shell(),
        }
    }
}

// ============================================================================
// Lock Configuration
// ============================================================================

/// Lock backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    #[default]
    Memory,
    Redis,
}

/// Redis lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisLockConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,

    /// Prefix for every lock key
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisLockConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default)]
    pub backend: LockBackend,

    /// Lease length in milliseconds; renewed while the job runs
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,

    #[serde(default)]
    pub redis: RedisLockConfig,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: LockBackend::default(),
            lease_ms: default_lease_ms(),
            redis: RedisLockConfig::default(),
        }
    }
}

// ============================================================================
// Sink Configuration
// ============================================================================

/// Where execution log records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkBackend {
    #[default]
    Log,
    Postgres,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub backend: SinkBackend,

    /// Records per write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Longest a partial batch waits before it is written
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,

    /// Records buffered ahead of the writer; extra records are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            backend: SinkBackend::default(),
            batch_size: default_batch_size(),
            commit_timeout_ms: default_commit_timeout_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Diesel database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Whether to automatically run pending migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Control API server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete worker settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logger: LoggerConfig,

    /// Jobs pushed as SAVE events at startup
    #[serde(default)]
    pub jobs: Vec<Job>,
}

//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use std::collections::HashSet;

use crate::config::error::ConfigError;
use crate::config::settings::{
    DatabaseConfig, LockBackend, LockConfig, SchedulerConfig, ServerConfig, Settings, SinkBackend,
    SinkConfig,
};
use crate::jobs::parse_schedule;

impl SchedulerConfig {
    /// # Validation Rules
    /// - Queue capacities must be greater than 0
    /// - Idle interval must be greater than 0
    /// - Shell must not be empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::validation(
                "scheduler.event_queue_capacity",
                "Event queue capacity must be greater than 0.",
            ));
        }

        if self.result_queue_capacity == 0 {
            return Err(ConfigError::validation(
                "scheduler.result_queue_capacity",
                "Result queue capacity must be greater than 0.",
            ));
        }

        if self.idle_interval_ms == 0 {
            return Err(ConfigError::validation(
                "scheduler.idle_interval_ms",
                "Idle interval must be greater than 0 milliseconds.",
            ));
        }

        if self.shell.trim().is_empty() {
            return Err(ConfigError::validation(
                "scheduler.shell",
                "Shell cannot be empty.",
            ));
        }

        Ok(())
    }
}

impl LockConfig {
    /// # Validation Rules
    /// - Lease must be at least 100 milliseconds
    /// - With the redis backend: URL is a `redis://` or `rediss://` URL, pool size > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lease_ms < 100 {
            return Err(ConfigError::validation(
                "lock.lease_ms",
                "Lock lease must be at least 100 milliseconds.",
            ));
        }

        if self.backend == LockBackend::Redis {
            let url = &self.redis.url;
            if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                return Err(ConfigError::ValidationError {
                    field: "lock.redis.url".to_string(),
                    message: format!(
                        "Invalid Redis URL '{}'. Expected redis://host[:port] or rediss://host[:port]",
                        url
                    ),
                });
            }

            if self.redis.pool_size == 0 {
                return Err(ConfigError::validation(
                    "lock.redis.pool_size",
                    "Redis pool size must be greater than 0.",
                ));
            }

            if self.redis.key_prefix.trim().is_empty() {
                return Err(ConfigError::validation(
                    "lock.redis.key_prefix",
                    "Redis key prefix cannot be empty.",
                ));
            }
        }

        Ok(())
    }
}

impl SinkConfig {
    /// # Validation Rules
    /// - Batch size and queue capacity must be greater than 0
    /// - Commit timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::validation(
                "sink.batch_size",
                "Batch size must be greater than 0.",
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::validation(
                "sink.queue_capacity",
                "Sink queue capacity must be greater than 0.",
            ));
        }

        if self.commit_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "sink.commit_timeout_ms",
                "Commit timeout must be greater than 0 milliseconds.",
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate database configuration
    ///
    /// # Validation Rules
    /// - URL must be a `postgres://` or `postgresql://` URL
    /// - Max connections must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Please specify a valid database connection string.",
            ));
        }

        if !(self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")) {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Validate server configuration
    ///
    /// # Validation Rules
    /// - Port must be between 1 and 65535
    /// - Host must not be empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::validation(
                "server.host",
                "Server host cannot be empty.",
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate every section. The database section is only checked when
    /// the postgres sink needs it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.node_id.trim().is_empty() {
            return Err(ConfigError::validation(
                "worker.node_id",
                "Node id cannot be empty.",
            ));
        }

        self.scheduler.validate()?;
        self.lock.validate()?;
        self.sink.validate()?;

        if self.sink.backend == SinkBackend::Postgres {
            self.database.validate()?;
        }

        if self.server.enabled {
            self.server.validate()?;
        }

        self.logger
            .validate()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            })?;

        self.validate_jobs()
    }

    fn validate_jobs(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();

        for (index, job) in self.jobs.iter().enumerate() {
            if job.name.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    field: format!("jobs[{}].name", index),
                    message: "Job name cannot be empty.".to_string(),
                });
            }

            if !seen.insert(job.name.as_str()) {
                return Err(ConfigError::ValidationError {
                    field: format!("jobs[{}].name", index),
                    message: format!("Duplicate job name '{}'.", job.name),
                });
            }

            if let Err(e) = parse_schedule(&job.cron_expr) {
                return Err(ConfigError::ValidationError {
                    field: format!("jobs[{}].cron_expr", index),
                    message: e.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Job;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = SchedulerConfig {
            result_queue_capacity: 0,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "scheduler.result_queue_capacity")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_redis_url_checked_only_for_redis_backend() {
        let mut config = LockConfig::default();
        config.redis.url = "http://localhost".to_string();
        assert!(config.validate().is_ok());

        config.backend = LockBackend::Redis;
        assert!(config.validate().is_err());

        config.redis.url = "rediss://cache.internal:6380".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_required_for_postgres_sink() {
        let mut settings = Settings::default();
        settings.sink.backend = SinkBackend::Postgres;
        assert!(settings.validate().is_err());

        settings.database.url = "postgres://fleet:secret@db/fleetcron".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_disabled_server_skips_port_check() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());

        settings.server.enabled = false;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_seed_jobs_must_be_unique_and_parse() {
        let mut settings = Settings::default();
        settings.jobs = vec![
            Job::new("a", "true", "* * * * *"),
            Job::new("a", "true", "* * * * *"),
        ];
        match settings.validate() {
            Err(ConfigError::ValidationError { field, message }) => {
                assert_eq!(field, "jobs[1].name");
                assert!(message.contains("Duplicate"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        settings.jobs = vec![Job::new("a", "true", "every minute")];
        match settings.validate() {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "jobs[0].cron_expr"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_logger_errors_are_reported_under_logger() {
        let mut settings = Settings::default();
        settings.logger.level = "chatty".to_string();
        match settings.validate() {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "logger"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

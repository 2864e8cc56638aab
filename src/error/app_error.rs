use thiserror::Error;

use crate::config::ConfigError;
use crate::jobs::JobError;
use crate::logger::LoggerError;

/// Process-level error type.
///
/// Per-job failures never surface here; they travel as data inside
/// execution results. This covers startup, wiring and the control API.
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// The schedule engine no longer accepts events
    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::ValidationError { field, message } => AppError::Validation {
                field,
                reason: message,
            },
            other => AppError::Configuration {
                key: "settings".to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }
}

impl From<LoggerError> for AppError {
    fn from(error: LoggerError) -> Self {
        AppError::Configuration {
            key: "logger".to_string(),
            source: anyhow::Error::from(error),
        }
    }
}

impl From<JobError> for AppError {
    fn from(error: JobError) -> Self {
        match error {
            JobError::EngineStopped => AppError::Unavailable {
                message: error.to_string(),
            },
            JobError::InvalidCronExpression { .. } => AppError::BadRequest {
                message: error.to_string(),
            },
            other => AppError::Internal {
                source: anyhow::Error::from(other),
            },
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation_maps_to_validation() {
        let err: AppError = ConfigError::validation("server.port", "bad").into();
        match err {
            AppError::Validation { field, reason } => {
                assert_eq!(field, "server.port");
                assert_eq!(reason, "bad");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_engine_stopped_is_unavailable() {
        let err: AppError = JobError::EngineStopped.into();
        assert!(matches!(err, AppError::Unavailable { .. }));
    }

    #[test]
    fn test_lock_errors_are_internal() {
        let err: AppError = JobError::Lock("connection refused".into()).into();
        assert!(matches!(err, AppError::Internal { .. }));
    }
}

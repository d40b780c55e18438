//! Core error types for mealtimer-core.
//!
//! All error variants are defined with thiserror; nothing in the core
//! panics. Dangling trigger references and session-state misuse are not
//! errors at all -- the engine degrades or no-ops per the scheduling rules.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Core error type for mealtimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Estimation errors
    #[error("Estimation error: {0}")]
    Estimate(#[from] EstimateError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Requested meal does not exist
    #[error("Meal not found: {0}")]
    MealNotFound(Uuid),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Authoring-time validation errors for meals and timers.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Timer name is empty or whitespace
    #[error("Timer name must not be empty")]
    EmptyName,

    /// Timer duration below the one-second minimum
    #[error("Timer duration must be at least 1 second (got {0})")]
    NonPositiveDuration(u64),

    /// Trigger references a timer outside the meal
    #[error("Timer '{timer}' references trigger timer {reference} which is not in the meal")]
    UnknownTriggerTimer { timer: String, reference: Uuid },

    /// Trigger references the timer itself
    #[error("Timer '{timer}' must not trigger off itself")]
    SelfTrigger { timer: String },
}

/// Errors from the pure finish-offset estimator.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EstimateError {
    /// The on-complete trigger chain revisited a timer.
    #[error("Cyclic trigger dependency detected at timer {timer}")]
    CyclicDependency { timer: Uuid },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

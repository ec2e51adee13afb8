//! Core error types for novacal-core.
//!
//! Every public operation returns [`Result`] with a [`CoreError`]. Callers
//! switch on [`CoreError::kind`] instead of catching a generic failure at the
//! boundary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Core error type for novacal-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Scheduling and splitting request errors
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Field validation errors outside the scheduling contract
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was structurally invalid. Nothing was written.
    Validation,
    /// A referenced task or custom task is absent or not owned by the caller.
    NotFound,
    /// The repository failed. Nothing from the failed transaction is committed.
    Storage,
    /// Configuration could not be loaded or is invalid.
    Config,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Scheduling(err) => err.kind(),
            CoreError::Database(_) => ErrorKind::Storage,
            CoreError::Config(_) => ErrorKind::Config,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Errors raised by the allocator and the block splitter before any mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Invalid interval: end ({end}) must be after start ({start})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid duration: {minutes} minutes (must be positive)")]
    InvalidDuration { minutes: i64 },

    #[error("Invalid block duration: {minutes} minutes (must be positive when splitting)")]
    InvalidBlockDuration { minutes: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No tasks owned by '{owner_id}' match the request")]
    NoMatchingTasks { owner_id: String },
}

impl SchedulingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulingError::InvalidInterval { .. }
            | SchedulingError::InvalidDuration { .. }
            | SchedulingError::InvalidBlockDuration { .. } => ErrorKind::Validation,
            SchedulingError::NotFound(_) | SchedulingError::NoMatchingTasks { .. } => {
                ErrorKind::NotFound
            }
        }
    }
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors for user-supplied fields.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                DatabaseError::Locked
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

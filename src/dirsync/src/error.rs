//! Error types for the directory sync engine

use thiserror::Error;

/// Directory sync errors
///
/// Only structural failures surface here. Row-level misses (unknown group,
/// unmatched role specifier, unresolvable member or user) are logged and
/// skipped by the passes themselves.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid directory configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Directory connect, bind or search failure
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Directory search base does not exist
    #[error("Directory entry not found: {0}")]
    EntryNotFound(String),

    /// Malformed mapping input or invalid operation argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Directory group not present in the mirror
    #[error("Directory group not found: {0}")]
    GroupNotFound(String),

    /// Uniqueness violation in the mirror
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for directory sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

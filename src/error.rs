use thiserror::Error;

/// Main error type for Kintree
#[derive(Error, Debug)]
pub enum KintreeError {
    /// Database-related errors (store unavailable, constraint failures)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity lookup failed (person, branch, relationship, event...)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Privacy guard denied access to the requested resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request parameter rejected before any store access
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Duplicate relationship tuple (branch, from, to, type)
    #[error("Relationship already exists")]
    RelationshipExists,
}

/// Convenient Result type using KintreeError
pub type Result<T> = std::result::Result<T, KintreeError>;

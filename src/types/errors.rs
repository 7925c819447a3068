//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the RAG engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Registering an identifier that already exists (IPC ALREADY_EXISTS).
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),

    /// Operation references an unregistered process or resource (IPC NOT_FOUND).
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Allocation exceeds the instances currently available (IPC RESOURCE_EXHAUSTED).
    #[error("insufficient resource: {0}")]
    InsufficientResource(String),

    /// Non-positive counts, bad identifiers (IPC INVALID_ARGUMENT).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Snapshot is structurally invalid or inconsistent (IPC MALFORMED_STATE).
    #[error("malformed state: {0}")]
    MalformedState(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code string for IPC error responses.
    pub fn to_ipc_error_code(&self) -> &'static str {
        match self {
            Error::DuplicateEntity(_) => "ALREADY_EXISTS",
            Error::UnknownEntity(_) => "NOT_FOUND",
            Error::InsufficientResource(_) => "RESOURCE_EXHAUSTED",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::MalformedState(_) => "MALFORMED_STATE",
            Error::Serialization(_) | Error::Io(_) => "INTERNAL",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn duplicate_entity(msg: impl Into<String>) -> Self {
        Self::DuplicateEntity(msg.into())
    }

    pub fn unknown_entity(msg: impl Into<String>) -> Self {
        Self::UnknownEntity(msg.into())
    }

    pub fn insufficient_resource(msg: impl Into<String>) -> Self {
        Self::InsufficientResource(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn malformed_state(msg: impl Into<String>) -> Self {
        Self::MalformedState(msg.into())
    }
}

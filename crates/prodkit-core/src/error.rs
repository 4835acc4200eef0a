//! Shared error type across prodkit crates.

use thiserror::Error;

/// Stable error codes (used in HTTP error bodies and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Rejected configuration value.
    InvalidConfig,
    /// Unsupported config file version.
    UnsupportedVersion,
    /// Metrics sink failed to accept a measurement.
    Sink,
    /// Socket or file I/O failure.
    Io,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Sink => "SINK",
            ErrorCode::Io => "IO",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ProdkitError>;

/// Unified error type used by core and runtime.
#[derive(Debug, Error)]
pub enum ProdkitError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("sink: {0}")]
    Sink(String),
    #[error("io: {0}")]
    Io(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ProdkitError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProdkitError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            ProdkitError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            ProdkitError::Sink(_) => ErrorCode::Sink,
            ProdkitError::Io(_) => ErrorCode::Io,
            ProdkitError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<std::io::Error> for ProdkitError {
    fn from(e: std::io::Error) -> Self {
        ProdkitError::Io(e.to_string())
    }
}

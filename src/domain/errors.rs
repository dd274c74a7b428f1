//! Domain error types
//!
//! This module defines the error hierarchy for FileGuard. All errors are
//! domain-specific and don't expose third-party types through public
//! signatures.

use thiserror::Error;

/// Main FileGuard error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum FileGuardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// AV backend errors (connection, protocol, unexpected responses)
    #[error("AV scan error: {0}")]
    AvScan(String),

    /// The AV engine could not form a verdict. Distinct from a threat
    /// being found: a rejection is an engine-level failure and must
    /// trigger the fail-secure block disposition.
    #[error("AV engine '{engine}' rejected the scan (engine failure)")]
    AvScanRejected { engine: String },

    /// Quarantine storage errors
    #[error("Quarantine error: {0}")]
    Quarantine(#[from] QuarantineError),

    /// Audit persistence errors
    #[error("Audit error: {0}")]
    Audit(String),

    /// Rate limiter store errors
    #[error("Rate limit store error: {0}")]
    RateLimit(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl FileGuardError {
    /// Short variant name used in pipeline error strings
    /// (`step=<name> error=<kind>: <message>`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Extraction(ExtractionError::UnsupportedFormat(_)) => "UnsupportedFormatError",
            Self::Extraction(ExtractionError::CorruptInput(_)) => "CorruptInputError",
            Self::AvScan(_) => "AvScanError",
            Self::AvScanRejected { .. } => "AvScanRejectedError",
            Self::Quarantine(_) => "QuarantineError",
            Self::Audit(_) => "AuditError",
            Self::RateLimit(_) => "RateLimitError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
            Self::Other(_) => "Error",
        }
    }
}

/// Document extraction errors
///
/// Both kinds are structural and terminal: re-invoking extraction with the
/// same bytes cannot succeed.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared MIME type is not handled by the extractor
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file bytes could not be decoded as the declared format
    #[error("corrupt or malformed input: {0}")]
    CorruptInput(String),
}

/// Quarantine store errors
///
/// The disposition engine treats any quarantine failure as a hard failure
/// and falls back to a block outcome rather than passing the file through.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// The store could not persist the file
    #[error("quarantine store failed: {0}")]
    StoreFailed(String),
}

impl From<std::io::Error> for FileGuardError {
    fn from(err: std::io::Error) -> Self {
        FileGuardError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FileGuardError {
    fn from(err: serde_json::Error) -> Self {
        FileGuardError::Serialization(err.to_string())
    }
}

//! Result type alias for FileGuard
//!
//! This module provides a convenient Result type alias that uses
//! FileGuardError as the error type.

use super::errors::FileGuardError;

/// Result type alias using FileGuardError
pub type Result<T> = std::result::Result<T, FileGuardError>;

//! Domain types and models
//!
//! This module contains the core domain types for FileGuard: the error
//! hierarchy, the crate-wide Result alias, and the finding types shared
//! by the scan pipeline, disposition engine, and audit sinks.

pub mod errors;
pub mod findings;
pub mod result;

pub use errors::{ExtractionError, FileGuardError, QuarantineError};
pub use findings::{AvThreatFinding, Finding, PiiFinding, Severity};
pub use result::Result;

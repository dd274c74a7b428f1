//! Core business logic for FileGuard.
//!
//! This module contains the scan pipeline and the engines it
//! orchestrates.
//!
//! # Modules
//!
//! - [`pipeline`] - Pipeline orchestration and collaborator traits
//! - [`context`] - Mutable per-scan state shared by all steps
//! - [`patterns`] - Built-in UK pattern library plus custom pattern loading
//! - [`detector`] - Regex-based PII detection
//! - [`redaction`] - Offset-validated span replacement
//! - [`disposition`] - Rule-based block / quarantine / pass decisions
//!
//! # Scan Workflow
//!
//! 1. **Extract**: Decode the document into normalised text
//! 2. **AV Scan**: Check for malware (optional engine)
//! 3. **Detect**: Match PII patterns against the text
//! 4. **Redact**: Produce a redacted copy (optional, on request)
//! 5. **Disposition**: Resolve block / quarantine / pass per tenant rules
//! 6. **Audit**: Persist the outcome with hashed PII values
//!
//! Any step failure halts the scan with a `block` disposition; see
//! [`pipeline`] for the fail-secure contract.

pub mod context;
pub mod detector;
pub mod disposition;
pub mod patterns;
pub mod pipeline;
pub mod redaction;

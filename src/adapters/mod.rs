//! Concrete backends for the pipeline's collaborator traits.
//!
//! - [`text`] - Plain-text extraction with per-character byte offsets
//! - [`audit`] - Append-only JSONL audit sink with hashed PII values
//!
//! Adapters isolate external concerns (filesystem, encodings) behind
//! the pipeline's traits so the core stays testable with mocks.

pub mod audit;
pub mod text;

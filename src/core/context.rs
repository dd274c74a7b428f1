//! Shared scan state for the FileGuard pipeline
//!
//! [`ScanContext`] is created once per scan request and passed by mutable
//! reference through each pipeline step (extract, av_scan, pii_detect,
//! redact, disposition, audit). Each step reads its inputs from the
//! context and appends its results back, so all stages share a single
//! authoritative state object without coupling to each other directly.
//!
//! The context is never pooled or reused across requests; it is discarded
//! after the pipeline returns or fails.

use crate::domain::Finding;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Mutable shared state carried through the scan pipeline
///
/// Invariants:
/// - `byte_offsets.len() == extracted_text.chars().count()` whenever both
///   are populated.
/// - `metadata["disposition"]` is one of `pass`, `quarantine`, `block`
///   once the pipeline completes or fails; it is never absent and never
///   any other value.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Raw bytes of the file being scanned
    pub file_bytes: Vec<u8>,
    /// Declared MIME type (e.g. `application/pdf`)
    pub mime_type: String,
    /// Unique identifier for this scan, generated at construction
    pub scan_id: String,
    /// Tenant identifier, when the caller has resolved tenant identity
    pub tenant_id: Option<String>,
    /// Plain text produced by the extraction step; `None` until it runs
    pub extracted_text: Option<String>,
    /// Parallel to `extracted_text`: `byte_offsets[i]` is the best-effort
    /// byte offset in `file_bytes` of the i-th character. Extraction may
    /// only approximate offsets for formats without exact per-character
    /// provenance. Empty until extraction runs.
    pub byte_offsets: Vec<usize>,
    /// Findings accumulated by pipeline steps, in execution order
    pub findings: Vec<Finding>,
    /// Human-readable error strings recorded by pipeline steps. Non-empty
    /// errors do not themselves halt the pipeline; each step decides
    /// whether to continue.
    pub errors: Vec<String>,
    /// Open key-value bag for stage-produced diagnostics
    pub metadata: HashMap<String, Value>,
    /// When true, the redact step produces a stored redacted copy
    pub request_redaction: bool,
    /// Reference to the stored redacted output, when produced
    pub redacted_file_url: Option<String>,
}

impl ScanContext {
    /// Create a context for a new scan request
    pub fn new(file_bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            file_bytes,
            mime_type: mime_type.into(),
            scan_id: Uuid::new_v4().to_string(),
            tenant_id: None,
            extracted_text: None,
            byte_offsets: Vec::new(),
            findings: Vec::new(),
            errors: Vec::new(),
            metadata: HashMap::new(),
            request_redaction: false,
            redacted_file_url: None,
        }
    }

    /// Attach a tenant identity to this scan
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Request redaction output from the pipeline
    pub fn with_redaction_requested(mut self) -> Self {
        self.request_redaction = true;
        self
    }

    /// Insert a metadata value
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Read a metadata value as a string slice
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// The final disposition, once set by the pipeline
    pub fn disposition(&self) -> Option<&str> {
        self.metadata_str("disposition")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_scan_id() {
        let a = ScanContext::new(b"data".to_vec(), "text/plain");
        let b = ScanContext::new(b"data".to_vec(), "text/plain");
        assert!(!a.scan_id.is_empty());
        assert_ne!(a.scan_id, b.scan_id);
        assert!(a.extracted_text.is_none());
        assert!(a.byte_offsets.is_empty());
        assert!(a.findings.is_empty());
        assert!(a.errors.is_empty());
    }

    #[test]
    fn test_metadata_helpers() {
        let mut ctx = ScanContext::new(Vec::new(), "text/plain");
        assert!(ctx.disposition().is_none());
        ctx.set_metadata("disposition", "pass");
        assert_eq!(ctx.disposition(), Some("pass"));
        ctx.set_metadata("extracted_chars", 42);
        assert_eq!(ctx.metadata_str("extracted_chars"), None);
    }

    #[test]
    fn test_builder_helpers() {
        let ctx = ScanContext::new(Vec::new(), "application/pdf")
            .with_tenant("tenant-1")
            .with_redaction_requested();
        assert_eq!(ctx.tenant_id.as_deref(), Some("tenant-1"));
        assert!(ctx.request_redaction);
    }
}

//! End-to-end scan pipeline tests
//!
//! Wires real engines together with mock AV backends and verifies the
//! terminal contract: disposition is always set, failures always block,
//! successes reflect the configured rules.

use async_trait::async_trait;
use fileguard::adapters::audit::JsonlAuditSink;
use fileguard::adapters::text::PlainTextExtractor;
use fileguard::core::context::ScanContext;
use fileguard::core::detector::PiiDetector;
use fileguard::core::disposition::DispositionEngine;
use fileguard::core::pipeline::{
    AvEngine, AvScanResult, AvStatus, AuditSink, Redactor, ScanPipeline,
};
use fileguard::core::redaction::RedactionEngine;
use fileguard::domain::{AvThreatFinding, FileGuardError, Finding, Result};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

struct CleanAv;

#[async_trait]
impl AvEngine for CleanAv {
    async fn scan(&self, _bytes: &[u8]) -> Result<AvScanResult> {
        Ok(AvScanResult {
            status: AvStatus::Clean,
            findings: Vec::new(),
            engine: "mock-av".to_string(),
            duration_ms: 2,
        })
    }
}

struct FlaggingAv;

#[async_trait]
impl AvEngine for FlaggingAv {
    async fn scan(&self, _bytes: &[u8]) -> Result<AvScanResult> {
        Ok(AvScanResult {
            status: AvStatus::Flagged,
            findings: vec![Finding::AvThreat(AvThreatFinding {
                category: "trojan".to_string(),
                matched: "Win.Test.EICAR_HDB-1".to_string(),
            })],
            engine: "mock-av".to_string(),
            duration_ms: 2,
        })
    }
}

struct BrokenAv;

#[async_trait]
impl AvEngine for BrokenAv {
    async fn scan(&self, _bytes: &[u8]) -> Result<AvScanResult> {
        Err(FileGuardError::AvScan("daemon unreachable".to_string()))
    }
}

struct BrokenRedactor;

#[async_trait]
impl Redactor for BrokenRedactor {
    async fn redact(&self, _context: &ScanContext) -> Result<String> {
        Err(FileGuardError::Other("redaction backend failure".to_string()))
    }
}

struct BrokenAudit;

#[async_trait]
impl AuditSink for BrokenAudit {
    async fn record(&self, _context: &ScanContext) -> Result<()> {
        Err(FileGuardError::Audit("disk full".to_string()))
    }
}

fn full_pipeline(av: Arc<dyn AvEngine>) -> ScanPipeline {
    ScanPipeline::new(
        Arc::new(PlainTextExtractor::new()),
        Arc::new(PiiDetector::new()),
    )
    .with_av_engine(av)
    .with_redaction_engine(Arc::new(RedactionEngine::new()))
    .with_disposition_engine(Arc::new(DispositionEngine::new()))
}

#[tokio::test]
async fn test_clean_file_passes_end_to_end() {
    let dir = tempdir().unwrap();
    let audit_path = dir.path().join("audit.log");
    let pipeline = full_pipeline(Arc::new(CleanAv))
        .with_audit_sink(Arc::new(JsonlAuditSink::new(&audit_path, true).unwrap()));

    let mut ctx = ScanContext::new(b"quarterly report, nothing personal".to_vec(), "text/plain")
        .with_tenant("tenant-a");

    pipeline.run(&mut ctx).await.unwrap();

    assert_eq!(ctx.disposition(), Some("pass"));
    assert!(ctx.findings.is_empty());
    assert!(ctx.errors.is_empty());
    assert_eq!(ctx.metadata_str("av_status"), Some("clean"));

    let audit = std::fs::read_to_string(&audit_path).unwrap();
    assert!(audit.contains(&ctx.scan_id));
    assert!(audit.contains("\"disposition\":\"pass\""));
}

#[tokio::test]
async fn test_flagged_av_blocks_end_to_end() {
    let pipeline = full_pipeline(Arc::new(FlaggingAv));
    let mut ctx = ScanContext::new(b"malicious payload".to_vec(), "text/plain");

    pipeline.run(&mut ctx).await.unwrap();

    assert_eq!(ctx.disposition(), Some("block"));
    assert_eq!(ctx.metadata_str("av_status"), Some("flagged"));
    assert_eq!(
        ctx.metadata.get("av_threats"),
        Some(&json!(["Win.Test.EICAR_HDB-1"]))
    );
    assert!(ctx
        .findings
        .iter()
        .any(|f| f.as_av_threat().map(|t| t.category == "trojan") == Some(true)));
}

#[tokio::test]
async fn test_av_engine_error_fails_secure() {
    let pipeline = full_pipeline(Arc::new(BrokenAv));
    let mut ctx = ScanContext::new(b"payload".to_vec(), "text/plain");

    let err = pipeline.run(&mut ctx).await.unwrap_err();

    assert_eq!(err.step, "av_scan");
    assert_eq!(ctx.disposition(), Some("block"));
    assert_eq!(ctx.metadata.get("pipeline_failed"), Some(&json!(true)));
    assert_eq!(ctx.errors.len(), 1);
    assert!(ctx.errors[0].starts_with("step=av_scan error=AvScanError:"));
}

#[tokio::test]
async fn test_redactor_error_fails_secure() {
    let pipeline = ScanPipeline::new(
        Arc::new(PlainTextExtractor::new()),
        Arc::new(PiiDetector::new()),
    )
    .with_redaction_engine(Arc::new(BrokenRedactor));

    let mut ctx = ScanContext::new(b"contact jo@example.com".to_vec(), "text/plain");

    let err = pipeline.run(&mut ctx).await.unwrap_err();

    assert_eq!(err.step, "redact");
    assert_eq!(ctx.disposition(), Some("block"));
    assert_eq!(ctx.metadata.get("pipeline_failed"), Some(&json!(true)));
    // Findings collected before the failing step are preserved
    assert!(!ctx.findings.is_empty());
}

#[tokio::test]
async fn test_audit_error_fails_secure_after_disposition() {
    let pipeline = ScanPipeline::new(
        Arc::new(PlainTextExtractor::new()),
        Arc::new(PiiDetector::new()),
    )
    .with_audit_sink(Arc::new(BrokenAudit));

    let mut ctx = ScanContext::new(b"harmless".to_vec(), "text/plain");

    let err = pipeline.run(&mut ctx).await.unwrap_err();

    assert_eq!(err.step, "audit");
    // The audit failure overrides the pass the disposition step chose
    assert_eq!(ctx.disposition(), Some("block"));
    assert!(ctx.errors[0].starts_with("step=audit error=AuditError:"));
}

#[tokio::test]
async fn test_redaction_runs_through_pipeline() {
    let pipeline = ScanPipeline::new(
        Arc::new(PlainTextExtractor::new()),
        Arc::new(PiiDetector::new()),
    )
    .with_redaction_engine(Arc::new(RedactionEngine::new()))
    .with_disposition_engine(Arc::new(DispositionEngine::new()));

    let text = b"a@x.com then b@y.org and finally c@z.net".to_vec();
    let mut ctx = ScanContext::new(text, "text/plain");

    pipeline.run(&mut ctx).await.unwrap();

    let redacted = ctx
        .metadata
        .get("redacted_text")
        .and_then(|v| v.as_str())
        .unwrap();
    assert_eq!(
        redacted,
        "[REDACTED] then [REDACTED] and finally [REDACTED]"
    );
}

#[tokio::test]
async fn test_pii_quarantine_rules_without_store_block() {
    let rules = json!({ "on_pii": "quarantine" });
    let pipeline = ScanPipeline::new(
        Arc::new(PlainTextExtractor::new()),
        Arc::new(PiiDetector::new()),
    )
    .with_disposition_engine(Arc::new(DispositionEngine::new().with_rules(rules)));

    let mut ctx = ScanContext::new(b"NI number AB123456C on file".to_vec(), "text/plain");

    pipeline.run(&mut ctx).await.unwrap();

    // Quarantine without a configured store degrades to block
    assert_eq!(ctx.disposition(), Some("block"));
}

#[tokio::test]
async fn test_custom_rules_pass_pii_through() {
    let rules = json!({ "on_pii": "pass" });
    let pipeline = ScanPipeline::new(
        Arc::new(PlainTextExtractor::new()),
        Arc::new(PiiDetector::new()),
    )
    .with_disposition_engine(Arc::new(DispositionEngine::new().with_rules(rules)));

    let mut ctx = ScanContext::new(b"email: jo@example.com".to_vec(), "text/plain");

    pipeline.run(&mut ctx).await.unwrap();

    assert_eq!(ctx.disposition(), Some("pass"));
    assert!(!ctx.findings.is_empty());
}

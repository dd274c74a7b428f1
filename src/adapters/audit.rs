//! Append-only JSONL audit sink

use crate::core::context::ScanContext;
use crate::core::pipeline::AuditSink;
use crate::domain::{FileGuardError, Result};
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// One audit log line per completed scan
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: String,
    scan_id: String,
    tenant_id: Option<String>,
    mime_type: String,
    file_size_bytes: usize,
    disposition: Option<String>,
    findings_count: usize,
    errors_count: usize,
    findings: Vec<AuditFinding>,
}

/// A finding as persisted to the audit log (matched value hashed)
#[derive(Debug, Serialize)]
struct AuditFinding {
    kind: &'static str,
    category: String,
    severity: Option<String>,
    /// SHA-256 of the matched value; plaintext PII never reaches disk
    match_hash: String,
}

/// Audit sink writing one JSON line per scan to an append-only file
///
/// Matched values are hashed with SHA-256 before persistence so the
/// audit trail can correlate repeat findings without ever storing the
/// PII itself.
pub struct JsonlAuditSink {
    log_path: PathBuf,
    json_format: bool,
}

impl JsonlAuditSink {
    /// Create a sink writing to `log_path`, creating parent directories
    pub fn new(log_path: impl Into<PathBuf>, json_format: bool) -> Result<Self> {
        let log_path = log_path.into();
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            log_path,
            json_format,
        })
    }

    fn hash_match(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn build_entry(context: &ScanContext) -> AuditEntry {
        let findings = context
            .findings
            .iter()
            .map(|finding| match finding {
                crate::domain::Finding::Pii(pii) => AuditFinding {
                    kind: "pii",
                    category: pii.category.clone(),
                    severity: Some(pii.severity.as_str().to_string()),
                    match_hash: Self::hash_match(&pii.matched),
                },
                crate::domain::Finding::AvThreat(threat) => AuditFinding {
                    kind: "av_threat",
                    category: threat.category.clone(),
                    severity: None,
                    match_hash: Self::hash_match(&threat.matched),
                },
            })
            .collect();

        AuditEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scan_id: context.scan_id.clone(),
            tenant_id: context.tenant_id.clone(),
            mime_type: context.mime_type.clone(),
            file_size_bytes: context.file_bytes.len(),
            disposition: context.disposition().map(str::to_string),
            findings_count: context.findings.len(),
            errors_count: context.errors.len(),
            findings,
        }
    }

    fn write_entry(&self, entry: &AuditEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|err| {
                FileGuardError::Audit(format!(
                    "failed to open audit log {}: {err}",
                    self.log_path.display()
                ))
            })?;

        if self.json_format {
            let line = serde_json::to_string(entry)?;
            writeln!(file, "{line}")
                .map_err(|err| FileGuardError::Audit(format!("failed to write audit entry: {err}")))?;
        } else {
            writeln!(
                file,
                "[{}] scan={} tenant={} disposition={} findings={} errors={}",
                entry.timestamp,
                entry.scan_id,
                entry.tenant_id.as_deref().unwrap_or("-"),
                entry.disposition.as_deref().unwrap_or("-"),
                entry.findings_count,
                entry.errors_count,
            )
            .map_err(|err| FileGuardError::Audit(format!("failed to write audit entry: {err}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, context: &ScanContext) -> Result<()> {
        let entry = Self::build_entry(context);
        self.write_entry(&entry)?;
        debug!(
            scan_id = %context.scan_id,
            path = %self.log_path.display(),
            "Audit entry written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Finding, PiiFinding, Severity};
    use tempfile::tempdir;

    fn context_with_email() -> ScanContext {
        let mut ctx = ScanContext::new(b"mail me".to_vec(), "text/plain")
            .with_tenant("tenant-a");
        ctx.findings.push(Finding::Pii(PiiFinding {
            category: "EMAIL".to_string(),
            severity: Severity::Medium,
            matched: "alice@example.com".to_string(),
            offset: 0,
        }));
        ctx.set_metadata("disposition", "pass");
        ctx
    }

    #[tokio::test]
    async fn test_record_writes_jsonl_without_plaintext_pii() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit/scans.log");
        let sink = JsonlAuditSink::new(&path, true).unwrap();

        let ctx = context_with_email();
        sink.record(&ctx).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(&ctx.scan_id));
        assert!(content.contains("tenant-a"));
        assert!(content.contains("\"disposition\":\"pass\""));
        assert!(!content.contains("alice@example.com"));

        let parsed: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["findings_count"], 1);
        assert_eq!(parsed["findings"][0]["kind"], "pii");
        assert_eq!(
            parsed["findings"][0]["match_hash"],
            JsonlAuditSink::hash_match("alice@example.com")
        );
    }

    #[tokio::test]
    async fn test_record_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scans.log");
        let sink = JsonlAuditSink::new(&path, true).unwrap();

        sink.record(&context_with_email()).await.unwrap();
        sink.record(&context_with_email()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_plain_text_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scans.log");
        let sink = JsonlAuditSink::new(&path, false).unwrap();

        sink.record(&context_with_email()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("tenant=tenant-a"));
        assert!(content.contains("disposition=pass"));
        assert!(!content.contains("alice@example.com"));
    }

    #[test]
    fn test_hash_match_is_deterministic() {
        let a = JsonlAuditSink::hash_match("test@example.com");
        let b = JsonlAuditSink::hash_match("test@example.com");
        let c = JsonlAuditSink::hash_match("other@example.com");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

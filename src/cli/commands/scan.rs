//! Scan command implementation
//!
//! Runs a local file through the full scan pipeline and prints a JSON
//! report to stdout.

use crate::adapters::audit::JsonlAuditSink;
use crate::adapters::text::PlainTextExtractor;
use crate::config::{load_config, FileGuardConfig};
use crate::core::context::ScanContext;
use crate::core::detector::PiiDetector;
use crate::core::disposition::DispositionEngine;
use crate::core::pipeline::ScanPipeline;
use crate::core::redaction::RedactionEngine;
use anyhow::Context;
use clap::Args;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// File to scan
    pub file: PathBuf,

    /// MIME type of the file
    #[arg(long, default_value = "text/plain")]
    pub mime: String,

    /// Tenant identifier recorded with the scan
    #[arg(long)]
    pub tenant: Option<String>,

    /// Produce redacted output alongside the report
    #[arg(long)]
    pub redact: bool,

    /// JSON file of disposition rules (overrides configured rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// JSON file of custom detection patterns (overrides configured path)
    #[arg(long)]
    pub patterns: Option<PathBuf>,
}

impl ScanArgs {
    /// Execute the scan command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        // A missing config file is fine for ad-hoc scans; defaults apply.
        let config = if Path::new(config_path).exists() {
            load_config(config_path)?
        } else {
            FileGuardConfig::default()
        };

        let file_bytes = std::fs::read(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;

        let custom_patterns = self
            .patterns
            .clone()
            .or_else(|| config.patterns.custom_path.clone());
        let detector = match custom_patterns {
            Some(path) => PiiDetector::with_custom_patterns(&path),
            None => PiiDetector::new(),
        };

        let rules = match &self.rules {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Some(serde_json::from_str(&raw).context("Disposition rules are not valid JSON")?)
            }
            None => config.disposition.rules.clone(),
        };
        let mut disposition = DispositionEngine::new();
        if let Some(rules) = rules {
            disposition = disposition.with_rules(rules);
        }

        let mut pipeline = ScanPipeline::new(Arc::new(PlainTextExtractor::new()), Arc::new(detector))
            .with_disposition_engine(Arc::new(disposition));

        if self.redact {
            pipeline = pipeline
                .with_redaction_engine(Arc::new(RedactionEngine::with_token(config.redaction.token.as_str())));
        }

        if config.audit.enabled {
            let sink = JsonlAuditSink::new(&config.audit.log_path, config.audit.json_format)?;
            pipeline = pipeline.with_audit_sink(Arc::new(sink));
        }

        let mut context = ScanContext::new(file_bytes, self.mime.as_str());
        if let Some(tenant) = &self.tenant {
            context = context.with_tenant(tenant.as_str());
        }
        if self.redact {
            context = context.with_redaction_requested();
        }

        let run_result = pipeline.run(&mut context).await;

        let report = json!({
            "scan_id": context.scan_id,
            "file": self.file.display().to_string(),
            "mime_type": context.mime_type,
            "disposition": context.disposition(),
            "findings": context.findings.iter().map(|finding| {
                if let Some(pii) = finding.as_pii() {
                    json!({
                        "type": "pii",
                        "category": pii.category,
                        "severity": pii.severity.as_str(),
                        "offset": pii.offset,
                    })
                } else if let Some(threat) = finding.as_av_threat() {
                    json!({
                        "type": "av_threat",
                        "category": threat.category,
                        "match": threat.matched,
                    })
                } else {
                    json!(null)
                }
            }).collect::<Vec<_>>(),
            "errors": context.errors,
            "redacted_text": context.metadata.get("redacted_text"),
            "scan_duration_ms": context.metadata.get("scan_duration_ms"),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);

        let exit_code = match run_result {
            Err(_) => 4,
            Ok(()) => match context.disposition() {
                Some("pass") => 0,
                _ => 1,
            },
        };
        Ok(exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_scan_clean_file_exits_zero() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"nothing sensitive here").unwrap();
        file.flush().unwrap();

        let args = ScanArgs {
            file: file.path().to_path_buf(),
            mime: "text/plain".to_string(),
            tenant: None,
            redact: false,
            rules: None,
            patterns: None,
        };

        let code = args.execute("does-not-exist.toml").await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_scan_blocking_rules_exit_one() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"mail me at alice@example.com").unwrap();
        file.flush().unwrap();

        let mut rules = NamedTempFile::new().unwrap();
        rules.write_all(br#"{"on_pii": "block"}"#).unwrap();
        rules.flush().unwrap();

        let args = ScanArgs {
            file: file.path().to_path_buf(),
            mime: "text/plain".to_string(),
            tenant: None,
            redact: false,
            rules: Some(rules.path().to_path_buf()),
            patterns: None,
        };

        let code = args.execute("does-not-exist.toml").await.unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_scan_unsupported_mime_exits_four() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.7").unwrap();
        file.flush().unwrap();

        let args = ScanArgs {
            file: file.path().to_path_buf(),
            mime: "application/pdf".to_string(),
            tenant: None,
            redact: false,
            rules: None,
            patterns: None,
        };

        let code = args.execute("does-not-exist.toml").await.unwrap();
        assert_eq!(code, 4);
    }
}

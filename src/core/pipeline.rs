//! Scan pipeline orchestration
//!
//! [`ScanPipeline`] coordinates the six pipeline steps in order:
//!
//! 1. **extract**     - convert raw bytes to normalised text via an
//!    [`Extractor`]
//! 2. **av_scan**     - scan for malware via an [`AvEngine`] (optional)
//! 3. **pii_detect**  - detect PII patterns via
//!    [`PiiDetector`](crate::core::detector::PiiDetector)
//! 4. **redact**      - replace PII spans via a [`Redactor`] (optional)
//! 5. **disposition** - evaluate findings via a [`DispositionEvaluator`]
//!    (optional, with a built-in default)
//! 6. **audit**       - persist the result via an [`AuditSink`] (optional)
//!
//! Each step mutates the shared [`ScanContext`] in place and runs inside
//! a named tracing span so traces show the full execution tree with
//! per-step timing.
//!
//! **Fail-secure contract:** any error in any step immediately halts the
//! pipeline, sets `context.metadata["disposition"]` to `"block"`, appends
//! a structured error string to `context.errors`, and returns a
//! [`PipelineError`] identifying the failing step. The context is always
//! in a consistent (though potentially partial) state afterward, and a
//! failed scan can never be mistaken for a passed one by inspecting the
//! disposition. A caller cancelling mid-step surfaces as a step error
//! and takes the same terminal path.
//!
//! # Example
//!
//! ```no_run
//! use fileguard::adapters::text::PlainTextExtractor;
//! use fileguard::core::detector::PiiDetector;
//! use fileguard::core::pipeline::ScanPipeline;
//! use fileguard::core::context::ScanContext;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let pipeline = ScanPipeline::new(
//!     Arc::new(PlainTextExtractor::new()),
//!     Arc::new(PiiDetector::new()),
//! );
//! let mut context = ScanContext::new(b"hello".to_vec(), "text/plain");
//! if pipeline.run(&mut context).await.is_err() {
//!     // context.metadata["disposition"] is already "block"
//! }
//! println!("{:?}", context.disposition());
//! # }
//! ```

use crate::core::context::ScanContext;
use crate::core::detector::PiiDetector;
use crate::core::disposition::Action;
use crate::domain::{ExtractionError, FileGuardError, Finding, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn, Instrument};

/// Disposition applied whenever a pipeline step fails (fail-secure)
const FAIL_SECURE_DISPOSITION: &str = "block";

/// Raised when a pipeline step fails unrecoverably
///
/// Wraps the original error to identify which step failed while
/// preserving the cause chain.
#[derive(Debug, Error)]
#[error("Pipeline step '{step}' failed: {source}")]
pub struct PipelineError {
    /// Short name of the failing step (e.g. `extract`)
    pub step: &'static str,
    /// The error that triggered the pipeline failure
    #[source]
    pub source: FileGuardError,
}

/// Verdict reported by an AV engine for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvStatus {
    /// No threats found
    Clean,
    /// One or more threats found; the scan itself completed
    Flagged,
    /// The engine could not complete the scan. Never conflated with
    /// flagged: a rejection is an engine failure and triggers the
    /// fail-secure block.
    Rejected,
}

impl AvStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Flagged => "flagged",
            Self::Rejected => "rejected",
        }
    }
}

/// Result of one AV engine invocation
#[derive(Debug, Clone)]
pub struct AvScanResult {
    /// Scan verdict
    pub status: AvStatus,
    /// Threat findings; empty for a clean scan
    pub findings: Vec<Finding>,
    /// Engine name for metadata and audit
    pub engine: String,
    /// Engine-reported scan duration
    pub duration_ms: u64,
}

/// Extraction output: normalised text plus per-character byte offsets
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Extracted plain text
    pub text: String,
    /// `byte_offsets[i]` is the best-effort byte offset in the original
    /// file of the i-th character of `text`
    pub byte_offsets: Vec<usize>,
}

/// Document text extraction boundary
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract normalised text and byte offsets from raw file bytes
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] for unsupported formats or corrupt
    /// input; the pipeline treats either as a terminal step failure.
    async fn extract(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> std::result::Result<Extraction, ExtractionError>;
}

/// Malware scanning boundary
///
/// Backend errors must surface as `Err`, never as a silently clean
/// result, so that downstream disposition sees them.
#[async_trait]
pub trait AvEngine: Send + Sync {
    /// Scan raw bytes for malware
    async fn scan(&self, bytes: &[u8]) -> Result<AvScanResult>;
}

/// Redaction boundary for the `redact` step
#[async_trait]
pub trait Redactor: Send + Sync {
    /// Produce a redacted copy of the context's extracted text
    async fn redact(&self, context: &ScanContext) -> Result<String>;
}

/// Disposition boundary for the `disposition` step
#[async_trait]
pub trait DispositionEvaluator: Send + Sync {
    /// Evaluate findings in `context` and return the resolved action
    async fn evaluate(&self, context: &ScanContext) -> Result<Action>;
}

/// Audit persistence boundary for the `audit` step
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist the completed scan context to the audit log
    async fn record(&self, context: &ScanContext) -> Result<()>;
}

/// The ordered pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Extract,
    AvScan,
    PiiDetect,
    Redact,
    Disposition,
    Audit,
}

impl Step {
    const ALL: [Step; 6] = [
        Step::Extract,
        Step::AvScan,
        Step::PiiDetect,
        Step::Redact,
        Step::Disposition,
        Step::Audit,
    ];

    fn name(&self) -> &'static str {
        match self {
            Step::Extract => "extract",
            Step::AvScan => "av_scan",
            Step::PiiDetect => "pii_detect",
            Step::Redact => "redact",
            Step::Disposition => "disposition",
            Step::Audit => "audit",
        }
    }
}

/// Orchestrates the six-step scan pipeline
///
/// All collaborators are injected at construction so the pipeline can be
/// unit tested with mocks, without a real AV daemon, object store, or
/// database. Extraction and PII detection are mandatory; every other
/// step is skipped when its collaborator is absent.
pub struct ScanPipeline {
    extractor: Arc<dyn Extractor>,
    pii_detector: Arc<PiiDetector>,
    av_engine: Option<Arc<dyn AvEngine>>,
    redaction_engine: Option<Arc<dyn Redactor>>,
    disposition_engine: Option<Arc<dyn DispositionEvaluator>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl ScanPipeline {
    /// Create a minimal pipeline with only the mandatory collaborators
    pub fn new(extractor: Arc<dyn Extractor>, pii_detector: Arc<PiiDetector>) -> Self {
        Self {
            extractor,
            pii_detector,
            av_engine: None,
            redaction_engine: None,
            disposition_engine: None,
            audit_sink: None,
        }
    }

    /// Attach an AV engine; without one the `av_scan` step is skipped
    /// (useful for development environments without an AV daemon)
    pub fn with_av_engine(mut self, engine: Arc<dyn AvEngine>) -> Self {
        self.av_engine = Some(engine);
        self
    }

    /// Attach a redaction engine; without one the `redact` step is skipped
    pub fn with_redaction_engine(mut self, engine: Arc<dyn Redactor>) -> Self {
        self.redaction_engine = Some(engine);
        self
    }

    /// Attach a disposition evaluator; without one a built-in default rule
    /// is applied (see the `disposition` step)
    pub fn with_disposition_engine(mut self, engine: Arc<dyn DispositionEvaluator>) -> Self {
        self.disposition_engine = Some(engine);
        self
    }

    /// Attach an audit sink; without one the `audit` step is skipped
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Execute the full scan pipeline on `context`
    ///
    /// Runs the six steps in order, each inside a child tracing span.
    /// On success, `context.metadata["disposition"]` is one of `pass`,
    /// `quarantine`, or `block`. On failure in any step it is `block`,
    /// `context.metadata["pipeline_failed"]` is `true`, and the returned
    /// [`PipelineError`] identifies the failing step; the caller can
    /// still inspect the context for partial results.
    pub async fn run(
        &self,
        context: &mut ScanContext,
    ) -> std::result::Result<(), PipelineError> {
        let pipeline_start = Instant::now();
        let root_span = tracing::info_span!(
            "fileguard.scan",
            scan_id = %context.scan_id,
            tenant_id = context.tenant_id.as_deref().unwrap_or(""),
            mime_type = %context.mime_type,
            file_size_bytes = context.file_bytes.len(),
        );

        async {
            for step in Step::ALL {
                if let Err(err) = self.run_step(context, step).await {
                    let elapsed_ms = pipeline_start.elapsed().as_millis() as u64;
                    context.set_metadata("scan_duration_ms", elapsed_ms);
                    context.set_metadata("disposition", FAIL_SECURE_DISPOSITION);
                    context.set_metadata("pipeline_failed", true);

                    error!(
                        scan_id = %context.scan_id,
                        step = err.step,
                        error = %err.source,
                        "Scan pipeline failed"
                    );
                    return Err(err);
                }
            }

            let elapsed_ms = pipeline_start.elapsed().as_millis() as u64;
            context.set_metadata("scan_duration_ms", elapsed_ms);

            // Disposition is always set after a successful run.
            if context.disposition().is_none() {
                context.set_metadata("disposition", "pass");
            }

            info!(
                scan_id = %context.scan_id,
                disposition = context.disposition().unwrap_or(""),
                findings = context.findings.len(),
                duration_ms = elapsed_ms,
                "Scan pipeline complete"
            );
            Ok(())
        }
        .instrument(root_span)
        .await
    }

    /// Execute a single step inside a named child span
    ///
    /// On error: the error string is appended to `context.errors` in the
    /// form `step=<name> error=<kind>: <message>` and the error is
    /// wrapped in a [`PipelineError`] carrying the step name.
    async fn run_step(
        &self,
        context: &mut ScanContext,
        step: Step,
    ) -> std::result::Result<(), PipelineError> {
        let span = tracing::info_span!(
            "fileguard.step",
            step = step.name(),
            scan_id = %context.scan_id,
        );
        let step_start = Instant::now();

        let result = async {
            match step {
                Step::Extract => self.step_extract(context).await,
                Step::AvScan => self.step_av_scan(context).await,
                Step::PiiDetect => self.step_pii_detect(context).await,
                Step::Redact => self.step_redact(context).await,
                Step::Disposition => self.step_disposition(context).await,
                Step::Audit => self.step_audit(context).await,
            }
        }
        .instrument(span)
        .await;

        match result {
            Ok(()) => {
                debug!(
                    scan_id = %context.scan_id,
                    step = step.name(),
                    duration_ms = step_start.elapsed().as_millis() as u64,
                    "Pipeline step complete"
                );
                Ok(())
            }
            Err(err) => {
                context
                    .errors
                    .push(format!("step={} error={}: {err}", step.name(), err.kind()));
                Err(PipelineError {
                    step: step.name(),
                    source: err,
                })
            }
        }
    }

    /// Step 1: extract normalised text from the document
    async fn step_extract(&self, context: &mut ScanContext) -> Result<()> {
        let extraction = self
            .extractor
            .extract(&context.file_bytes, &context.mime_type)
            .await?;
        context.set_metadata("extracted_chars", extraction.text.chars().count());
        context.byte_offsets = extraction.byte_offsets;
        context.extracted_text = Some(extraction.text);
        Ok(())
    }

    /// Step 2: scan for malware with the configured AV engine
    ///
    /// Findings are appended to the shared findings list and engine
    /// metadata is recorded. A rejected status is an engine failure and
    /// is raised as a step error, which the fail-secure path turns into
    /// a block; a flagged result continues to normal disposition.
    async fn step_av_scan(&self, context: &mut ScanContext) -> Result<()> {
        let Some(engine) = self.av_engine.as_ref() else {
            debug!(
                scan_id = %context.scan_id,
                "av_scan step skipped: no AV engine configured"
            );
            return Ok(());
        };

        let result = engine.scan(&context.file_bytes).await?;
        let threat_names: Vec<String> = result
            .findings
            .iter()
            .filter_map(|f| f.as_av_threat())
            .map(|f| f.matched.clone())
            .collect();
        let findings_count = result.findings.len();
        context.findings.extend(result.findings);

        context.set_metadata("av_status", result.status.as_str());
        context.set_metadata("av_engine", result.engine.clone());
        context.set_metadata("av_duration_ms", result.duration_ms);

        if result.status == AvStatus::Rejected {
            return Err(FileGuardError::AvScanRejected {
                engine: result.engine,
            });
        }

        if result.status == AvStatus::Flagged {
            context.set_metadata("av_threats", json!(threat_names));
            warn!(
                scan_id = %context.scan_id,
                engine = %result.engine,
                threats = findings_count,
                "AV scan flagged threats"
            );
        }
        Ok(())
    }

    /// Step 3: detect PII patterns in the extracted text
    async fn step_pii_detect(&self, context: &mut ScanContext) -> Result<()> {
        self.pii_detector.scan(context);
        let pii_count = context.findings.iter().filter(|f| f.as_pii().is_some()).count();
        context.set_metadata("pii_findings_count", pii_count);
        Ok(())
    }

    /// Step 4: redact PII spans from the extracted text
    async fn step_redact(&self, context: &mut ScanContext) -> Result<()> {
        let Some(engine) = self.redaction_engine.as_ref() else {
            debug!(
                scan_id = %context.scan_id,
                "redact step skipped: no redaction engine configured"
            );
            return Ok(());
        };

        let redacted = engine.redact(context).await?;
        context.set_metadata("redacted_text", redacted);
        Ok(())
    }

    /// Step 5: determine the disposition action
    ///
    /// With an injected evaluator, delegates and stores the returned
    /// action. Otherwise applies the built-in default: block when the AV
    /// scan was flagged or AV-threat findings are present, pass for
    /// everything else (including PII-only findings). Callers wanting
    /// rule-based policy, including quarantine of PII-flagged files, must
    /// inject a [`DispositionEvaluator`].
    async fn step_disposition(&self, context: &mut ScanContext) -> Result<()> {
        if let Some(engine) = self.disposition_engine.as_ref() {
            let action = engine.evaluate(context).await?;
            context.set_metadata("disposition", action.as_str());
            return Ok(());
        }

        let av_flagged = context.metadata_str("av_status") == Some("flagged");
        let has_av_threat = context.findings.iter().any(|f| f.as_av_threat().is_some());

        let action = if av_flagged || has_av_threat {
            Action::Block
        } else {
            Action::Pass
        };
        context.set_metadata("disposition", action.as_str());
        Ok(())
    }

    /// Step 6: persist the scan result to the audit log
    async fn step_audit(&self, context: &mut ScanContext) -> Result<()> {
        let Some(sink) = self.audit_sink.as_ref() else {
            debug!(
                scan_id = %context.scan_id,
                "audit step skipped: no audit sink configured"
            );
            return Ok(());
        };

        sink.record(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::text::PlainTextExtractor;
    use crate::domain::AvThreatFinding;

    struct StaticAv(AvStatus);

    #[async_trait]
    impl AvEngine for StaticAv {
        async fn scan(&self, _bytes: &[u8]) -> Result<AvScanResult> {
            let findings = if self.0 == AvStatus::Flagged {
                vec![Finding::AvThreat(AvThreatFinding {
                    category: "test".to_string(),
                    matched: "Eicar-Test-Signature".to_string(),
                })]
            } else {
                Vec::new()
            };
            Ok(AvScanResult {
                status: self.0,
                findings,
                engine: "static".to_string(),
                duration_ms: 1,
            })
        }
    }

    fn minimal_pipeline() -> ScanPipeline {
        ScanPipeline::new(
            Arc::new(PlainTextExtractor::new()),
            Arc::new(PiiDetector::new()),
        )
    }

    #[tokio::test]
    async fn test_clean_run_defaults_to_pass() {
        let pipeline = minimal_pipeline();
        let mut ctx = ScanContext::new(b"nothing sensitive".to_vec(), "text/plain");

        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.disposition(), Some("pass"));
        assert!(ctx.errors.is_empty());
        assert!(ctx.findings.is_empty());
        assert!(ctx.metadata.contains_key("scan_duration_ms"));
    }

    #[tokio::test]
    async fn test_av_flagged_blocks_with_default_disposition() {
        let pipeline = minimal_pipeline().with_av_engine(Arc::new(StaticAv(AvStatus::Flagged)));
        let mut ctx = ScanContext::new(b"payload".to_vec(), "text/plain");

        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.disposition(), Some("block"));
        assert_eq!(ctx.findings.len(), 1);
        assert_eq!(ctx.metadata_str("av_status"), Some("flagged"));
    }

    #[tokio::test]
    async fn test_av_rejected_fails_pipeline() {
        let pipeline = minimal_pipeline().with_av_engine(Arc::new(StaticAv(AvStatus::Rejected)));
        let mut ctx = ScanContext::new(b"payload".to_vec(), "text/plain");

        let err = pipeline.run(&mut ctx).await.unwrap_err();

        assert_eq!(err.step, "av_scan");
        assert_eq!(ctx.disposition(), Some("block"));
        assert_eq!(ctx.metadata.get("pipeline_failed"), Some(&json!(true)));
        assert!(ctx.errors[0].contains("error=AvScanRejectedError"));
    }

    #[tokio::test]
    async fn test_extract_failure_records_step_error() {
        let pipeline = minimal_pipeline();
        let mut ctx = ScanContext::new(b"%PDF-1.7".to_vec(), "application/pdf");

        let err = pipeline.run(&mut ctx).await.unwrap_err();

        assert_eq!(err.step, "extract");
        assert_eq!(ctx.disposition(), Some("block"));
        assert!(ctx.errors[0].starts_with("step=extract error=UnsupportedFormatError"));
    }

    #[tokio::test]
    async fn test_pii_findings_pass_by_default() {
        let pipeline = minimal_pipeline();
        let mut ctx =
            ScanContext::new(b"Reach me at someone@example.com".to_vec(), "text/plain");

        pipeline.run(&mut ctx).await.unwrap();

        // PII-only findings pass under the built-in default; callers
        // wanting stricter policy inject a DispositionEvaluator.
        assert_eq!(ctx.disposition(), Some("pass"));
        assert!(!ctx.findings.is_empty());
        assert_eq!(
            ctx.metadata.get("pii_findings_count"),
            Some(&json!(ctx.findings.len()))
        );
    }
}

//! PII detection engine
//!
//! [`PiiDetector`] runs the compiled pattern set against text extracted
//! from a document and produces [`PiiFinding`] values. Each finding
//! carries the pattern category, severity, matched value, and the byte
//! offset of the match within the original file bytes (mapped via the
//! byte-offset list produced by the extraction step).
//!
//! Design notes:
//! - All patterns are pre-compiled at construction; no per-scan
//!   compilation occurs.
//! - Overlapping matches from different patterns are all reported
//!   independently; there is no de-duplication or priority merging. A
//!   reviewer judging severity needs every classifier's verdict.
//! - Empty input is a no-op: no findings, no error.
//! - The detector is immutable after construction and safe to share
//!   across concurrent scans.

use crate::core::context::ScanContext;
use crate::core::patterns::{load_patterns, PatternEntry};
use crate::domain::{Finding, PiiFinding};
use std::path::Path;
use tracing::{debug, info, warn};

/// Stateless PII scanning engine
pub struct PiiDetector {
    patterns: Vec<PatternEntry>,
}

impl PiiDetector {
    /// Create a detector using the built-in UK pattern set
    pub fn new() -> Self {
        Self {
            patterns: load_patterns(None),
        }
    }

    /// Create a detector with built-ins plus custom patterns from a JSON
    /// config file
    ///
    /// Malformed custom entries are skipped at load time (see
    /// [`load_patterns`]); detection itself never fails once construction
    /// succeeds.
    pub fn with_custom_patterns(custom_config_path: &Path) -> Self {
        Self {
            patterns: load_patterns(Some(custom_config_path)),
        }
    }

    /// Create a detector from an explicit pattern list
    pub fn with_patterns(patterns: Vec<PatternEntry>) -> Self {
        Self { patterns }
    }

    /// The patterns this detector runs, in evaluation order
    pub fn patterns(&self) -> &[PatternEntry] {
        &self.patterns
    }

    /// Run all patterns against `text` and return findings
    ///
    /// Each pattern is applied independently across the full text, one
    /// finding per non-overlapping match of that pattern. When
    /// `byte_offsets` is non-empty and the match's start character index
    /// is within bounds, the finding's offset is
    /// `byte_offsets[start_char_index]`; otherwise `-1`, which signals
    /// "byte position unknown", not "no match".
    pub fn detect(&self, text: &str, byte_offsets: &[usize]) -> Vec<PiiFinding> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut findings = Vec::new();

        for entry in &self.patterns {
            // Match positions come back as byte indices into `text`;
            // byte_offsets is indexed by character position, so track the
            // byte-to-char correspondence incrementally per pattern.
            let mut last_byte = 0usize;
            let mut last_char = 0usize;

            for matched in entry.regex.find_iter(text) {
                let matched = match matched {
                    Ok(m) => m,
                    Err(err) => {
                        // Backtracking limits can abort a match midway; the
                        // remaining text is skipped for this pattern only.
                        warn!(
                            pattern = %entry.name,
                            error = %err,
                            "Pattern evaluation aborted; skipping remainder for this pattern"
                        );
                        break;
                    }
                };

                let start_char =
                    last_char + text[last_byte..matched.start()].chars().count();
                last_byte = matched.start();
                last_char = start_char;

                let offset: i64 = match byte_offsets.get(start_char) {
                    Some(&byte_offset) => byte_offset as i64,
                    None => -1,
                };

                debug!(
                    category = %entry.category,
                    severity = %entry.severity,
                    offset,
                    "PII match"
                );

                findings.push(PiiFinding {
                    category: entry.category.clone(),
                    severity: entry.severity,
                    matched: matched.as_str().to_string(),
                    offset,
                });
            }
        }

        findings
    }

    /// Scan the text in `context` and append findings to
    /// `context.findings`
    ///
    /// This is the pipeline integration point. It is a no-op (no
    /// findings, no error) when `context.extracted_text` is absent or
    /// empty, which occurs when extraction was skipped or produced no
    /// output. Pre-existing findings from earlier stages are preserved.
    pub fn scan(&self, context: &mut ScanContext) {
        let text = match context.extracted_text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => {
                debug!(
                    scan_id = %context.scan_id,
                    "No extracted text in context; skipping PII detection"
                );
                return;
            }
        };

        let findings = self.detect(text, &context.byte_offsets);
        let count = findings.len();
        context
            .findings
            .extend(findings.into_iter().map(Finding::Pii));

        info!(scan_id = %context.scan_id, findings = count, "PII detection complete");
    }
}

impl Default for PiiDetector {
    fn default() -> Self {
        Self::new()
    }
}

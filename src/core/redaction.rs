//! PII span replacement and document reconstruction
//!
//! [`RedactionEngine`] takes a scan context populated with PII findings
//! and returns a redacted copy of the extracted text with every PII span
//! replaced by a configurable token (default `[REDACTED]`).
//!
//! # Algorithm
//!
//! 1. Resolve a character span for each PII finding. The primary path
//!    reverse-maps the finding's file byte offset to a character index
//!    through the extraction byte-offset list and validates the text
//!    slice against the matched value. The fallback path searches the
//!    text for occurrences of the matched value when the offset is
//!    unavailable or the slice mismatches (interpolated offsets from
//!    PDF/DOCX extraction commonly fail the validation).
//! 2. Sort spans by start and merge any that overlap or are adjacent,
//!    preventing double-redaction artefacts and index drift.
//! 3. Rebuild the output in a single left-to-right pass, alternating
//!    untouched segments with the replacement token. Equivalent to
//!    right-to-left in-place splicing, without index invalidation.
//!
//! All spans are character-index based, so multi-byte text can never be
//! cut mid-codepoint. The engine holds no per-call state and is safe to
//! share across concurrent scans. The context is never mutated; callers
//! needing persistence must store the returned string themselves.

use crate::core::context::ScanContext;
use crate::domain::PiiFinding;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Stateless PII span replacement engine
pub struct RedactionEngine {
    token: String,
}

impl RedactionEngine {
    /// Default replacement token
    pub const DEFAULT_TOKEN: &'static str = "[REDACTED]";

    /// Create an engine using the default `[REDACTED]` token
    pub fn new() -> Self {
        Self::with_token(Self::DEFAULT_TOKEN)
    }

    /// Create an engine with a custom replacement token
    /// (e.g. `"[PII REMOVED]"` or a masking glyph run)
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Redact PII spans in `context.extracted_text`
    ///
    /// Reads PII findings from `context.findings` (findings of any other
    /// kind are ignored entirely), locates each matched span, merges
    /// overlapping or adjacent spans, and returns a new string with those
    /// spans replaced by the token.
    ///
    /// Returns an empty string when there is no extracted text, and the
    /// original text unchanged when there are no PII findings.
    pub fn redact(&self, context: &ScanContext) -> String {
        let text = context.extracted_text.as_deref().unwrap_or("");
        if text.is_empty() {
            debug!(
                scan_id = %context.scan_id,
                "No extracted text; returning empty redaction output"
            );
            return String::new();
        }

        let pii_findings: Vec<&PiiFinding> =
            context.findings.iter().filter_map(|f| f.as_pii()).collect();

        if pii_findings.is_empty() {
            debug!(scan_id = %context.scan_id, "No PII findings; text unchanged");
            return text.to_string();
        }

        let chars: Vec<char> = text.chars().collect();
        let spans = self.collect_spans(text, &chars, &context.byte_offsets, &pii_findings);
        let merged = merge_spans(spans);
        let result = apply_replacements(&chars, &merged, &self.token);

        info!(
            scan_id = %context.scan_id,
            spans_merged = merged.len(),
            input_chars = chars.len(),
            output_chars = result.chars().count(),
            "Redaction complete"
        );
        result
    }

    /// Resolve `(start, end)` character spans for the given findings
    ///
    /// Primary path: reverse-map the finding's file byte offset to a
    /// character index (first character observed at a byte offset wins on
    /// duplicates) and accept the span only when the text slice equals
    /// the matched value exactly.
    ///
    /// Fallback path: claim occurrences of the matched value left to
    /// right. Each distinct match value is expanded once to all of its
    /// occurrences, so repeated PII values in the same document are all
    /// redacted; start positions already consumed by an earlier span are
    /// skipped. Findings with an empty match, or whose match appears
    /// nowhere in the text, contribute no span.
    fn collect_spans(
        &self,
        text: &str,
        chars: &[char],
        byte_offsets: &[usize],
        findings: &[&PiiFinding],
    ) -> Vec<(usize, usize)> {
        // File byte offset -> character index; first observation wins.
        let mut offset_to_char: HashMap<usize, usize> = HashMap::new();
        for (char_index, &byte_offset) in byte_offsets.iter().enumerate() {
            offset_to_char.entry(byte_offset).or_insert(char_index);
        }

        // Text byte index -> character index, for converting match_indices
        // positions on multi-byte text.
        let byte_to_char: HashMap<usize, usize> = text
            .char_indices()
            .enumerate()
            .map(|(char_index, (byte_index, _))| (byte_index, char_index))
            .collect();

        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut consumed_starts: HashSet<usize> = HashSet::new();
        let mut searched_values: HashSet<&str> = HashSet::new();

        for finding in findings {
            if finding.matched.is_empty() {
                continue;
            }
            let match_chars: Vec<char> = finding.matched.chars().collect();

            // Primary path: exact byte-offset reverse mapping.
            if finding.offset >= 0 {
                if let Some(&start) = offset_to_char.get(&(finding.offset as usize)) {
                    let end = start + match_chars.len();
                    if chars.len() >= end && chars[start..end] == match_chars[..] {
                        debug!(start, end, category = %finding.category, "Span via byte offset");
                        consumed_starts.insert(start);
                        spans.push((start, end));
                        continue;
                    }
                }
            }

            // Fallback path: literal occurrence search. All occurrences of
            // a distinct value are claimed on its first resolution.
            if !searched_values.insert(finding.matched.as_str()) {
                continue;
            }
            for (byte_pos, _) in text.match_indices(finding.matched.as_str()) {
                let start = byte_to_char[&byte_pos];
                if !consumed_starts.insert(start) {
                    continue;
                }
                let end = start + match_chars.len();
                debug!(start, end, category = %finding.category, "Span via occurrence search");
                spans.push((start, end));
            }
        }

        spans
    }
}

impl Default for RedactionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge overlapping and adjacent `(start, end)` spans
///
/// Returns a sorted list of disjoint spans covering the union of the
/// input. Adjacent spans (one ending exactly where the next begins) fold
/// into a single span so a contiguous region yields one token.
fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    if spans.is_empty() {
        return spans;
    }

    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    merged.push(spans[0]);

    for (start, end) in spans.into_iter().skip(1) {
        let (_, last_end) = merged.last_mut().expect("merged is non-empty");
        if start <= *last_end {
            *last_end = (*last_end).max(end);
        } else {
            merged.push((start, end));
        }
    }

    merged
}

/// Rebuild the text with merged spans replaced by the token
///
/// Single left-to-right pass over the sorted, merged span list, O(n) in
/// the character count.
fn apply_replacements(chars: &[char], spans: &[(usize, usize)], token: &str) -> String {
    if spans.is_empty() {
        return chars.iter().collect();
    }

    let mut out = String::with_capacity(chars.len());
    let mut prev_end = 0usize;

    for &(start, end) in spans {
        out.extend(&chars[prev_end..start]);
        out.push_str(token);
        prev_end = end;
    }
    out.extend(&chars[prev_end..]);
    out
}

#[async_trait::async_trait]
impl crate::core::pipeline::Redactor for RedactionEngine {
    /// Run the engine as the pipeline's redact step
    ///
    /// Redaction is infallible: a context with no locatable spans yields
    /// the text unchanged rather than an error.
    async fn redact(&self, context: &ScanContext) -> crate::domain::Result<String> {
        Ok(RedactionEngine::redact(self, context))
    }
}

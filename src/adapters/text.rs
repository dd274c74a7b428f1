//! Plain-text document extraction

use crate::core::pipeline::{Extraction, Extractor};
use crate::domain::ExtractionError;
use async_trait::async_trait;
use tracing::debug;

/// MIME types treated as plain text
const TEXT_MIME_TYPES: [&str; 4] = ["text/plain", "text/csv", "text/markdown", "text/x-log"];

/// Extractor for plain-text documents
///
/// Decodes bytes as UTF-8 (lossily, so malformed sequences degrade to
/// replacement characters instead of failing the scan) and records the
/// byte offset of each character's first byte so downstream findings can
/// point back into the original file.
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn supports(mime_type: &str) -> bool {
        // Parameters like "; charset=utf-8" are irrelevant here
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or(mime_type)
            .trim()
            .to_ascii_lowercase();
        TEXT_MIME_TYPES.contains(&essence.as_str())
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    async fn extract(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> std::result::Result<Extraction, ExtractionError> {
        if !Self::supports(mime_type) {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "no extractor registered for MIME type '{mime_type}'"
            )));
        }

        let text = String::from_utf8_lossy(bytes).into_owned();
        // Lossy decoding can change byte lengths, so offsets are computed
        // against the decoded text, not the raw input.
        let byte_offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();

        debug!(
            mime_type,
            input_bytes = bytes.len(),
            chars = byte_offsets.len(),
            "Extracted plain text"
        );
        Ok(Extraction { text, byte_offsets })
    }
}

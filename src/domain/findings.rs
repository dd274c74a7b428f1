//! Scan finding types
//!
//! Findings are the heterogeneous per-scan detections accumulated on the
//! shared scan context: AV threat matches from the malware engine and PII
//! matches from the pattern detector. The two kinds share a tagged
//! representation so that audit records and API payloads carry a single
//! `type` discriminator, mirroring their wire shape.

use serde::{Deserialize, Serialize};

/// Severity assigned to a PII pattern match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a severity string, returning `None` for unrecognized values
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Lowercase label used in reason strings and audit payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single PII detection finding
///
/// `matched` holds the exact substring that matched. Callers persisting
/// findings to secondary stores (audit logs, SIEM) must hash or redact
/// that field before storage so raw PII never lands in a secondary store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiFinding {
    /// Pattern category that produced this finding (e.g. `NI_NUMBER`)
    pub category: String,
    /// Severity assigned by the matching pattern
    pub severity: Severity,
    /// The exact matched substring
    #[serde(rename = "match")]
    pub matched: String,
    /// Best-effort byte offset of the match start in the original file
    /// bytes, or `-1` when byte-offset mapping was unavailable
    pub offset: i64,
}

/// A single AV threat finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvThreatFinding {
    /// Threat category or signature family reported by the engine
    pub category: String,
    /// Signature or threat name that matched
    #[serde(rename = "match")]
    pub matched: String,
}

/// A detection attached to a scan, tagged by kind
///
/// The order of findings on a scan context reflects pipeline execution
/// order, not severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    AvThreat(AvThreatFinding),
    Pii(PiiFinding),
}

impl Finding {
    /// Borrow the PII payload when this is a PII finding
    pub fn as_pii(&self) -> Option<&PiiFinding> {
        match self {
            Finding::Pii(f) => Some(f),
            _ => None,
        }
    }

    /// Borrow the AV payload when this is an AV threat finding
    pub fn as_av_threat(&self) -> Option<&AvThreatFinding> {
        match self {
            Finding::AvThreat(f) => Some(f),
            _ => None,
        }
    }
}

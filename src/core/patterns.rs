//! Built-in UK PII pattern library
//!
//! This module provides a curated set of pre-compiled regular expressions
//! covering the five primary UK PII types scanned by the pipeline:
//!
//! - National Insurance (NI) numbers
//! - NHS numbers
//! - Email addresses
//! - UK telephone numbers
//! - UK postcodes
//!
//! Additional organisation-specific patterns can be supplied at startup via
//! a JSON config file (see [`load_patterns`]). Custom patterns are appended
//! after the built-in set and returned as a single pre-compiled list. No
//! regex compilation occurs at scan time.
//!
//! The built-in table is compiled once per process behind a `OnceLock` and
//! never mutated afterward, so it is safe to share by reference across all
//! detector instances and concurrent scans.
//!
//! # JSON config format
//!
//! An array of objects at the root:
//!
//! ```json
//! [
//!     { "name": "EMPLOYEE_ID", "pattern": "EMP-\\d{6}", "severity": "medium" }
//! ]
//! ```
//!
//! Valid severities: `low`, `medium`, `high`, `critical`. An optional
//! `category` key overrides the finding category (defaults to `name`).

use crate::domain::Severity;
use fancy_regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};

// National Insurance number.
// Two prefix letters + six digits + one suffix letter (A-D).
// First letter excludes D, F, I, Q, U, V; second additionally excludes O.
// Accepts the compact form (AA123456C) and the spaced card form
// (AA 12 34 56 C).
const NI_NUMBER: &str =
    r"(?i)\b[A-CEGHJ-PR-TW-Z][A-CEGHJ-NPR-TW-Z]\s?(?:\d{2}\s?){3}[A-D]\b";

// NHS number. Ten digits displayed as 3-3-4 groups separated by spaces or
// hyphens. Check-digit validation requires procedural code and is out of
// scope for the pattern library.
const NHS_NUMBER: &str = r"\b\d{3}[\s\-]?\d{3}[\s\-]?\d{4}\b";

// Email address. High recall over strict RFC 5321 precision: the domain
// must contain a dot and a TLD of at least two letters.
const EMAIL: &str = r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b";

// UK telephone number. Accepts the +44/0044 international prefix or the
// national 0 prefix, followed by 9-12 digits with optional space/hyphen
// separators. Lookbehind/lookahead are used instead of \b because the
// international form starts with '+', a non-word character.
const UK_PHONE: &str =
    r"(?i)(?<!\w)(?:(?:\+44|0044)[\s\-]?\d[\d\s\-]{7,12}\d|0\d[\d\s\-]{7,12}\d)(?!\d)";

// UK postcode. Covers all Royal Mail outward/inward layouts with an
// optional single internal space. The inward code is always a digit
// followed by two letters.
const UK_POSTCODE: &str = r"(?i)\b[A-Z]{1,2}\d[A-Z\d]?\s?\d[A-Z]{2}\b";

/// An immutable, pre-compiled PII pattern entry
#[derive(Debug, Clone)]
pub struct PatternEntry {
    /// Pattern identifier (e.g. `NI_NUMBER`)
    pub name: String,
    /// Pre-compiled regular expression
    pub regex: Regex,
    /// Severity assigned to a positive match
    pub severity: Severity,
    /// Finding category, defaults to `name` for custom entries
    pub category: String,
}

impl PatternEntry {
    fn builtin(name: &str, raw: &str, severity: Severity) -> Self {
        Self {
            name: name.to_string(),
            regex: Regex::new(raw).expect("built-in PII pattern failed to compile"),
            severity,
            category: name.to_string(),
        }
    }
}

static BUILTIN_PATTERNS: OnceLock<Vec<PatternEntry>> = OnceLock::new();

/// The five built-in UK patterns in canonical order
///
/// Compiled once per process on first use; the returned slice is shared
/// read-only across all detector instances.
pub fn builtin_patterns() -> &'static [PatternEntry] {
    BUILTIN_PATTERNS.get_or_init(|| {
        vec![
            PatternEntry::builtin("NI_NUMBER", NI_NUMBER, Severity::High),
            PatternEntry::builtin("NHS_NUMBER", NHS_NUMBER, Severity::High),
            PatternEntry::builtin("EMAIL", EMAIL, Severity::Medium),
            PatternEntry::builtin("UK_PHONE", UK_PHONE, Severity::Medium),
            PatternEntry::builtin("UK_POSTCODE", UK_POSTCODE, Severity::Low),
        ]
    })
}

/// Return the pre-compiled pattern list, optionally extended with custom
/// patterns from a JSON config file
///
/// Always includes all five built-in UK patterns. When `custom_config_path`
/// is given, patterns from that file are appended after the built-ins, in
/// file order. If a custom entry shares a name with a built-in, both are
/// retained; the built-in appears first and a warning is logged.
///
/// Malformed entries (missing keys, invalid severity, un-compilable regex)
/// are skipped with a warning so the application can start with the valid
/// patterns even when the config contains errors. A missing or unreadable
/// file, invalid JSON, or a non-array root degrades to built-ins only.
/// This function never fails.
pub fn load_patterns(custom_config_path: Option<&Path>) -> Vec<PatternEntry> {
    let mut patterns: Vec<PatternEntry> = builtin_patterns().to_vec();

    let Some(path) = custom_config_path else {
        return patterns;
    };

    let raw_text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "Cannot read custom PII pattern config; using built-in patterns only"
            );
            return patterns;
        }
    };

    let entries: Value = match serde_json::from_str(&raw_text) {
        Ok(value) => value,
        Err(err) => {
            error!(
                path = %path.display(),
                error = %err,
                "Invalid JSON in custom PII pattern config; using built-in patterns only"
            );
            return patterns;
        }
    };

    let Some(entries) = entries.as_array() else {
        error!(
            path = %path.display(),
            "Custom PII pattern config must contain a JSON array at the root; \
             using built-in patterns only"
        );
        return patterns;
    };

    let builtin_names: Vec<&str> = builtin_patterns().iter().map(|p| p.name.as_str()).collect();
    let mut loaded = 0usize;

    for (index, entry) in entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            warn!(index, "Custom PII pattern entry is not a JSON object; skipping");
            continue;
        };

        let Some(name) = entry.get("name").and_then(Value::as_str).filter(|n| !n.is_empty())
        else {
            warn!(index, "Custom PII pattern entry missing valid 'name'; skipping");
            continue;
        };

        let Some(raw_pattern) = entry
            .get("pattern")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
        else {
            warn!(index, name, "Custom PII pattern missing valid 'pattern'; skipping");
            continue;
        };

        let Some(severity) = entry
            .get("severity")
            .and_then(Value::as_str)
            .and_then(Severity::parse)
        else {
            warn!(
                index,
                name,
                "Custom PII pattern has invalid severity (must be low, medium, high \
                 or critical); skipping"
            );
            continue;
        };

        if builtin_names.contains(&name) {
            warn!(
                name,
                "Custom PII pattern shadows a built-in pattern name; the built-in is \
                 still applied and the custom entry is appended after it"
            );
        }

        // Custom patterns keep Unicode-aware matching (fancy-regex default)
        // since they may target non-English identifiers; the built-ins use
        // ASCII character classes by construction.
        let regex = match Regex::new(raw_pattern) {
            Ok(regex) => regex,
            Err(err) => {
                error!(
                    index,
                    name,
                    pattern = raw_pattern,
                    error = %err,
                    "Custom PII pattern has invalid regex; skipping"
                );
                continue;
            }
        };

        let category = entry
            .get("category")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or(name)
            .to_string();

        patterns.push(PatternEntry {
            name: name.to_string(),
            regex,
            severity,
            category,
        });
        loaded += 1;
    }

    info!(
        path = %path.display(),
        loaded,
        total = patterns.len(),
        "Loaded custom PII patterns"
    );
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    fn matches(name: &str, text: &str) -> bool {
        let entry = builtin_patterns()
            .iter()
            .find(|p| p.name == name)
            .expect("pattern exists");
        entry.regex.is_match(text).unwrap()
    }

    #[test]
    fn test_builtin_set() {
        let names: Vec<&str> = builtin_patterns().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["NI_NUMBER", "NHS_NUMBER", "EMAIL", "UK_PHONE", "UK_POSTCODE"]
        );
    }

    #[test_case("AB123456C", true; "compact")]
    #[test_case("AB 12 34 56 C", true; "spaced card form")]
    #[test_case("DA123456C", false; "excluded first letter D")]
    #[test_case("AO123456C", false; "excluded second letter O")]
    #[test_case("AB123456E", false; "invalid suffix")]
    fn test_ni_number(input: &str, expected: bool) {
        assert_eq!(matches("NI_NUMBER", input), expected);
    }

    #[test_case("943 476 5919", true; "spaced groups")]
    #[test_case("943-476-5919", true; "hyphenated groups")]
    #[test_case("9434765919", true; "compact")]
    #[test_case("943 476 591", false; "nine digits")]
    fn test_nhs_number(input: &str, expected: bool) {
        assert_eq!(matches("NHS_NUMBER", input), expected);
    }

    #[test_case("alice@example.com", true; "plain")]
    #[test_case("a.b+tag@sub.domain.co.uk", true; "subdomain plus tag")]
    #[test_case("not-an-email@nodot", false; "missing tld dot")]
    fn test_email(input: &str, expected: bool) {
        assert_eq!(matches("EMAIL", input), expected);
    }

    #[test_case("07700 900123", true; "national mobile")]
    #[test_case("+44 7700 900123", true; "international")]
    #[test_case("0044 7700 900123", true; "zero zero prefix")]
    #[test_case("1234", false; "too short")]
    fn test_uk_phone(input: &str, expected: bool) {
        assert_eq!(matches("UK_PHONE", input), expected);
    }

    #[test_case("M1 1AE", true; "an naa")]
    #[test_case("EC1A 1BB", true; "aana naa")]
    #[test_case("DN55 1PT", true; "aann naa")]
    #[test_case("sw1a 1aa", true; "lower case")]
    fn test_uk_postcode(input: &str, expected: bool) {
        assert_eq!(matches("UK_POSTCODE", input), expected);
    }

    #[test]
    fn test_load_without_custom_path() {
        let patterns = load_patterns(None);
        assert_eq!(patterns.len(), 5);
    }

    #[test]
    fn test_load_missing_file_degrades_to_builtins() {
        let patterns = load_patterns(Some(Path::new("/nonexistent/custom.json")));
        assert_eq!(patterns.len(), 5);
    }

    #[test]
    fn test_load_custom_patterns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"name": "EMPLOYEE_ID", "pattern": "EMP-\\d{{6}}", "severity": "medium"}},
                {{"name": "BADGE", "pattern": "BDG\\d{{4}}", "severity": "low", "category": "ACCESS_BADGE"}}
            ]"#
        )
        .unwrap();

        let patterns = load_patterns(Some(file.path()));
        assert_eq!(patterns.len(), 7);
        assert_eq!(patterns[5].name, "EMPLOYEE_ID");
        assert_eq!(patterns[5].category, "EMPLOYEE_ID");
        assert_eq!(patterns[6].category, "ACCESS_BADGE");
        assert!(patterns[5].regex.is_match("EMP-123456").unwrap());
    }

    #[test]
    fn test_load_skips_malformed_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"pattern": "\\d+", "severity": "low"}},
                {{"name": "NO_PATTERN", "severity": "low"}},
                {{"name": "BAD_SEVERITY", "pattern": "x", "severity": "extreme"}},
                {{"name": "BAD_REGEX", "pattern": "(unclosed", "severity": "low"}},
                {{"name": "VALID", "pattern": "ok", "severity": "high"}}
            ]"#
        )
        .unwrap();

        let patterns = load_patterns(Some(file.path()));
        assert_eq!(patterns.len(), 6);
        assert_eq!(patterns[5].name, "VALID");
    }

    #[test]
    fn test_load_non_array_root_degrades() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "X"}}"#).unwrap();
        let patterns = load_patterns(Some(file.path()));
        assert_eq!(patterns.len(), 5);
    }

    #[test]
    fn test_duplicate_names_are_appended_not_replaced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "EMAIL", "pattern": "custom-email", "severity": "low"}}]"#
        )
        .unwrap();

        let patterns = load_patterns(Some(file.path()));
        let email_entries: Vec<_> = patterns.iter().filter(|p| p.name == "EMAIL").collect();
        assert_eq!(email_entries.len(), 2);
        // Built-in first, custom appended after.
        assert_eq!(email_entries[0].severity, Severity::Medium);
        assert_eq!(email_entries[1].severity, Severity::Low);
    }
}

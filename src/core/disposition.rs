//! Rule-based file disposition
//!
//! [`DispositionEngine`] evaluates the AV and PII findings accumulated in
//! a [`ScanContext`] against per-tenant, per-MIME-type disposition rules
//! and produces a final [`DispositionResult`] of block, quarantine, or
//! pass.
//!
//! **Fail-secure guarantee:** any failure during rule evaluation,
//! including panics in collaborator code, results in a block outcome. No
//! code path through this module can return a pass as the result of an
//! unexpected failure. This is the single most important invariant in
//! the system.
//!
//! # Rule schema
//!
//! Tenant rules arrive as a JSON object; every key is optional:
//!
//! ```json
//! {
//!     "on_error":     "block",
//!     "on_av_threat": "block",
//!     "on_pii":       "pass",
//!     "mime_type_overrides": {
//!         "application/pdf": { "on_pii": "quarantine" }
//!     }
//! }
//! ```
//!
//! Built-in defaults when a key (or the whole object) is absent:
//! `on_error` and `on_av_threat` block, `on_pii` passes. Malformed rule
//! values are treated as absent and fall through to the next resolution
//! level; a bad tenant-supplied value never crashes evaluation.

use crate::core::context::ScanContext;
use crate::domain::{QuarantineError, Result};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

/// Disposition action for a scanned file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Pass,
    Quarantine,
    Block,
}

impl Action {
    /// Parse an action string, returning `None` for unrecognized values
    ///
    /// Rule resolution relies on this returning `None` for malformed
    /// values so they fall through to the next level instead of erroring.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pass" => Some(Self::Pass),
            "quarantine" => Some(Self::Quarantine),
            "block" => Some(Self::Block),
            _ => None,
        }
    }

    /// Lowercase label, matching the metadata and rule wire format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Quarantine => "quarantine",
            Self::Block => "block",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall scan status derived from the resolved action and findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Passed with no findings
    Clean,
    /// Passed, but findings were recorded
    Flagged,
    /// Blocked or quarantined
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Flagged => "flagged",
            Self::Rejected => "rejected",
        }
    }
}

/// Immutable result of a disposition evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionResult {
    /// The resolved action
    pub action: Action,
    /// Derived verdict (see [`Status`])
    pub status: Status,
    /// Opaque reference returned by the quarantine store when the action
    /// is quarantine and storage succeeded; `None` otherwise
    pub quarantine_ref: Option<String>,
    /// Human-readable strings explaining why each rule fired, for audit
    /// logs and SIEM payloads
    pub reasons: Vec<String>,
}

/// Storage backend for quarantined files
///
/// Concrete implementations (e.g. an encrypted object store) are injected
/// at engine construction. The indirection keeps the engine testable
/// without storage infrastructure.
#[async_trait]
pub trait QuarantineStore: Send + Sync {
    /// Store the file bytes from `context` in quarantine and return an
    /// opaque reference (object key, URN) for later retrieval or audit
    ///
    /// # Errors
    ///
    /// Returns [`QuarantineError`] when the file could not be stored. The
    /// engine treats this as a hard failure and falls back to a block
    /// outcome.
    async fn store(&self, context: &ScanContext) -> std::result::Result<String, QuarantineError>;
}

/// Evaluates scan findings against disposition rules and resolves an action
///
/// Stateless after construction; the same instance can be shared across
/// concurrent scans.
pub struct DispositionEngine {
    quarantine_store: Option<std::sync::Arc<dyn QuarantineStore>>,
    rules: Option<Value>,
}

impl DispositionEngine {
    /// Create an engine without a quarantine store
    ///
    /// Quarantine decisions fall back to block until a store is attached.
    pub fn new() -> Self {
        Self {
            quarantine_store: None,
            rules: None,
        }
    }

    /// Attach a quarantine store
    pub fn with_quarantine_store(mut self, store: std::sync::Arc<dyn QuarantineStore>) -> Self {
        self.quarantine_store = Some(store);
        self
    }

    /// Attach tenant disposition rules used when the engine runs as the
    /// pipeline's disposition step
    pub fn with_rules(mut self, rules: Value) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Evaluate findings in `context` and return a disposition decision
    ///
    /// Reads `context.findings` and `context.errors`, resolves the
    /// applicable rules, and returns an immutable [`DispositionResult`].
    /// The context is not mutated. `rules` is the tenant's disposition
    /// rules object; `None` applies the built-in defaults.
    ///
    /// **Fail-secure:** any error or panic escaping evaluation is caught,
    /// logged, and converted to a block outcome.
    pub async fn decide(
        &self,
        context: &ScanContext,
        rules: Option<&Value>,
    ) -> DispositionResult {
        let evaluation = AssertUnwindSafe(self.evaluate(context, rules))
            .catch_unwind()
            .await;

        match evaluation {
            Ok(Ok(result)) => {
                info!(
                    scan_id = %context.scan_id,
                    action = %result.action,
                    status = result.status.as_str(),
                    reasons = result.reasons.len(),
                    "Disposition decision"
                );
                result
            }
            Ok(Err(err)) => {
                error!(
                    scan_id = %context.scan_id,
                    error = %err,
                    "Disposition evaluation failed; applying fail-secure block"
                );
                fail_secure(format!("{}: {err}", err.kind()))
            }
            Err(panic) => {
                let detail = panic_message(&panic);
                error!(
                    scan_id = %context.scan_id,
                    detail,
                    "Disposition evaluation panicked; applying fail-secure block"
                );
                fail_secure(detail)
            }
        }
    }

    /// Core evaluation logic, separated so [`Self::decide`] can cleanly
    /// catch anything that escapes it
    async fn evaluate(
        &self,
        context: &ScanContext,
        rules: Option<&Value>,
    ) -> Result<DispositionResult> {
        let rules = rules.unwrap_or(&Value::Null);
        let mime_type = context.mime_type.as_str();

        // 1. Scan errors take priority over everything else.
        if !context.errors.is_empty() {
            let action = resolve_action(rules, mime_type, "on_error", Action::Block);
            let reasons: Vec<String> = context
                .errors
                .iter()
                .map(|err| format!("scan error: {err}"))
                .collect();

            warn!(
                scan_id = %context.scan_id,
                errors = context.errors.len(),
                action = %action,
                "Disposition triggered by scan errors"
            );
            return Ok(self.apply_action(action, context, reasons).await);
        }

        // 2. Classify findings by kind.
        let av_findings: Vec<_> = context
            .findings
            .iter()
            .filter_map(|f| f.as_av_threat())
            .collect();
        let pii_findings: Vec<_> = context.findings.iter().filter_map(|f| f.as_pii()).collect();

        // 3. AV threats outrank PII.
        if !av_findings.is_empty() {
            let action = resolve_action(rules, mime_type, "on_av_threat", Action::Block);
            let reasons: Vec<String> = av_findings
                .iter()
                .map(|f| format!("av_threat: category={} match={:?}", f.category, f.matched))
                .collect();

            warn!(
                scan_id = %context.scan_id,
                av_threats = av_findings.len(),
                action = %action,
                "Disposition triggered by AV threats"
            );
            return Ok(self.apply_action(action, context, reasons).await);
        }

        // 4. PII findings.
        if !pii_findings.is_empty() {
            let action = resolve_action(rules, mime_type, "on_pii", Action::Pass);
            let reasons: Vec<String> = pii_findings
                .iter()
                .map(|f| format!("pii: category={} severity={}", f.category, f.severity))
                .collect();

            info!(
                scan_id = %context.scan_id,
                pii_findings = pii_findings.len(),
                action = %action,
                "Disposition triggered by PII findings"
            );
            return Ok(self.apply_action(action, context, reasons).await);
        }

        // 5. Nothing found: clean pass.
        Ok(DispositionResult {
            action: Action::Pass,
            status: Status::Clean,
            quarantine_ref: None,
            reasons: Vec::new(),
        })
    }

    /// Execute the resolved action
    ///
    /// Quarantine delegates to the configured store. A missing store, a
    /// store error, or a store panic all fall back to block; quarantine
    /// is a best-effort upgrade over blocking, never a capability whose
    /// absence may allow a riskier outcome.
    async fn apply_action(
        &self,
        action: Action,
        context: &ScanContext,
        reasons: Vec<String>,
    ) -> DispositionResult {
        let has_findings = !context.findings.is_empty();

        if action == Action::Quarantine {
            return match self.store_quarantine(context).await {
                Some(quarantine_ref) => DispositionResult {
                    action: Action::Quarantine,
                    status: Status::Rejected,
                    quarantine_ref: Some(quarantine_ref),
                    reasons,
                },
                None => {
                    let mut reasons = reasons;
                    reasons
                        .push("quarantine store unavailable; falling back to block".to_string());
                    DispositionResult {
                        action: Action::Block,
                        status: Status::Rejected,
                        quarantine_ref: None,
                        reasons,
                    }
                }
            };
        }

        DispositionResult {
            action,
            status: derive_status(action, has_findings),
            quarantine_ref: None,
            reasons,
        }
    }

    /// Attempt to quarantine the file; `None` means storage failed or no
    /// store is configured
    async fn store_quarantine(&self, context: &ScanContext) -> Option<String> {
        let Some(store) = self.quarantine_store.as_ref() else {
            warn!(
                scan_id = %context.scan_id,
                "Quarantine requested but no store configured; falling back to block"
            );
            return None;
        };

        match AssertUnwindSafe(store.store(context)).catch_unwind().await {
            Ok(Ok(reference)) => {
                info!(scan_id = %context.scan_id, reference, "File quarantined");
                Some(reference)
            }
            Ok(Err(err)) => {
                error!(
                    scan_id = %context.scan_id,
                    error = %err,
                    "Quarantine store failed; falling back to block"
                );
                None
            }
            Err(panic) => {
                error!(
                    scan_id = %context.scan_id,
                    detail = panic_message(&panic),
                    "Quarantine store panicked; falling back to block"
                );
                None
            }
        }
    }
}

impl Default for DispositionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl crate::core::pipeline::DispositionEvaluator for DispositionEngine {
    /// Run the engine as the pipeline's disposition step using the rules
    /// attached via [`DispositionEngine::with_rules`]
    ///
    /// [`Self::decide`] is total, so this never returns an error; the
    /// fail-secure block outcome is reported as a successful `Block`.
    async fn evaluate(&self, context: &ScanContext) -> Result<Action> {
        let result = self.decide(context, self.rules.as_ref()).await;
        Ok(result.action)
    }
}

/// Resolve the action for `rule_key`, applying MIME-type overrides
///
/// Resolution order:
/// 1. `rules["mime_type_overrides"][mime_type][rule_key]`
/// 2. `rules[rule_key]`
/// 3. `default`
///
/// Any value that is not a valid action literal is ignored and the next
/// level is tried, so malformed rule entries degrade toward the default
/// instead of crashing the engine.
fn resolve_action(rules: &Value, mime_type: &str, rule_key: &str, default: Action) -> Action {
    let mime_value = rules
        .get("mime_type_overrides")
        .and_then(|overrides| overrides.get(mime_type))
        .and_then(|mime_rules| mime_rules.get(rule_key))
        .and_then(Value::as_str)
        .and_then(Action::parse);

    if let Some(action) = mime_value {
        return action;
    }

    rules
        .get(rule_key)
        .and_then(Value::as_str)
        .and_then(Action::parse)
        .unwrap_or(default)
}

/// Derive the overall scan status from the resolved action and findings
fn derive_status(action: Action, has_findings: bool) -> Status {
    match action {
        Action::Block | Action::Quarantine => Status::Rejected,
        Action::Pass if has_findings => Status::Flagged,
        Action::Pass => Status::Clean,
    }
}

/// Build the fail-secure block result for an evaluation failure
fn fail_secure(detail: impl std::fmt::Display) -> DispositionResult {
    DispositionResult {
        action: Action::Block,
        status: Status::Rejected,
        quarantine_ref: None,
        reasons: vec![format!(
            "fail-secure: unhandled error during disposition evaluation: {detail}"
        )],
    }
}

/// Extract a readable message from a panic payload
fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

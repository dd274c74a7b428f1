//! Configuration schema for the scanner

use super::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileGuardConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pattern library settings
    #[serde(default)]
    pub patterns: PatternsConfig,

    /// Redaction settings
    #[serde(default)]
    pub redaction: RedactionConfig,

    /// Disposition rule settings
    #[serde(default)]
    pub disposition: DispositionConfig,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,
}

impl FileGuardConfig {
    /// Validate the full configuration
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.logging.validate()?;
        self.patterns.validate()?;
        self.redaction.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name used in log output
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_app_name() -> String {
    "fileguard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid application.log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily or hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: default_true(),
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

/// Pattern library settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternsConfig {
    /// Path to a JSON file of custom detection patterns
    #[serde(default)]
    pub custom_path: Option<PathBuf>,
}

impl PatternsConfig {
    fn validate(&self) -> Result<(), String> {
        // A missing custom file degrades to built-ins at load time, but a
        // configured path that does not exist is almost always a typo.
        if let Some(ref path) = self.custom_path {
            if !path.exists() {
                return Err(format!(
                    "Custom pattern file not found: {}",
                    path.display()
                ));
            }
        }
        Ok(())
    }
}

/// Redaction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Replacement token for redacted spans
    #[serde(default = "default_redaction_token")]
    pub token: String,
}

fn default_redaction_token() -> String {
    "[REDACTED]".to_string()
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            token: default_redaction_token(),
        }
    }
}

impl RedactionConfig {
    fn validate(&self) -> Result<(), String> {
        if self.token.is_empty() {
            return Err("redaction.token must not be empty".to_string());
        }
        Ok(())
    }
}

/// Disposition rule settings
///
/// Rules are expressed as a TOML table with the same shape as tenant
/// rules (`on_error` / `on_av_threat` / `on_pii` /
/// `mime_type_overrides`); they are passed to the disposition engine
/// verbatim, so unknown or malformed keys degrade to the compiled
/// defaults rather than failing validation here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DispositionConfig {
    /// Default disposition rules applied when the caller supplies none
    #[serde(default)]
    pub rules: Option<serde_json::Value>,
}

/// Rate limiting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting (requires a Redis URL)
    #[serde(default)]
    pub enabled: bool,

    /// Requests allowed per window per tenant
    #[serde(default = "default_rpm")]
    pub default_rpm: u64,

    /// Window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Redis connection URL; commonly carries credentials, so held as a
    /// secret and never printed
    #[serde(default)]
    pub redis_url: Option<SecretString>,
}

fn default_rpm() -> u64 {
    100
}

fn default_window_seconds() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_rpm: default_rpm(),
            window_seconds: default_window_seconds(),
            redis_url: None,
        }
    }
}

impl RateLimitConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.redis_url.is_none() {
            return Err("rate_limit.redis_url is required when rate_limit.enabled".to_string());
        }
        if self.default_rpm == 0 {
            return Err("rate_limit.default_rpm must be at least 1".to_string());
        }
        if self.window_seconds == 0 {
            return Err("rate_limit.window_seconds must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Audit log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON lines format for audit entries
    #[serde(default = "default_true")]
    pub json_format: bool,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/scans.log")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            log_path: default_audit_log_path(),
            json_format: default_true(),
        }
    }
}

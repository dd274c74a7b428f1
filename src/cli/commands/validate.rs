//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the FileGuard configuration file.

use crate::config::load_config;
use crate::core::patterns::load_patterns;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Load configuration (load_config validates internally)
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Application: {}", config.application.name);
        println!("  Log Level: {}", config.application.log_level);

        let patterns = load_patterns(config.patterns.custom_path.as_deref());
        println!("  Detection Patterns: {}", patterns.len());
        if let Some(ref path) = config.patterns.custom_path {
            println!("  Custom Pattern File: {}", path.display());
        }

        println!("  Redaction Token: {}", config.redaction.token);
        println!(
            "  Disposition Rules: {}",
            if config.disposition.rules.is_some() {
                "configured"
            } else {
                "built-in defaults"
            }
        );

        if config.rate_limit.enabled {
            println!("  Rate Limiting: enabled");
            println!("  Rate Limit: {} req / {} s", config.rate_limit.default_rpm, config.rate_limit.window_seconds);
        } else {
            println!("  Rate Limiting: disabled");
        }

        println!(
            "  Audit Log: {} ({})",
            config.audit.log_path.display(),
            if config.audit.enabled { "enabled" } else { "disabled" }
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file_exits_two() {
        let args = ValidateArgs {};
        let code = args.execute("does-not-exist.toml").await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_valid_file_exits_zero() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[application]\nlog_level = \"info\"\n").unwrap();
        file.flush().unwrap();

        let args = ValidateArgs {};
        let code = args.execute(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(code, 0);
    }
}

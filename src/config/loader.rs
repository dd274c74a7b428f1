//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::FileGuardConfig;
use super::secret::secret_string;
use crate::domain::errors::FileGuardError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into FileGuardConfig
/// 4. Applies environment variable overrides (FILEGUARD_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use fileguard::config::load_config;
///
/// let config = load_config("fileguard.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FileGuardConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FileGuardError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FileGuardError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: FileGuardConfig = toml::from_str(&contents)
        .map_err(|e| FileGuardError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config);

    // Validate configuration
    config.validate().map_err(|e| {
        FileGuardError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FileGuardError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the FILEGUARD_* prefix
///
/// Environment variables follow the pattern: FILEGUARD_<SECTION>_<KEY>
/// For example: FILEGUARD_RATE_LIMIT_DEFAULT_RPM, FILEGUARD_AUDIT_LOG_PATH
fn apply_env_overrides(config: &mut FileGuardConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("FILEGUARD_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FILEGUARD_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FILEGUARD_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    // Pattern overrides
    if let Ok(val) = std::env::var("FILEGUARD_PATTERNS_CUSTOM_PATH") {
        config.patterns.custom_path = Some(val.into());
    }

    // Redaction overrides
    if let Ok(val) = std::env::var("FILEGUARD_REDACTION_TOKEN") {
        config.redaction.token = val;
    }

    // Rate limit overrides
    if let Ok(val) = std::env::var("FILEGUARD_RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FILEGUARD_RATE_LIMIT_DEFAULT_RPM") {
        if let Ok(rpm) = val.parse() {
            config.rate_limit.default_rpm = rpm;
        }
    }
    if let Ok(val) = std::env::var("FILEGUARD_RATE_LIMIT_WINDOW_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.rate_limit.window_seconds = secs;
        }
    }
    if let Ok(val) = std::env::var("FILEGUARD_RATE_LIMIT_REDIS_URL") {
        config.rate_limit.redis_url = Some(secret_string(val));
    }

    // Audit overrides
    if let Ok(val) = std::env::var("FILEGUARD_AUDIT_ENABLED") {
        config.audit.enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FILEGUARD_AUDIT_LOG_PATH") {
        config.audit.log_path = val.into();
    }
    if let Ok(val) = std::env::var("FILEGUARD_AUDIT_JSON_FORMAT") {
        config.audit.json_format = val.parse().unwrap_or(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("FG_TEST_VAR", "test_value");
        let input = "redis_url = \"${FG_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "redis_url = \"test_value\"\n");
        std::env::remove_var("FG_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("FG_MISSING_VAR");
        let input = "redis_url = \"${FG_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("FG_COMMENTED_VAR");
        let input = "# redis_url = \"${FG_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[redaction]
token = "[PII]"

[rate_limit]
enabled = true
default_rpm = 50
redis_url = "redis://localhost:6379/0"

[disposition.rules]
on_pii = "quarantine"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.redaction.token, "[PII]");
        assert_eq!(config.rate_limit.default_rpm, 50);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert_eq!(
            config.disposition.rules.unwrap()["on_pii"],
            "quarantine"
        );
    }

    #[test]
    fn test_load_config_invalid_validation() {
        // rate limiting enabled without a Redis URL
        let toml_content = r#"
[rate_limit]
enabled = true
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }
}

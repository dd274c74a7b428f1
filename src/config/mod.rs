//! Configuration management
//!
//! TOML configuration with `${VAR}` environment substitution,
//! `FILEGUARD_*` environment overrides, and validation at load time.

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, AuditConfig, DispositionConfig, FileGuardConfig, LoggingConfig,
    PatternsConfig, RateLimitConfig, RedactionConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};

//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for FileGuard using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// FileGuard - Fail-Secure File Scanning
#[derive(Parser, Debug)]
#[command(name = "fileguard")]
#[command(version, about, long_about = None)]
#[command(author = "FileGuard Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fileguard.toml", env = "FILEGUARD_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FILEGUARD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a local file through the full pipeline
    Scan(commands::scan::ScanArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// List the loaded detection pattern set
    Patterns(commands::patterns::PatternsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_scan() {
        let cli = Cli::parse_from(["fileguard", "scan", "document.txt"]);
        assert_eq!(cli.config, "fileguard.toml");
        assert!(matches!(cli.command, Commands::Scan(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["fileguard", "--config", "custom.toml", "patterns"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["fileguard", "--log-level", "debug", "patterns"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["fileguard", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_scan_flags() {
        let cli = Cli::parse_from([
            "fileguard",
            "scan",
            "notes.txt",
            "--mime",
            "text/csv",
            "--redact",
            "--tenant",
            "acme",
        ]);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.mime, "text/csv");
                assert!(args.redact);
                assert_eq!(args.tenant, Some("acme".to_string()));
            }
            other => panic!("expected scan, got {other:?}"),
        }
    }
}

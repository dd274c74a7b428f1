//! Patterns command implementation
//!
//! Lists the detection pattern set that would be active for a scan.

use crate::core::patterns::load_patterns;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the patterns command
#[derive(Args, Debug)]
pub struct PatternsArgs {
    /// JSON file of custom detection patterns to load on top of built-ins
    #[arg(long)]
    pub custom: Option<PathBuf>,
}

impl PatternsArgs {
    /// Execute the patterns command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let patterns = load_patterns(self.custom.as_deref());

        println!("{} detection patterns loaded", patterns.len());
        println!();
        println!("{:<16} {:<10} {:<12} PATTERN", "NAME", "SEVERITY", "CATEGORY");
        for entry in &patterns {
            println!(
                "{:<16} {:<10} {:<12} {}",
                entry.name,
                entry.severity.as_str(),
                entry.category,
                entry.regex.as_str()
            );
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_patterns_command_lists_builtins() {
        let args = PatternsArgs { custom: None };
        let code = args.execute().await.unwrap();
        assert_eq!(code, 0);
    }
}

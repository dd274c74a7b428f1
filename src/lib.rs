// FileGuard - Fail-Secure File Scanning
// Copyright (c) 2025 FileGuard Contributors
// Licensed under the MIT License

//! # FileGuard - Fail-Secure File Scanning
//!
//! FileGuard is a multi-tenant file scanning library and CLI that runs
//! uploaded documents through a staged pipeline of malware scanning, PII
//! detection, redaction, and policy-based disposition.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Extracting** normalised text from uploaded documents
//! - **Detecting** UK-centric PII (NI numbers, NHS numbers, emails,
//!   phone numbers, postcodes) plus tenant-defined custom patterns
//! - **Redacting** detected spans with offset-validated replacement
//! - **Deciding** block / quarantine / pass per tenant disposition rules
//! - **Auditing** every scan to an append-only log with hashed PII
//!
//! ## Architecture
//!
//! FileGuard follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (pipeline, detector, redaction, disposition)
//! - [`adapters`] - Concrete extraction and audit backends
//! - [`ratelimit`] - Per-tenant sliding-window rate limiting over Redis
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fileguard::adapters::text::PlainTextExtractor;
//! use fileguard::core::context::ScanContext;
//! use fileguard::core::detector::PiiDetector;
//! use fileguard::core::pipeline::ScanPipeline;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = ScanPipeline::new(
//!         Arc::new(PlainTextExtractor::new()),
//!         Arc::new(PiiDetector::new()),
//!     );
//!
//!     let mut context = ScanContext::new(
//!         b"Reach me at jo@example.com".to_vec(),
//!         "text/plain",
//!     );
//!     let _ = pipeline.run(&mut context).await;
//!
//!     println!("disposition: {:?}", context.disposition());
//!     println!("findings: {}", context.findings.len());
//! }
//! ```
//!
//! ## Fail-secure by construction
//!
//! The pipeline's core guarantee is that no failure mode can let a file
//! through unexamined: any stage error halts the scan with a `block`
//! disposition, and the disposition engine converts even panics during
//! rule evaluation into a block. The rate limiter is the deliberate
//! exception and fails open, since throttling protects capacity rather
//! than data.
//!
//! ## Error Handling
//!
//! FileGuard uses the [`domain::FileGuardError`] type for all errors:
//!
//! ```rust,no_run
//! use fileguard::domain::FileGuardError;
//!
//! fn example() -> Result<(), FileGuardError> {
//!     let config = fileguard::config::load_config("fileguard.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod ratelimit;

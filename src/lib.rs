//! DANE-SMTP Library
//!
//! DANE (RFC 6698/7672) verification of SMTP servers:
//! - DNSSEC-enforcing MX and TLSA resolution
//! - Ordered mapping of mail servers to their DANE records
//! - Trust decision for a presented certificate chain
//! - STARTTLS probe using the decision as the only trust anchor
//!
//! # Usage
//!
//! ```rust,ignore
//! use dane_smtp::config::Settings;
//! use dane_smtp::dane::DaneResolver;
//!
//! let settings = Settings::default();
//! let resolver = DaneResolver::from_settings(&settings)?;
//! for (server, records) in resolver.resolve_dane_records("example.nl")?.iter() {
//!     println!("{}: {} record(s)", server, records.len());
//! }
//! ```

pub mod cert_ops;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dane;
pub mod dns;
pub mod output;
pub mod smtp;
pub mod utils;

// Re-export commonly used types
pub use cli::Cli;
pub use config::Settings;
pub use dane::{DaneRecord, DaneResolver, DaneTrustDecider, MailServerRecords, TrustDecision};
pub use utils::{DaneError, Result};

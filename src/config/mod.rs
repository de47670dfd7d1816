//! Configuration module for dane-smtp
//!
//! Handles loading settings from TOML files.

pub mod settings;

pub use settings::{DaneSettings, DnsSettings, Settings, SmtpSettings};

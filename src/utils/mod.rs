//! Utility modules for dane-smtp
//!
//! This module contains the error types shared by every other module.

pub mod error;

pub use error::{
    CertFileError, ConfigError, CryptoError, DaneError, DnsError, RecordError, Result, SmtpError,
    TrustError,
};

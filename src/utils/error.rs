//! Custom error types for dane-smtp
//!
//! Every failure mode of DNS resolution, DANE trust decisions, configuration
//! loading and the SMTP probe has its own `thiserror` enum. `DaneError` is the
//! top-level type that the library API and the binary propagate.

use thiserror::Error;

/// Top-level error type for dane-smtp operations
#[derive(Error, Debug)]
pub enum DaneError {
    #[error("DNS error: {0}")]
    Dns(#[from] DnsError),

    #[error("DANE trust rejected: {0}")]
    Trust(#[from] TrustError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Certificate file error: {0}")]
    CertFile(#[from] CertFileError),

    #[error("Fixture error: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// DNS query errors
///
/// Raised for transport problems, non-NOERROR response codes and secure
/// queries whose answer does not carry the authenticated-data flag.
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("DNS query for {domain} failed: {message}")]
    Query { domain: String, message: String },

    #[error("Invalid return code {code} for DNS record lookup of domain {domain}")]
    ResponseCode { domain: String, code: String },

    #[error("Secure DNS record lookup failed for domain {domain}: answer is not authenticated")]
    Insecure { domain: String },

    #[error("Invalid domain name {domain}: {message}")]
    InvalidName { domain: String, message: String },

    #[error("DNS query timed out for {domain}")]
    Timeout { domain: String },

    #[error("Unable to determine DNS resolver: {message}")]
    Resolver { message: String },
}

/// A TLSA record field that does not decode to a known value.
///
/// Never propagated out of the resolver: the offending record is logged and
/// dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown certificate usage {0}")]
    UnknownCertificateUsage(u8),

    #[error("unknown selector {0}")]
    UnknownSelector(u8),

    #[error("unknown matching type {0}")]
    UnknownMatchingType(u8),
}

/// Reasons a presented certificate chain is not trusted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("Certificate chain is empty")]
    EmptyChain,

    #[error("Key exchange algorithm is empty")]
    MissingKeyExchange,

    #[error("No DANE records available to validate the certificate chain")]
    NoRecords,

    #[error("No valid DANE certificates found for domain {domain} / {mx_domain}")]
    NoMatch { domain: String, mx_domain: String },
}

/// Failures while evaluating a single DANE candidate.
///
/// The decider logs these and treats the candidate as a non-match.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Failed to parse certificate #{index}: {message}")]
    Parse { index: usize, message: String },

    #[error("Signature of certificate #{index} does not verify under its issuer: {message}")]
    Signature { index: usize, message: String },
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// SMTP session errors
#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("Connection to {host}:{port} failed: {message}")]
    Connect {
        host: String,
        port: u16,
        message: String,
    },

    #[error("SMTP I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected SMTP reply, expected {expected}: {reply}")]
    Protocol { expected: u16, reply: String },

    #[error("Server {host} does not offer STARTTLS")]
    StartTlsUnsupported { host: String },

    #[error("TLS error: {message}")]
    Tls { message: String },

    #[error("Invalid server name: {host}")]
    InvalidServerName { host: String },
}

impl From<rustls::Error> for SmtpError {
    fn from(err: rustls::Error) -> Self {
        SmtpError::Tls {
            message: err.to_string(),
        }
    }
}

/// Certificate file reading errors
#[derive(Error, Debug)]
pub enum CertFileError {
    #[error("Failed to read {path}: {message}")]
    FileReadError { path: String, message: String },

    #[error("Failed to parse PEM: {message}")]
    PemError { message: String },

    #[error("Unsupported certificate format: {format}")]
    UnsupportedFormat { format: String },

    #[error("No certificates found in {path}")]
    Empty { path: String },
}

/// Result type alias using DaneError
pub type Result<T> = std::result::Result<T, DaneError>;

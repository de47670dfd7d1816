//! DNS module for DANE lookups
//!
//! This module provides:
//! - A DNSSEC-aware client that enforces authenticated answers
//! - Mail exchanger (MX) resolution in priority order
//! - TLSA lookups for SMTP servers

pub mod client;
pub mod mx;
pub mod tlsa;

pub use client::{DnsExchange, NetworkExchange, SecureDnsClient, Transport};
pub use mx::{mail_exchangers, MxResolver};
pub use tlsa::{to_tlsa_query_name, TlsaResolver};

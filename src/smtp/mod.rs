//! SMTP transport: STARTTLS probe verified by DANE
//!
//! This module provides:
//! - A rustls verifier delegating trust to the DANE decider
//! - A STARTTLS session with optional wire logging
//! - Connection attempts across the mail servers of a domain

pub mod connect;
pub mod session;
pub mod verifier;
pub mod wire_log;

pub use connect::{connect_to_servers, try_dane_connection, ConnectOutcome, ServerAttempt};
pub use session::{SessionReport, SmtpSession};
pub use verifier::{key_exchange_name, DaneCertVerifier};
pub use wire_log::WireLog;

//! DANE records, their resolution and the trust decision

pub mod decider;
pub mod record;
pub mod resolver;

pub use decider::{decide, DaneTrustDecider, ServerTrust, TrustDecision};
pub use record::{CertificateUsage, DaneRecord, MatchingType, Selector};
pub use resolver::{to_dane_records, DaneResolver, MailServerRecords};

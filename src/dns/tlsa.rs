//! TLSA record lookups for SMTP servers

use crate::dns::client::SecureDnsClient;
use crate::utils::DnsError;
use hickory_proto::op::Message;
use hickory_proto::rr::RecordType;
use std::sync::Arc;
use tracing::debug;

/// TLSA owner prefix for SMTP on port 25
const SMTP_TLSA_PREFIX: &str = "_25._tcp.";

/// Resolves TLSA record sets for mail servers.
///
/// Lookups are always DNSSEC-secured: an unauthenticated TLSA answer could
/// carry an attacker's certificate association.
#[derive(Debug, Clone)]
pub struct TlsaResolver {
    client: Arc<SecureDnsClient>,
}

impl TlsaResolver {
    pub fn new(client: Arc<SecureDnsClient>) -> Self {
        Self { client }
    }

    /// Query the TLSA records of `server` and return the raw response
    pub fn resolve_tlsa_records(&self, server: &str) -> Result<Message, DnsError> {
        debug!("Resolving TLSA records for domain {}", server);
        self.client
            .query(&to_tlsa_query_name(server), RecordType::TLSA, true)
    }
}

/// Owner name of the port 25 TLSA records of `hostname`.
///
/// `_25._tcp.` is prepended unless the name already starts with an
/// underscore label, and the result ends with exactly one root dot.
pub fn to_tlsa_query_name(hostname: &str) -> String {
    let name = hostname.trim_end_matches('.');
    if name.starts_with('_') {
        format!("{}.", name)
    } else {
        format!("{}{}.", SMTP_TLSA_PREFIX, name)
    }
}

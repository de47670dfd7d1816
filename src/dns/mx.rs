//! Mail exchanger resolution

use crate::dns::client::SecureDnsClient;
use crate::utils::DnsError;
use hickory_proto::op::Message;
use hickory_proto::rr::{RData, RecordType};
use std::sync::Arc;
use tracing::debug;

/// Resolves the mail servers of a domain in MX priority order
#[derive(Debug, Clone)]
pub struct MxResolver {
    client: Arc<SecureDnsClient>,
}

impl MxResolver {
    pub fn new(client: Arc<SecureDnsClient>) -> Self {
        Self { client }
    }

    /// Secure (DNSSEC) variant of [`MxResolver::resolve_mail_exchangers`]
    pub fn resolve_mail_exchangers_secure(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        self.resolve_mail_exchangers(domain, true)
    }

    /// Return the lower-cased MX targets of `domain`, most preferred first.
    ///
    /// An empty list is returned when the domain has no MX records.
    pub fn resolve_mail_exchangers(
        &self,
        domain: &str,
        secure: bool,
    ) -> Result<Vec<String>, DnsError> {
        let response = self.resolve_mx_records(domain, secure)?;
        Ok(mail_exchangers(&response))
    }

    /// Issue the MX query for `domain` and return the raw response
    pub fn resolve_mx_records(&self, domain: &str, secure: bool) -> Result<Message, DnsError> {
        debug!("Resolving MX records for domain {}", domain);
        self.client.query(&qualify(domain), RecordType::MX, secure)
    }
}

/// Extract mail exchanger hostnames from an MX response.
///
/// Non-MX answers are skipped. Targets are sorted by ascending preference
/// (stable for equal preferences), stripped of the root dot and surrounding
/// whitespace, lower-cased, and dropped when empty (e.g. a null MX).
pub fn mail_exchangers(response: &Message) -> Vec<String> {
    let mut records: Vec<(u16, String)> = response
        .answers()
        .iter()
        .filter(|record| record.record_type() == RecordType::MX)
        .filter_map(|record| match record.data() {
            RData::MX(mx) => Some((mx.preference(), mx.exchange().to_ascii())),
            _ => None,
        })
        .collect();

    records.sort_by_key(|(preference, _)| *preference);

    records
        .into_iter()
        .map(|(_, target)| {
            let target = target.strip_suffix('.').unwrap_or(&target).trim();
            target.to_lowercase()
        })
        .filter(|target| !target.is_empty())
        .collect()
}

/// Append the root dot to `domain` unless already present
pub fn qualify(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{}.", domain)
    }
}

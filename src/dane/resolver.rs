//! DANE resolution: mail exchangers followed by their TLSA record sets

use crate::config::Settings;
use crate::dane::record::DaneRecord;
use crate::dns::{MxResolver, SecureDnsClient, TlsaResolver};
use crate::utils::DnsError;
use hickory_proto::op::Message;
use hickory_proto::rr::{RData, RecordType};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mail servers in MX priority order, each with its DANE records.
///
/// Servers appear at most once; inserting a known server merges the records
/// into its existing set without changing its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailServerRecords {
    entries: Vec<(String, HashSet<DaneRecord>)>,
}

impl MailServerRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, server: impl Into<String>, records: HashSet<DaneRecord>) {
        let server = server.into();
        match self.entries.iter_mut().find(|(name, _)| *name == server) {
            Some((_, existing)) => existing.extend(records),
            None => self.entries.push((server, records)),
        }
    }

    pub fn get(&self, server: &str) -> Option<&HashSet<DaneRecord>> {
        self.entries
            .iter()
            .find(|(name, _)| name == server)
            .map(|(_, records)| records)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<DaneRecord>)> {
        self.entries
            .iter()
            .map(|(name, records)| (name.as_str(), records))
    }

    /// Server names in priority order
    pub fn servers(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MailServerRecords {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (server, records) in &self.entries {
            // Sets have no order; sort so output is reproducible.
            let mut sorted: Vec<&DaneRecord> = records.iter().collect();
            sorted.sort_by_key(|r| r.to_string());
            map.serialize_entry(server, &sorted)?;
        }
        map.end()
    }
}

/// Resolves the DANE records of every mail server of a domain
#[derive(Debug, Clone)]
pub struct DaneResolver {
    mx: MxResolver,
    tlsa: TlsaResolver,
    secure_mx: bool,
}

impl DaneResolver {
    /// Create a resolver performing secure MX lookups
    pub fn new(client: Arc<SecureDnsClient>) -> Self {
        Self {
            mx: MxResolver::new(client.clone()),
            tlsa: TlsaResolver::new(client),
            secure_mx: true,
        }
    }

    /// Select whether MX lookups require DNSSEC.
    ///
    /// TLSA lookups are secure either way.
    pub fn with_secure_mx(mut self, secure_mx: bool) -> Self {
        self.secure_mx = secure_mx;
        self
    }

    /// Build a network-backed resolver from loaded settings
    pub fn from_settings(settings: &Settings) -> Result<Self, DnsError> {
        let client = SecureDnsClient::from_settings(&settings.dns)?;
        Ok(Self::new(Arc::new(client)).with_secure_mx(settings.dane.secure_mx))
    }

    pub fn secure_mx(&self) -> bool {
        self.secure_mx
    }

    /// Resolve the DANE records of the mail servers of `mx_domain`.
    ///
    /// Servers are visited in MX priority order and those without records
    /// are left out. A failing MX lookup is returned as an error. A failing
    /// TLSA lookup ends the walk: the servers collected so far are returned
    /// and the remaining servers are not queried.
    pub fn resolve_dane_records(&self, mx_domain: &str) -> Result<MailServerRecords, DnsError> {
        let servers = self.mx.resolve_mail_exchangers(mx_domain, self.secure_mx)?;
        debug!("Mail servers for {}: {:?}", mx_domain, servers);

        let mut result = MailServerRecords::new();
        for server in &servers {
            match self.resolve_server_records(mx_domain, server) {
                Ok(records) if records.is_empty() => {
                    debug!("No DANE records for {}", server);
                }
                Ok(records) => result.insert(server.clone(), records),
                Err(e) => {
                    info!(
                        "DANE lookup for {} failed, returning {} of {} servers: {}",
                        server,
                        result.len(),
                        servers.len(),
                        e
                    );
                    break;
                }
            }
        }

        Ok(result)
    }

    /// Resolve the TLSA records of a single mail server
    pub fn resolve_server_records(
        &self,
        mx_domain: &str,
        server: &str,
    ) -> Result<HashSet<DaneRecord>, DnsError> {
        let response = self.tlsa.resolve_tlsa_records(server)?;
        Ok(to_dane_records(mx_domain, server, &response))
    }
}

/// Convert the TLSA answers of `response` into DANE records.
///
/// Answers of other types are ignored; TLSA records with unknown field
/// values are logged and dropped.
pub fn to_dane_records(mx_domain: &str, server: &str, response: &Message) -> HashSet<DaneRecord> {
    response
        .answers()
        .iter()
        .filter(|record| record.record_type() == RecordType::TLSA)
        .filter_map(|record| match record.data() {
            RData::TLSA(tlsa) => match DaneRecord::from_tlsa(mx_domain, server, tlsa) {
                Ok(dane) => Some(dane),
                Err(e) => {
                    warn!("Dropping malformed TLSA record for {}: {}", server, e);
                    None
                }
            },
            _ => None,
        })
        .collect()
}

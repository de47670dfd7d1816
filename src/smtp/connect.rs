//! DANE-verified connection attempt across the mail servers of a domain

use crate::config::Settings;
use crate::dane::{DaneResolver, DaneTrustDecider, MailServerRecords, ServerTrust};
use crate::smtp::session::{SessionReport, SmtpSession};
use crate::utils::DaneError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// One probed mail server
#[derive(Debug, Clone, Serialize)]
pub struct ServerAttempt {
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`try_dane_connection`]
#[derive(Debug, Clone, Serialize)]
pub struct ConnectOutcome {
    pub domain: String,
    pub attempts: Vec<ServerAttempt>,
    /// Report of the first server that passed, if any
    pub connected: Option<SessionReport>,
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        self.connected.is_some()
    }
}

/// Resolve the DANE records of `domain` and probe its mail servers in order
/// until one passes.
pub fn try_dane_connection(domain: &str, settings: &Settings) -> Result<ConnectOutcome, DaneError> {
    let resolver = DaneResolver::from_settings(settings)?;
    let records = resolver.resolve_dane_records(domain)?;
    if records.is_empty() {
        info!("No mail servers with DANE records for {}", domain);
    }
    let session = SmtpSession::new(settings.smtp.clone());
    Ok(connect_to_servers(domain, &records, &session))
}

/// Probe the servers of `records` in order, stopping at the first success
pub fn connect_to_servers(
    domain: &str,
    records: &MailServerRecords,
    session: &SmtpSession,
) -> ConnectOutcome {
    let mut attempts = Vec::new();

    for (server, server_records) in records.iter() {
        let trust: Arc<dyn ServerTrust> = Arc::new(DaneTrustDecider::new(server_records.clone()));
        match session.probe(server, trust) {
            Ok(report) => {
                info!("DANE verified connection to {} for {}", server, domain);
                attempts.push(ServerAttempt {
                    server: server.to_string(),
                    error: None,
                });
                return ConnectOutcome {
                    domain: domain.to_string(),
                    attempts,
                    connected: Some(report),
                };
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", server, e);
                attempts.push(ServerAttempt {
                    server: server.to_string(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    ConnectOutcome {
        domain: domain.to_string(),
        attempts,
        connected: None,
    }
}

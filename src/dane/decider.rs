//! DANE trust decision
//!
//! Matches a presented certificate chain (leaf first) against the DANE
//! records of one mail server. Records are the only trust anchor: no root
//! store is consulted and certificate validity dates are not checked.
//!
//! Order of evaluation:
//! 1. DANE-EE records against the leaf (chain index 0)
//! 2. DANE-TA records against the first intermediate (chain index 1),
//!    followed by a signature check of every adjacent pair in the chain
//!
//! PKIX-TA and PKIX-EE records are never used for SMTP.

use crate::dane::record::{CertificateUsage, DaneRecord, MatchingType, Selector};
use crate::utils::{CryptoError, TrustError};
use sha2::{Digest, Sha256, Sha512};
use std::collections::HashSet;
use tracing::{debug, error, warn};
use x509_parser::prelude::*;

/// Outcome of a trust decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    Accept,
    Reject(TrustError),
}

impl TrustDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TrustDecision::Accept)
    }

    pub fn into_result(self) -> Result<(), TrustError> {
        match self {
            TrustDecision::Accept => Ok(()),
            TrustDecision::Reject(reason) => Err(reason),
        }
    }
}

/// Decides whether a server certificate chain is trusted.
///
/// Invoked by the TLS layer during the handshake with the DER chain as
/// presented (leaf first) and the key exchange algorithm name.
pub trait ServerTrust: std::fmt::Debug + Send + Sync {
    fn decide(&self, chain: &[&[u8]], key_exchange: &str) -> TrustDecision;
}

/// [`ServerTrust`] bound to the DANE records of one mail server
#[derive(Debug, Clone)]
pub struct DaneTrustDecider {
    records: HashSet<DaneRecord>,
}

impl DaneTrustDecider {
    pub fn new(records: HashSet<DaneRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &HashSet<DaneRecord> {
        &self.records
    }
}

impl ServerTrust for DaneTrustDecider {
    fn decide(&self, chain: &[&[u8]], key_exchange: &str) -> TrustDecision {
        decide(chain, key_exchange, &self.records)
    }
}

/// Decide whether `chain` is trusted by any of `records`
pub fn decide<C: AsRef<[u8]>>(
    chain: &[C],
    key_exchange: &str,
    records: &HashSet<DaneRecord>,
) -> TrustDecision {
    if chain.is_empty() {
        return TrustDecision::Reject(TrustError::EmptyChain);
    }
    if key_exchange.trim().is_empty() {
        return TrustDecision::Reject(TrustError::MissingKeyExchange);
    }
    let Some(any) = records.iter().next() else {
        return TrustDecision::Reject(TrustError::NoRecords);
    };

    let supported: Vec<&DaneRecord> = records.iter().filter(|r| r.is_supported()).collect();

    let leaf = chain[0].as_ref();
    for record in supported
        .iter()
        .filter(|r| r.certificate_usage() == CertificateUsage::DaneEe)
    {
        if candidate_matches(record, leaf, 0) {
            debug!("Leaf certificate matches DANE-EE record {}", record);
            return TrustDecision::Accept;
        }
    }

    if chain.len() > 1 {
        let anchor = chain[1].as_ref();
        for record in supported
            .iter()
            .filter(|r| r.certificate_usage() == CertificateUsage::DaneTa)
        {
            if !candidate_matches(record, anchor, 1) {
                continue;
            }
            match verify_chain_links(chain) {
                Ok(()) => {
                    debug!("Chain anchored by DANE-TA record {}", record);
                    return TrustDecision::Accept;
                }
                Err(e) => warn!("DANE-TA record {} matched but chain is broken: {}", record, e),
            }
        }
    }

    TrustDecision::Reject(TrustError::NoMatch {
        domain: any.domain().to_string(),
        mx_domain: any.mx_domain().to_string(),
    })
}

fn candidate_matches(record: &DaneRecord, der: &[u8], index: usize) -> bool {
    match association(der, index, record.selector(), record.matching_type()) {
        Ok(data) => data == record.certificate_association_data(),
        Err(e) => {
            error!("Cannot evaluate DANE record {}: {}", record, e);
            false
        }
    }
}

/// Certificate association data of a DER certificate.
///
/// The full certificate or its SubjectPublicKeyInfo, hashed according to
/// the matching type.
pub fn association(
    der: &[u8],
    index: usize,
    selector: Selector,
    matching_type: MatchingType,
) -> Result<Vec<u8>, CryptoError> {
    let spki;
    let selected: &[u8] = match selector {
        Selector::Full => der,
        Selector::PublicKey => {
            let (_, cert) = X509Certificate::from_der(der).map_err(|e| CryptoError::Parse {
                index,
                message: e.to_string(),
            })?;
            spki = cert.public_key().raw.to_vec();
            &spki
        }
    };

    Ok(match matching_type {
        MatchingType::Full => selected.to_vec(),
        MatchingType::Sha256 => Sha256::digest(selected).to_vec(),
        MatchingType::Sha512 => Sha512::digest(selected).to_vec(),
    })
}

/// Check that every certificate is signed by its successor in the chain.
///
/// Only the presented chain is checked; it need not end in a root.
pub fn verify_chain_links<C: AsRef<[u8]>>(chain: &[C]) -> Result<(), CryptoError> {
    let parsed = chain
        .iter()
        .enumerate()
        .map(|(index, der)| {
            X509Certificate::from_der(der.as_ref())
                .map(|(_, cert)| cert)
                .map_err(|e| CryptoError::Parse {
                    index,
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (index, pair) in parsed.windows(2).enumerate() {
        let (child, parent) = (&pair[0], &pair[1]);
        child
            .verify_signature(Some(parent.public_key()))
            .map_err(|e| CryptoError::Signature {
                index,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(usage: CertificateUsage, data: Vec<u8>) -> DaneRecord {
        DaneRecord::new(
            "example.nl",
            "mx1.example.nl",
            usage,
            Selector::Full,
            MatchingType::Full,
            data,
        )
    }

    #[test]
    fn test_empty_chain_rejected() {
        let chain: Vec<Vec<u8>> = Vec::new();
        let records = HashSet::from([record(CertificateUsage::DaneEe, vec![1])]);
        assert_eq!(
            decide(&chain, "RSA", &records),
            TrustDecision::Reject(TrustError::EmptyChain)
        );
    }

    #[test]
    fn test_blank_key_exchange_rejected() {
        let records = HashSet::from([record(CertificateUsage::DaneEe, vec![1])]);
        assert_eq!(
            decide(&[vec![1u8]], "  ", &records),
            TrustDecision::Reject(TrustError::MissingKeyExchange)
        );
    }

    #[test]
    fn test_no_records_rejected() {
        assert_eq!(
            decide(&[vec![1u8]], "RSA", &HashSet::new()),
            TrustDecision::Reject(TrustError::NoRecords)
        );
    }

    #[test]
    fn test_full_full_matches_raw_bytes() {
        // Selector FULL with matching FULL compares the DER as is, so no
        // parsing is needed.
        let der = vec![0x30, 0x03, 0x01, 0x02, 0x03];
        let records = HashSet::from([record(CertificateUsage::DaneEe, der.clone())]);
        assert!(decide(&[der], "RSA", &records).is_accepted());
    }

    #[test]
    fn test_pkix_record_never_accepts() {
        let der = vec![0x30, 0x03, 0x01, 0x02, 0x03];
        for usage in [CertificateUsage::PkixEe, CertificateUsage::PkixTa] {
            let records = HashSet::from([record(usage, der.clone())]);
            let decision = decide(&[der.clone(), der.clone()], "RSA", &records);
            assert!(matches!(
                decision,
                TrustDecision::Reject(TrustError::NoMatch { .. })
            ));
        }
    }

    #[test]
    fn test_unparsable_certificate_is_a_non_match() {
        let records = HashSet::from([DaneRecord::new(
            "example.nl",
            "mx1.example.nl",
            CertificateUsage::DaneEe,
            Selector::PublicKey,
            MatchingType::Sha256,
            vec![0; 32],
        )]);
        assert_eq!(
            decide(&[vec![0xffu8; 4]], "RSA", &records),
            TrustDecision::Reject(TrustError::NoMatch {
                domain: "mx1.example.nl".to_string(),
                mx_domain: "example.nl".to_string(),
            })
        );
    }

    #[test]
    fn test_public_key_association_uses_spki() {
        let leaf = ::pem::parse(include_str!("../../tests/fixtures/leaf.pem"))
            .unwrap()
            .into_contents();
        let (_, cert) = X509Certificate::from_der(&leaf).unwrap();
        let spki = cert.public_key().raw.to_vec();

        let full = association(&leaf, 0, Selector::PublicKey, MatchingType::Full).unwrap();
        assert_eq!(full, spki);
        let sha256 = association(&leaf, 0, Selector::PublicKey, MatchingType::Sha256).unwrap();
        assert_eq!(sha256, Sha256::digest(&spki).to_vec());
        let sha512 = association(&leaf, 0, Selector::PublicKey, MatchingType::Sha512).unwrap();
        assert_eq!(sha512.len(), 64);
    }

    #[test]
    fn test_into_result() {
        assert!(TrustDecision::Accept.into_result().is_ok());
        assert_eq!(
            TrustDecision::Reject(TrustError::EmptyChain).into_result(),
            Err(TrustError::EmptyChain)
        );
    }
}

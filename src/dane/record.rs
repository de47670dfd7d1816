//! DANE record model
//!
//! A [`DaneRecord`] is one TLSA record of a mail server, together with the
//! domain whose MX lookup led to that server. Instances are only built from
//! TLSA data whose usage, selector and matching type all decode; they are
//! never modified afterwards.

use crate::utils::{DaneError, RecordError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hickory_proto::rr::rdata::TLSA;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// TLSA certificate usage field (RFC 6698 §2.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CertificateUsage {
    /// CA constraint
    #[serde(rename = "PKIX_TA")]
    PkixTa = 0,
    /// Service certificate constraint
    #[serde(rename = "PKIX_EE")]
    PkixEe = 1,
    /// Trust anchor assertion
    #[serde(rename = "DANE_TA")]
    DaneTa = 2,
    /// Domain-issued certificate
    #[serde(rename = "DANE_EE")]
    DaneEe = 3,
}

impl CertificateUsage {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CertificateUsage::PkixTa),
            1 => Some(CertificateUsage::PkixEe),
            2 => Some(CertificateUsage::DaneTa),
            3 => Some(CertificateUsage::DaneEe),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn description(&self) -> &'static str {
        match self {
            CertificateUsage::PkixTa => "CA constraint (PKIX-TA)",
            CertificateUsage::PkixEe => "Service certificate constraint (PKIX-EE)",
            CertificateUsage::DaneTa => "Trust anchor assertion (DANE-TA)",
            CertificateUsage::DaneEe => "Domain-issued certificate (DANE-EE)",
        }
    }
}

impl TryFrom<u8> for CertificateUsage {
    type Error = RecordError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::from_u8(v).ok_or(RecordError::UnknownCertificateUsage(v))
    }
}

/// TLSA selector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Selector {
    /// Match the full certificate
    #[serde(rename = "FULL")]
    Full = 0,
    /// Match the SubjectPublicKeyInfo
    #[serde(rename = "PUBLIC_KEY")]
    PublicKey = 1,
}

impl Selector {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Selector::Full),
            1 => Some(Selector::PublicKey),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn description(&self) -> &'static str {
        match self {
            Selector::Full => "Full certificate",
            Selector::PublicKey => "SubjectPublicKeyInfo",
        }
    }
}

impl TryFrom<u8> for Selector {
    type Error = RecordError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::from_u8(v).ok_or(RecordError::UnknownSelector(v))
    }
}

/// TLSA matching type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MatchingType {
    /// Selected data is compared as is
    #[serde(rename = "FULL")]
    Full = 0,
    #[serde(rename = "SHA_256")]
    Sha256 = 1,
    #[serde(rename = "SHA_512")]
    Sha512 = 2,
}

impl MatchingType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(MatchingType::Full),
            1 => Some(MatchingType::Sha256),
            2 => Some(MatchingType::Sha512),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn description(&self) -> &'static str {
        match self {
            MatchingType::Full => "Exact match",
            MatchingType::Sha256 => "SHA-256 hash",
            MatchingType::Sha512 => "SHA-512 hash",
        }
    }
}

impl TryFrom<u8> for MatchingType {
    type Error = RecordError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::from_u8(v).ok_or(RecordError::UnknownMatchingType(v))
    }
}

/// One TLSA record of a mail server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaneRecord {
    mx_domain: String,
    #[serde(alias = "serverDomain")]
    domain: String,
    certificate_usage: CertificateUsage,
    selector: Selector,
    matching_type: MatchingType,
    #[serde(
        serialize_with = "serialize_base64",
        deserialize_with = "deserialize_base64"
    )]
    certificate_association_data: Vec<u8>,
}

fn serialize_base64<S: Serializer>(data: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&STANDARD.encode(data))
}

fn deserialize_base64<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(d)?;
    STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
}

impl DaneRecord {
    pub fn new(
        mx_domain: impl Into<String>,
        domain: impl Into<String>,
        certificate_usage: CertificateUsage,
        selector: Selector,
        matching_type: MatchingType,
        certificate_association_data: Vec<u8>,
    ) -> Self {
        Self {
            mx_domain: mx_domain.into(),
            domain: domain.into(),
            certificate_usage,
            selector,
            matching_type,
            certificate_association_data,
        }
    }

    /// Build a record from raw TLSA field values.
    ///
    /// Fails on the first field that is not a known code; no partially
    /// decoded record is ever produced.
    pub fn from_fields(
        mx_domain: &str,
        domain: &str,
        usage: u8,
        selector: u8,
        matching_type: u8,
        data: &[u8],
    ) -> Result<Self, RecordError> {
        Ok(Self::new(
            mx_domain,
            domain,
            CertificateUsage::try_from(usage)?,
            Selector::try_from(selector)?,
            MatchingType::try_from(matching_type)?,
            data.to_vec(),
        ))
    }

    /// Build a record from TLSA RDATA received for `domain`
    pub fn from_tlsa(mx_domain: &str, domain: &str, tlsa: &TLSA) -> Result<Self, RecordError> {
        Self::from_fields(
            mx_domain,
            domain,
            u8::from(tlsa.cert_usage()),
            u8::from(tlsa.selector()),
            u8::from(tlsa.matching()),
            tlsa.cert_data(),
        )
    }

    /// Domain whose MX lookup produced this record
    pub fn mx_domain(&self) -> &str {
        &self.mx_domain
    }

    /// Mail server the TLSA record belongs to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn certificate_usage(&self) -> CertificateUsage {
        self.certificate_usage
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn matching_type(&self) -> MatchingType {
        self.matching_type
    }

    pub fn certificate_association_data(&self) -> &[u8] {
        &self.certificate_association_data
    }

    /// Whether the usage is permitted for SMTP.
    ///
    /// RFC 7672 §3.1.3: PKIX-TA and PKIX-EE must not be used for MX hosts.
    pub fn is_supported(&self) -> bool {
        !matches!(
            self.certificate_usage,
            CertificateUsage::PkixTa | CertificateUsage::PkixEe
        )
    }

    /// Serialize to the fixture JSON format
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from the fixture JSON format
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a record stored with [`DaneRecord::store`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DaneError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Write the record as fixture JSON
    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<(), DaneError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl fmt::Display for DaneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.certificate_usage.value(),
            self.selector.value(),
            self.matching_type.value(),
            hex::encode(&self.certificate_association_data)
        )
    }
}

//! rustls certificate verifier backed by a DANE trust decision

use crate::dane::ServerTrust;
use crate::utils::SmtpError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as RustlsError, SignatureScheme};
use std::sync::Arc;
use tracing::debug;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Server certificate verifier that defers the trust decision to a
/// [`ServerTrust`] implementation.
///
/// The server name is not checked: the DANE records were looked up for the
/// server being contacted, which binds the name. Handshake signatures are
/// still verified with the ring provider.
#[derive(Debug)]
pub struct DaneCertVerifier {
    trust: Arc<dyn ServerTrust>,
    provider: Arc<CryptoProvider>,
}

impl DaneCertVerifier {
    pub fn new(trust: Arc<dyn ServerTrust>) -> Self {
        Self {
            trust,
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }

    /// Client configuration using this verifier and no client certificate
    pub fn client_config(self) -> Result<ClientConfig, SmtpError> {
        let provider = self.provider.clone();
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(self))
            .with_no_client_auth();
        Ok(config)
    }
}

impl ServerCertVerifier for DaneCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        let chain: Vec<&[u8]> = std::iter::once(end_entity.as_ref())
            .chain(intermediates.iter().map(|c| c.as_ref()))
            .collect();
        let key_exchange = key_exchange_name(end_entity.as_ref());
        debug!(
            "Verifying chain of {} certificate(s), key exchange {}",
            chain.len(),
            key_exchange
        );

        self.trust
            .decide(&chain, &key_exchange)
            .into_result()
            .map(|()| ServerCertVerified::assertion())
            .map_err(|reason| RustlsError::General(format!("DANE verification failed: {}", reason)))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Key exchange identifier for a leaf certificate.
///
/// rustls does not expose the negotiated authentication type to verifiers,
/// so it is derived from the leaf's public key algorithm: `RSA`, `EC`,
/// `DSA`, or the dotted algorithm OID for anything else.
pub fn key_exchange_name(leaf_der: &[u8]) -> String {
    let Ok((_, cert)) = X509Certificate::from_der(leaf_der) else {
        return "UNKNOWN".to_string();
    };
    let spki = cert.public_key();
    match spki.parsed() {
        Ok(PublicKey::RSA(_)) => "RSA".to_string(),
        Ok(PublicKey::EC(_)) => "EC".to_string(),
        Ok(PublicKey::DSA(_)) => "DSA".to_string(),
        _ => spki.algorithm.algorithm.to_id_string(),
    }
}

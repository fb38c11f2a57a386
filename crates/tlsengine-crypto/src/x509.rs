//! Minimal X.509 certificate inspection: names and the RSA subject key.
//!
//! Path validation is not performed; the engine only needs the server's
//! public key for key transport and ServerKeyExchange verification.

use crate::rsa_key::RsaPublicKey;
use tlsengine_types::CryptoError;
use x509_parser::prelude::{FromDer, X509Certificate};

/// The parts of a certificate the handshake consumes.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    /// DER `SubjectPublicKeyInfo`.
    pub spki_der: Vec<u8>,
}

impl CertificateInfo {
    /// The subject key as an RSA public key.
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey, CryptoError> {
        RsaPublicKey::from_spki_der(&self.spki_der)
    }
}

/// Parse one DER certificate.
pub fn parse_certificate(der: &[u8]) -> Result<CertificateInfo, CryptoError> {
    let (rest, cert) = X509Certificate::from_der(der).map_err(|_| CryptoError::DecodeAsn1Fail)?;
    if !rest.is_empty() {
        return Err(CryptoError::DecodeAsn1Fail);
    }
    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        spki_der: cert.public_key().raw.to_vec(),
    })
}

/// Parse an ordered chain of DER certificates (leaf first).
pub fn parse_der_chain<T: AsRef<[u8]>>(chain: &[T]) -> Result<Vec<CertificateInfo>, CryptoError> {
    chain.iter().map(|der| parse_certificate(der.as_ref())).collect()
}

//! Connection information snapshot.
//!
//! Once a cipher suite has been negotiated, callers can query the connection
//! parameters through the [`ConnectionInfo`] returned by
//! `TlsEngine::connection_info()`.

use std::fmt;

use crate::crypt::{suite_name, NamedGroup, SignatureScheme};
use crate::session::Session;
use crate::{CipherSuite, TlsVersion};
use tlsengine_crypto::encoding::certificate_to_pem;
use zeroize::Zeroizing;

/// Snapshot of negotiated connection parameters.
#[derive(Clone)]
pub struct ConnectionInfo {
    protocol_version: TlsVersion,
    cipher_suite: CipherSuite,
    session_id: Vec<u8>,
    peer_certificates: Vec<Vec<u8>>,
    negotiated_group: Option<NamedGroup>,
    signature_scheme: Option<SignatureScheme>,
    master_secret: Option<Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("protocol_version", &self.protocol_version)
            .field("cipher_suite", &self.cipher_suite_name())
            .field("session_id", &self.session_id)
            .field("peer_certificates", &self.peer_certificates.len())
            .field("negotiated_group", &self.negotiated_group)
            .field("signature_scheme", &self.signature_scheme)
            .finish_non_exhaustive()
    }
}

impl ConnectionInfo {
    /// `None` until a cipher suite has been negotiated.
    pub(crate) fn from_session(session: &Session) -> Option<Self> {
        let params = session.cipher_suite.as_ref()?;
        Some(Self {
            protocol_version: session.version,
            cipher_suite: params.suite,
            session_id: session.session_id.clone(),
            peer_certificates: session.peer_certificates.clone(),
            negotiated_group: session.negotiated_group,
            signature_scheme: session.signature_scheme,
            master_secret: session.master_secret().map(|ms| Zeroizing::new(ms.to_vec())),
        })
    }

    pub fn protocol_version(&self) -> TlsVersion {
        self.protocol_version
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    /// IANA name of the negotiated suite.
    pub fn cipher_suite_name(&self) -> &'static str {
        suite_name(self.cipher_suite)
    }

    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    /// Peer certificates (DER-encoded, leaf first). Empty on the server.
    pub fn peer_certificates(&self) -> &[Vec<u8>] {
        &self.peer_certificates
    }

    /// Peer certificates as PEM blocks, leaf first.
    pub fn peer_certificates_pem(&self) -> Vec<String> {
        self.peer_certificates
            .iter()
            .map(|der| certificate_to_pem(der))
            .collect()
    }

    /// ECDHE curve, `None` for RSA key exchange.
    pub fn negotiated_group(&self) -> Option<NamedGroup> {
        self.negotiated_group
    }

    /// ServerKeyExchange signature scheme. `None` for RSA key exchange and
    /// for the TLS 1.1 MD5||SHA-1 signature.
    pub fn signature_scheme(&self) -> Option<SignatureScheme> {
        self.signature_scheme
    }

    /// The 48-byte master secret, once the key exchange has run.
    pub fn master_secret(&self) -> Option<&[u8]> {
        self.master_secret.as_deref().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::CipherSuiteParams;
    use crate::TlsRole;

    const CERT_PEM: &str = include_str!("../../../testdata/server.crt");

    #[test]
    fn test_none_before_negotiation() {
        let session = Session::new(TlsRole::Client, TlsVersion::Tls12).unwrap();
        assert!(ConnectionInfo::from_session(&session).is_none());
    }

    #[test]
    fn test_snapshot_fields() {
        let mut session = Session::new(TlsRole::Client, TlsVersion::Tls12).unwrap();
        session.version = TlsVersion::Tls11;
        session.cipher_suite = Some(
            CipherSuiteParams::from_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA).unwrap(),
        );
        session.session_id = vec![5; 8];
        session.peer_certificates =
            tlsengine_crypto::encoding::pem_to_der_chain(CERT_PEM).unwrap();
        session.set_master_secret(Zeroizing::new(vec![0xab; 48]));

        let info = ConnectionInfo::from_session(&session).unwrap();
        assert_eq!(info.protocol_version(), TlsVersion::Tls11);
        assert_eq!(info.cipher_suite_name(), "TLS_RSA_WITH_AES_128_CBC_SHA");
        assert_eq!(info.session_id(), &[5; 8]);
        assert_eq!(info.master_secret(), Some(&[0xab; 48][..]));
        assert_eq!(info.negotiated_group(), None);

        let pem = info.peer_certificates_pem();
        assert_eq!(pem.len(), 1);
        assert!(pem[0].starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert_eq!(pem[0].trim_end(), CERT_PEM.trim_end());

        let debug = format!("{info:?}");
        assert!(!debug.contains("master_secret"));
    }
}

//! TLS configuration with builder pattern.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::crypt::{CipherSuiteParams, NamedGroup, SignatureScheme, SUPPORTED_CIPHER_SUITES};
use crate::{CipherSuite, TlsRole, TlsVersion};
use tlsengine_crypto::encoding::{load_rsa_private_key, pem_to_der_chain};
use tlsengine_crypto::RsaPrivateKey;
use tlsengine_types::TlsError;

/// Receives NSS key log lines (`CLIENT_RANDOM <random> <master secret>`).
pub type KeyLogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// TLS configuration.
#[derive(Clone)]
pub struct TlsConfig {
    pub role: TlsRole,
    /// Highest version offered (client) or accepted (server).
    pub max_version: TlsVersion,
    /// Enabled cipher suites, in preference order for the ClientHello.
    pub cipher_suites: Vec<CipherSuite>,
    /// Curves offered (client) or accepted (server) for ECDHE.
    pub supported_groups: Vec<NamedGroup>,
    /// Signature algorithms offered (client) or accepted (server).
    pub signature_algorithms: Vec<SignatureScheme>,
    /// Server certificate chain, DER, leaf first.
    pub certificate_chain: Vec<Vec<u8>>,
    /// Server RSA private key.
    pub private_key: Option<RsaPrivateKey>,
    /// Client: check the ServerKeyExchange signature against the leaf key.
    pub verify_server_key_exchange: bool,
    /// Send close_notify from `TlsEngine::close`.
    pub send_close_notify: bool,
    pub key_log_callback: Option<KeyLogCallback>,
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("role", &self.role)
            .field("max_version", &self.max_version)
            .field("cipher_suites", &self.cipher_suites)
            .field("supported_groups", &self.supported_groups)
            .field("signature_algorithms", &self.signature_algorithms)
            .field("certificate_chain_len", &self.certificate_chain.len())
            .field("private_key", &self.private_key.as_ref().map(|_| "<rsa key>"))
            .field("verify_server_key_exchange", &self.verify_server_key_exchange)
            .field(
                "key_log_callback",
                &self.key_log_callback.as_ref().map(|_| "<callback>"),
            )
            .finish_non_exhaustive()
    }
}

impl TlsConfig {
    /// Create a builder for TLS configuration.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Check the configuration is usable for its role.
    pub fn validate(&self) -> Result<(), TlsError> {
        if self.cipher_suites.is_empty() {
            return Err(TlsError::InvalidConfig("no cipher suites enabled".into()));
        }
        for suite in &self.cipher_suites {
            CipherSuiteParams::from_suite(*suite).map_err(|_| {
                TlsError::InvalidConfig(format!("unsupported cipher suite {:#06x}", suite.0))
            })?;
        }
        if self.role == TlsRole::Server {
            if self.certificate_chain.is_empty() {
                return Err(TlsError::InvalidConfig(
                    "server requires a certificate chain".into(),
                ));
            }
            if self.private_key.is_none() {
                return Err(TlsError::InvalidConfig(
                    "server requires a private key".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for `TlsConfig`.
pub struct TlsConfigBuilder {
    role: TlsRole,
    max_version: TlsVersion,
    cipher_suites: Vec<CipherSuite>,
    supported_groups: Vec<NamedGroup>,
    signature_algorithms: Vec<SignatureScheme>,
    certificate_chain: Vec<Vec<u8>>,
    private_key: Option<RsaPrivateKey>,
    verify_server_key_exchange: bool,
    send_close_notify: bool,
    key_log_callback: Option<KeyLogCallback>,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self {
            role: TlsRole::Client,
            max_version: TlsVersion::Tls12,
            cipher_suites: SUPPORTED_CIPHER_SUITES.to_vec(),
            supported_groups: vec![NamedGroup::SECP256R1, NamedGroup::SECP384R1],
            signature_algorithms: vec![
                SignatureScheme::RSA_PKCS1_SHA512,
                SignatureScheme::RSA_PKCS1_SHA384,
                SignatureScheme::RSA_PKCS1_SHA256,
            ],
            certificate_chain: Vec::new(),
            private_key: None,
            verify_server_key_exchange: true,
            send_close_notify: true,
            key_log_callback: None,
        }
    }
}

impl fmt::Debug for TlsConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfigBuilder")
            .field("role", &self.role)
            .field("max_version", &self.max_version)
            .field("cipher_suites", &self.cipher_suites)
            .finish_non_exhaustive()
    }
}

impl TlsConfigBuilder {
    pub fn role(mut self, role: TlsRole) -> Self {
        self.role = role;
        self
    }

    pub fn max_version(mut self, version: TlsVersion) -> Self {
        self.max_version = version;
        self
    }

    pub fn cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.cipher_suites = suites.to_vec();
        self
    }

    pub fn supported_groups(mut self, groups: &[NamedGroup]) -> Self {
        self.supported_groups = groups.to_vec();
        self
    }

    pub fn signature_algorithms(mut self, schemes: &[SignatureScheme]) -> Self {
        self.signature_algorithms = schemes.to_vec();
        self
    }

    pub fn certificate_chain(mut self, certs: Vec<Vec<u8>>) -> Self {
        self.certificate_chain = certs;
        self
    }

    pub fn private_key(mut self, key: RsaPrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn verify_server_key_exchange(mut self, verify: bool) -> Self {
        self.verify_server_key_exchange = verify;
        self
    }

    pub fn send_close_notify(mut self, send: bool) -> Self {
        self.send_close_notify = send;
        self
    }

    pub fn key_log(mut self, cb: KeyLogCallback) -> Self {
        self.key_log_callback = Some(cb);
        self
    }

    /// Load the certificate chain and private key from PEM text.
    ///
    /// `passphrase` unlocks an `ENCRYPTED PRIVATE KEY` block.
    pub fn identity_from_pem(
        mut self,
        cert_pem: &str,
        key_pem: &str,
        passphrase: Option<&str>,
    ) -> Result<Self, TlsError> {
        self.certificate_chain = pem_to_der_chain(cert_pem)
            .map_err(|e| TlsError::InvalidConfig(format!("certificate: {e}")))?;
        self.private_key = Some(
            load_rsa_private_key(key_pem, passphrase)
                .map_err(|e| TlsError::InvalidConfig(format!("private key: {e}")))?,
        );
        Ok(self)
    }

    /// Load the certificate chain and private key from PEM files.
    pub fn identity_from_files(
        self,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        passphrase: Option<&str>,
    ) -> Result<Self, TlsError> {
        let cert_pem = std::fs::read_to_string(cert_path)?;
        let key_pem = zeroize::Zeroizing::new(std::fs::read_to_string(key_path)?);
        self.identity_from_pem(&cert_pem, &key_pem, passphrase)
    }

    pub fn build(self) -> TlsConfig {
        TlsConfig {
            role: self.role,
            max_version: self.max_version,
            cipher_suites: self.cipher_suites,
            supported_groups: self.supported_groups,
            signature_algorithms: self.signature_algorithms,
            certificate_chain: self.certificate_chain,
            private_key: self.private_key,
            verify_server_key_exchange: self.verify_server_key_exchange,
            send_close_notify: self.send_close_notify,
            key_log_callback: self.key_log_callback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_PEM: &str = include_str!("../../../../testdata/server.crt");
    const KEY_PEM: &str = include_str!("../../../../testdata/server.key");
    const KEY_ENCRYPTED: &str = include_str!("../../../../testdata/server.enc.key");

    #[test]
    fn test_config_builder_defaults() {
        let config = TlsConfig::builder().build();
        assert_eq!(config.role, TlsRole::Client);
        assert_eq!(config.max_version, TlsVersion::Tls12);
        assert_eq!(config.cipher_suites.len(), 10);
        assert_eq!(
            config.supported_groups,
            vec![NamedGroup::SECP256R1, NamedGroup::SECP384R1]
        );
        assert_eq!(config.signature_algorithms[0], SignatureScheme::RSA_PKCS1_SHA512);
        assert!(config.verify_server_key_exchange);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_requires_identity() {
        let config = TlsConfig::builder().role(TlsRole::Server).build();
        assert!(matches!(config.validate(), Err(TlsError::InvalidConfig(_))));
    }

    #[test]
    fn test_identity_from_pem() {
        let config = TlsConfig::builder()
            .role(TlsRole::Server)
            .identity_from_pem(CERT_PEM, KEY_PEM, None)
            .unwrap()
            .build();
        assert_eq!(config.certificate_chain.len(), 1);
        assert!(config.private_key.is_some());
        config.validate().unwrap();
    }

    #[test]
    fn test_identity_with_passphrase() {
        let ok = TlsConfig::builder().identity_from_pem(CERT_PEM, KEY_ENCRYPTED, Some("changeit"));
        assert!(ok.is_ok());
        let bad = TlsConfig::builder().identity_from_pem(CERT_PEM, KEY_ENCRYPTED, Some("nope"));
        assert!(matches!(bad, Err(TlsError::InvalidConfig(_))));
    }

    #[test]
    fn test_identity_from_missing_file() {
        let err = TlsConfig::builder()
            .identity_from_files("/nonexistent/cert.pem", "/nonexistent/key.pem", None)
            .unwrap_err();
        assert!(matches!(err, TlsError::IoError(_)));
    }

    #[test]
    fn test_validate_rejects_unknown_suite() {
        let config = TlsConfig::builder()
            .cipher_suites(&[CipherSuite(0x1301)])
            .build();
        assert!(config.validate().is_err());
        let empty = TlsConfig::builder().cipher_suites(&[]).build();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let config = TlsConfig::builder()
            .identity_from_pem(CERT_PEM, KEY_PEM, None)
            .unwrap()
            .build();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("<rsa key>"));
    }
}

//! PEM <-> DER conversion and private key loading.

use crate::rsa_key::RsaPrivateKey;
use ::rsa::pkcs1::DecodeRsaPrivateKey;
use pkcs8::DecodePrivateKey;
use tlsengine_types::CryptoError;
use zeroize::Zeroizing;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Decode every `CERTIFICATE` block in `pem_text`, in order.
pub fn pem_to_der_chain(pem_text: &str) -> Result<Vec<Vec<u8>>, CryptoError> {
    let blocks =
        pem::parse_many(pem_text).map_err(|e| CryptoError::DecodePemFail(e.to_string()))?;
    let chain: Vec<Vec<u8>> = blocks
        .into_iter()
        .filter(|p| p.tag() == CERTIFICATE_TAG)
        .map(|p| p.into_contents())
        .collect();
    if chain.is_empty() {
        return Err(CryptoError::DecodePemFail("no CERTIFICATE block".into()));
    }
    Ok(chain)
}

/// Encode DER bytes as a PEM block with the given label.
pub fn der_to_pem(label: &str, der: &[u8]) -> String {
    let block = pem::Pem::new(label, der.to_vec());
    pem::encode_config(
        &block,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Encode a DER certificate as PEM.
pub fn certificate_to_pem(der: &[u8]) -> String {
    der_to_pem(CERTIFICATE_TAG, der)
}

/// Load an RSA private key from PEM.
///
/// Accepts PKCS#1 (`RSA PRIVATE KEY`), PKCS#8 (`PRIVATE KEY`) and
/// password-protected PKCS#8 (`ENCRYPTED PRIVATE KEY`). Legacy
/// OpenSSL-encrypted PKCS#1 blocks are rejected.
pub fn load_rsa_private_key(
    pem_text: &str,
    passphrase: Option<&str>,
) -> Result<RsaPrivateKey, CryptoError> {
    let blocks =
        pem::parse_many(pem_text).map_err(|e| CryptoError::DecodePemFail(e.to_string()))?;
    for block in blocks {
        let der = Zeroizing::new(block.contents().to_vec());
        let key = match block.tag() {
            "RSA PRIVATE KEY" => {
                if block.headers().get("Proc-Type").is_some() {
                    return Err(CryptoError::UnsupportedKeyFormat(
                        "legacy encrypted PKCS#1 PEM".into(),
                    ));
                }
                ::rsa::RsaPrivateKey::from_pkcs1_der(&der).map_err(|_| CryptoError::InvalidKey)
            }
            "PRIVATE KEY" => {
                ::rsa::RsaPrivateKey::from_pkcs8_der(&der).map_err(|_| CryptoError::InvalidKey)
            }
            "ENCRYPTED PRIVATE KEY" => {
                let password = passphrase.ok_or_else(|| {
                    CryptoError::UnsupportedKeyFormat("encrypted key needs a passphrase".into())
                })?;
                ::rsa::RsaPrivateKey::from_pkcs8_encrypted_der(&der, password)
                    .map_err(|_| CryptoError::InvalidKey)
            }
            _ => continue,
        };
        return key.map(RsaPrivateKey::from);
    }
    Err(CryptoError::DecodePemFail("no private key block".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_PEM: &str = include_str!("../../../testdata/server.crt");
    const KEY_PKCS1: &str = include_str!("../../../testdata/server.key");
    const KEY_PKCS8: &str = include_str!("../../../testdata/server.pk8.key");
    const KEY_ENCRYPTED: &str = include_str!("../../../testdata/server.enc.key");

    #[test]
    fn test_pem_der_pem() {
        let chain = pem_to_der_chain(CERT_PEM).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0][0], 0x30);
        let pem_again = certificate_to_pem(&chain[0]);
        assert!(pem_again.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert_eq!(pem_to_der_chain(&pem_again).unwrap(), chain);
    }

    #[test]
    fn test_pem_without_certificate() {
        assert!(matches!(
            pem_to_der_chain(KEY_PKCS1),
            Err(CryptoError::DecodePemFail(_))
        ));
    }

    #[test]
    fn test_all_key_formats_load_same_key() {
        let a = load_rsa_private_key(KEY_PKCS1, None).unwrap();
        let b = load_rsa_private_key(KEY_PKCS8, None).unwrap();
        let c = load_rsa_private_key(KEY_ENCRYPTED, Some("changeit")).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.public_key(), c.public_key());
    }

    #[test]
    fn test_encrypted_key_passphrase_errors() {
        assert!(matches!(
            load_rsa_private_key(KEY_ENCRYPTED, None),
            Err(CryptoError::UnsupportedKeyFormat(_))
        ));
        assert_eq!(
            load_rsa_private_key(KEY_ENCRYPTED, Some("wrong")).unwrap_err(),
            CryptoError::InvalidKey
        );
    }

    #[test]
    fn test_key_missing() {
        assert!(matches!(
            load_rsa_private_key(CERT_PEM, None),
            Err(CryptoError::DecodePemFail(_))
        ));
    }
}

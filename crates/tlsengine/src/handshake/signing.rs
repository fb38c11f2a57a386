//! ServerKeyExchange signatures (RFC 5246 §7.4.3, RFC 4346 §7.4.3).

use crate::crypt::SignatureScheme;
use crate::TlsVersion;
use tlsengine_crypto::{RsaPrivateKey, RsaPublicKey};
use tlsengine_types::TlsError;

/// RSA schemes the server signs with, in no particular preference; the
/// client's order decides.
const SERVER_SIGNING_SCHEMES: [SignatureScheme; 4] = [
    SignatureScheme::RSA_PKCS1_SHA512,
    SignatureScheme::RSA_PKCS1_SHA384,
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::RSA_PKCS1_SHA1,
];

/// Pick the ServerKeyExchange signature scheme.
///
/// TLS 1.1 has no negotiation and returns `None` (MD5||SHA-1). On TLS 1.2 a
/// missing `signature_algorithms` extension means rsa_pkcs1_sha1; otherwise
/// the first client entry the server supports wins.
pub fn select_signature_scheme(
    version: TlsVersion,
    client_schemes: Option<&[SignatureScheme]>,
) -> Result<Option<SignatureScheme>, TlsError> {
    if version == TlsVersion::Tls11 {
        return Ok(None);
    }
    let Some(schemes) = client_schemes else {
        return Ok(Some(SignatureScheme::RSA_PKCS1_SHA1));
    };
    schemes
        .iter()
        .copied()
        .find(|s| SERVER_SIGNING_SCHEMES.contains(s))
        .map(Some)
        .ok_or_else(|| TlsError::handshake_failure("no common signature algorithm"))
}

/// Sign `data` with PKCS#1 v1.5 under `scheme`'s hash, or MD5||SHA-1 when
/// `scheme` is `None`.
pub fn sign_ske_data(
    key: &RsaPrivateKey,
    scheme: Option<SignatureScheme>,
    data: &[u8],
) -> Result<Vec<u8>, TlsError> {
    let hash = match scheme {
        Some(s) => Some(s.rsa_hash().ok_or_else(|| {
            TlsError::internal_error(format!("cannot sign with scheme {:#06x}", s.0))
        })?),
        None => None,
    };
    key.sign_pkcs1(hash, data).map_err(TlsError::CryptoError)
}

/// Verify a ServerKeyExchange signature. Any failure is `handshake_failure`.
pub fn verify_ske_signature(
    key: &RsaPublicKey,
    scheme: Option<SignatureScheme>,
    data: &[u8],
    signature: &[u8],
) -> Result<(), TlsError> {
    let hash = match scheme {
        Some(s) => Some(s.rsa_hash().ok_or_else(|| {
            TlsError::handshake_failure(format!("unsupported signature scheme {:#06x}", s.0))
        })?),
        None => None,
    };
    key.verify_pkcs1(hash, data, signature)
        .map_err(|_| TlsError::handshake_failure("ServerKeyExchange signature invalid"))
}

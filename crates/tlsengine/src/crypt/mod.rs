//! Cipher suite catalog and the TLS-level cryptographic building blocks.
//!
//! Bridges the protocol with the primitives in `tlsengine-crypto`.

pub mod aead;
pub mod key_schedule;
pub mod keylog;
pub mod prf;
pub mod transcript;

use crate::{CipherSuite, TlsVersion};
use tlsengine_crypto::{EllipticCurve, HashAlgorithm};
use tlsengine_types::TlsError;

/// Every suite this engine can negotiate, in default preference order.
pub const SUPPORTED_CIPHER_SUITES: [CipherSuite; 10] = [
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA256,
    CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256,
    CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
];

/// TLS named group identifiers (RFC 4492 "elliptic_curves").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamedGroup(pub u16);

impl NamedGroup {
    pub const SECP256R1: Self = Self(0x0017);
    pub const SECP384R1: Self = Self(0x0018);

    /// The curve backing this group, if the engine supports it.
    pub fn curve(self) -> Option<EllipticCurve> {
        match self {
            NamedGroup::SECP256R1 => Some(EllipticCurve::P256),
            NamedGroup::SECP384R1 => Some(EllipticCurve::P384),
            _ => None,
        }
    }
}

/// TLS 1.2 `SignatureAndHashAlgorithm` values, encoded as `hash << 8 | sig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureScheme(pub u16);

impl SignatureScheme {
    pub const RSA_PKCS1_SHA1: Self = Self(0x0201);
    pub const RSA_PKCS1_SHA256: Self = Self(0x0401);
    pub const RSA_PKCS1_SHA384: Self = Self(0x0501);
    pub const RSA_PKCS1_SHA512: Self = Self(0x0601);

    /// Hash half of the scheme, for RSA schemes this engine signs with.
    pub fn rsa_hash(self) -> Option<HashAlgorithm> {
        match self {
            SignatureScheme::RSA_PKCS1_SHA1 => Some(HashAlgorithm::Sha1),
            SignatureScheme::RSA_PKCS1_SHA256 => Some(HashAlgorithm::Sha256),
            SignatureScheme::RSA_PKCS1_SHA384 => Some(HashAlgorithm::Sha384),
            SignatureScheme::RSA_PKCS1_SHA512 => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// Key exchange algorithm of a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeAlg {
    /// Client encrypts the premaster secret to the certificate's RSA key.
    Rsa,
    /// Ephemeral ECDH, parameters signed with the certificate's RSA key.
    Ecdhe,
}

/// Bulk cipher category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherType {
    /// AES-CBC with HMAC, MAC-then-encrypt.
    Block,
    /// AES-GCM.
    Aead,
}

/// Parameters associated with a cipher suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSuiteParams {
    pub suite: CipherSuite,
    pub kx_alg: KeyExchangeAlg,
    pub cipher_type: CipherType,
    /// Encryption key length in bytes (16 or 32).
    pub key_len: usize,
    /// IV length taken from the key block (4-byte salt for GCM, 16 for CBC).
    pub fixed_iv_len: usize,
    /// Explicit per-record IV/nonce length (8 for GCM, 16 for CBC).
    pub record_iv_len: usize,
    /// AEAD tag length (0 for CBC).
    pub tag_len: usize,
    /// MAC key and output length (0 for AEAD).
    pub mac_len: usize,
    /// HMAC hash for CBC suites.
    pub mac_hash: Option<HashAlgorithm>,
    /// TLS 1.2 PRF hash.
    pub prf_hash: HashAlgorithm,
}

impl CipherSuiteParams {
    /// Look up parameters for a cipher suite.
    pub fn from_suite(suite: CipherSuite) -> Result<Self, TlsError> {
        use CipherSuite as S;
        let (kx_alg, key_len, cipher_type, mac_hash, prf_hash) = match suite {
            S::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => {
                (KeyExchangeAlg::Ecdhe, 32, CipherType::Aead, None, HashAlgorithm::Sha384)
            }
            S::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => {
                (KeyExchangeAlg::Ecdhe, 16, CipherType::Aead, None, HashAlgorithm::Sha256)
            }
            S::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA => (
                KeyExchangeAlg::Ecdhe,
                32,
                CipherType::Block,
                Some(HashAlgorithm::Sha1),
                HashAlgorithm::Sha256,
            ),
            S::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA => (
                KeyExchangeAlg::Ecdhe,
                16,
                CipherType::Block,
                Some(HashAlgorithm::Sha1),
                HashAlgorithm::Sha256,
            ),
            S::TLS_RSA_WITH_AES_256_GCM_SHA384 => {
                (KeyExchangeAlg::Rsa, 32, CipherType::Aead, None, HashAlgorithm::Sha384)
            }
            S::TLS_RSA_WITH_AES_128_GCM_SHA256 => {
                (KeyExchangeAlg::Rsa, 16, CipherType::Aead, None, HashAlgorithm::Sha256)
            }
            S::TLS_RSA_WITH_AES_256_CBC_SHA256 => (
                KeyExchangeAlg::Rsa,
                32,
                CipherType::Block,
                Some(HashAlgorithm::Sha256),
                HashAlgorithm::Sha256,
            ),
            S::TLS_RSA_WITH_AES_256_CBC_SHA => (
                KeyExchangeAlg::Rsa,
                32,
                CipherType::Block,
                Some(HashAlgorithm::Sha1),
                HashAlgorithm::Sha256,
            ),
            S::TLS_RSA_WITH_AES_128_CBC_SHA256 => (
                KeyExchangeAlg::Rsa,
                16,
                CipherType::Block,
                Some(HashAlgorithm::Sha256),
                HashAlgorithm::Sha256,
            ),
            S::TLS_RSA_WITH_AES_128_CBC_SHA => (
                KeyExchangeAlg::Rsa,
                16,
                CipherType::Block,
                Some(HashAlgorithm::Sha1),
                HashAlgorithm::Sha256,
            ),
            other => {
                return Err(TlsError::handshake_failure(format!(
                    "unsupported cipher suite {:#06x}",
                    other.0
                )))
            }
        };
        let params = match cipher_type {
            CipherType::Aead => Self {
                suite,
                kx_alg,
                cipher_type,
                key_len,
                fixed_iv_len: 4,
                record_iv_len: 8,
                tag_len: 16,
                mac_len: 0,
                mac_hash,
                prf_hash,
            },
            CipherType::Block => Self {
                suite,
                kx_alg,
                cipher_type,
                key_len,
                fixed_iv_len: 16,
                record_iv_len: 16,
                tag_len: 0,
                mac_len: mac_hash.map_or(0, HashAlgorithm::output_size),
                mac_hash,
                prf_hash,
            },
        };
        Ok(params)
    }

    pub fn is_ecdhe(&self) -> bool {
        self.kx_alg == KeyExchangeAlg::Ecdhe
    }

    pub fn is_cbc(&self) -> bool {
        self.cipher_type == CipherType::Block
    }

    /// Whether the suite may be used with `version`.
    ///
    /// GCM and SHA-256 MAC suites are TLS 1.2 only.
    pub fn supports_version(&self, version: TlsVersion) -> bool {
        match version {
            TlsVersion::Tls12 => true,
            TlsVersion::Tls11 => {
                self.cipher_type == CipherType::Block
                    && self.mac_hash == Some(HashAlgorithm::Sha1)
            }
        }
    }

    /// Total key material needed from the key block.
    pub fn key_block_len(&self) -> usize {
        2 * self.mac_len + 2 * self.key_len + 2 * self.fixed_iv_len
    }

    /// IANA name of the suite.
    pub fn name(&self) -> &'static str {
        suite_name(self.suite)
    }
}

/// IANA name for a catalog suite, `"UNKNOWN"` otherwise.
pub fn suite_name(suite: CipherSuite) -> &'static str {
    use CipherSuite as S;
    match suite {
        S::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        S::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        S::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA => "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        S::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA => "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        S::TLS_RSA_WITH_AES_256_GCM_SHA384 => "TLS_RSA_WITH_AES_256_GCM_SHA384",
        S::TLS_RSA_WITH_AES_128_GCM_SHA256 => "TLS_RSA_WITH_AES_128_GCM_SHA256",
        S::TLS_RSA_WITH_AES_256_CBC_SHA256 => "TLS_RSA_WITH_AES_256_CBC_SHA256",
        S::TLS_RSA_WITH_AES_256_CBC_SHA => "TLS_RSA_WITH_AES_256_CBC_SHA",
        S::TLS_RSA_WITH_AES_128_CBC_SHA256 => "TLS_RSA_WITH_AES_128_CBC_SHA256",
        S::TLS_RSA_WITH_AES_128_CBC_SHA => "TLS_RSA_WITH_AES_128_CBC_SHA",
        _ => "UNKNOWN",
    }
}

/// Server-side suite selection.
///
/// Walks `offered` in the client's order and returns the first suite that is
/// enabled locally and usable with `version`. ECDHE suites are skipped unless
/// `ecdhe_usable` (a shared curve and the uncompressed point format were
/// negotiated).
pub fn negotiate_cipher_suite(
    offered: &[CipherSuite],
    enabled: &[CipherSuite],
    version: TlsVersion,
    ecdhe_usable: bool,
) -> Result<CipherSuiteParams, TlsError> {
    for suite in offered {
        if !enabled.contains(suite) {
            continue;
        }
        let Ok(params) = CipherSuiteParams::from_suite(*suite) else {
            continue;
        };
        if params.is_ecdhe() && !ecdhe_usable {
            continue;
        }
        if !params.supports_version(version) {
            continue;
        }
        return Ok(params);
    }
    Err(TlsError::handshake_failure("no shared cipher suite"))
}

//! RSA PKCS#1 v1.5 encryption and signatures.

use crate::hash::HashAlgorithm;
use ::rsa::pkcs8::DecodePublicKey;
use ::rsa::traits::PublicKeyParts;
use ::rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign};
use rand_core::OsRng;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use tlsengine_types::CryptoError;

/// The DigestInfo prefix selection for a PKCS#1 v1.5 signature.
///
/// `None` selects the legacy TLS 1.0/1.1 form: an unprefixed
/// `MD5(data) || SHA1(data)` block.
fn signature_scheme(hash: Option<HashAlgorithm>) -> Result<Pkcs1v15Sign, CryptoError> {
    Ok(match hash {
        None => Pkcs1v15Sign::new_unprefixed(),
        Some(HashAlgorithm::Sha1) => Pkcs1v15Sign::new::<Sha1>(),
        Some(HashAlgorithm::Sha256) => Pkcs1v15Sign::new::<Sha256>(),
        Some(HashAlgorithm::Sha384) => Pkcs1v15Sign::new::<Sha384>(),
        Some(HashAlgorithm::Sha512) => Pkcs1v15Sign::new::<Sha512>(),
        Some(HashAlgorithm::Md5) => return Err(CryptoError::NotSupported),
    })
}

fn signature_digest(hash: Option<HashAlgorithm>, data: &[u8]) -> Vec<u8> {
    match hash {
        Some(alg) => alg.digest(data),
        None => {
            let mut out = HashAlgorithm::Md5.digest(data);
            out.extend_from_slice(&HashAlgorithm::Sha1.digest(data));
            out
        }
    }
}

/// An RSA private key.
#[derive(Clone)]
pub struct RsaPrivateKey {
    inner: ::rsa::RsaPrivateKey,
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &(self.inner.size() * 8))
            .finish_non_exhaustive()
    }
}

impl From<::rsa::RsaPrivateKey> for RsaPrivateKey {
    fn from(inner: ::rsa::RsaPrivateKey) -> Self {
        Self { inner }
    }
}

impl RsaPrivateKey {
    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            inner: self.inner.to_public_key(),
        }
    }

    /// Modulus size in bytes.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// PKCS#1 v1.5 decryption.
    pub fn decrypt_pkcs1(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.inner
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|_| CryptoError::RsaDecryptFail)
    }

    /// Hash `data` and produce a PKCS#1 v1.5 signature over it.
    pub fn sign_pkcs1(
        &self,
        hash: Option<HashAlgorithm>,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let scheme = signature_scheme(hash)?;
        let digest = signature_digest(hash, data);
        self.inner
            .sign(scheme, &digest)
            .map_err(|_| CryptoError::RsaSignFail)
    }
}

/// An RSA public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    inner: ::rsa::RsaPublicKey,
}

impl RsaPublicKey {
    /// Parse a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, CryptoError> {
        ::rsa::RsaPublicKey::from_public_key_der(der)
            .map(|inner| Self { inner })
            .map_err(|_| CryptoError::InvalidKey)
    }

    /// Modulus size in bytes.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// PKCS#1 v1.5 encryption with OS randomness for the padding.
    pub fn encrypt_pkcs1(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.inner
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|_| CryptoError::RsaEncryptFail)
    }

    /// Verify a PKCS#1 v1.5 signature over `data`.
    pub fn verify_pkcs1(
        &self,
        hash: Option<HashAlgorithm>,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        let scheme = signature_scheme(hash)?;
        let digest = signature_digest(hash, data);
        self.inner
            .verify(scheme, &digest, signature)
            .map_err(|_| CryptoError::RsaVerifyFail)
    }
}

//! TLS AEAD cipher abstraction.

use super::{CipherSuiteParams, CipherType};
use tlsengine_crypto::cipher;
use tlsengine_types::TlsError;
use zeroize::Zeroize;

/// Trait for record-layer AEAD operations.
pub trait TlsAead: Send + Sync {
    /// Encrypt plaintext. Returns `ciphertext || tag`.
    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, TlsError>;

    /// Decrypt `ciphertext || tag`. Any failure is `bad_record_mac`.
    fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext_with_tag: &[u8],
    ) -> Result<Vec<u8>, TlsError>;

    /// Tag size in bytes.
    fn tag_size(&self) -> usize;
}

/// AES-GCM AEAD (128-bit or 256-bit key).
pub struct AesGcmAead {
    key: Vec<u8>,
}

impl AesGcmAead {
    pub fn new(key: &[u8]) -> Result<Self, TlsError> {
        if key.len() != 16 && key.len() != 32 {
            return Err(TlsError::internal_error("AES-GCM: invalid key length"));
        }
        Ok(Self { key: key.to_vec() })
    }
}

impl Drop for AesGcmAead {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl TlsAead for AesGcmAead {
    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, TlsError> {
        cipher::aes_gcm_encrypt(&self.key, nonce, aad, plaintext).map_err(TlsError::CryptoError)
    }

    fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext_with_tag: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        cipher::aes_gcm_decrypt(&self.key, nonce, aad, ciphertext_with_tag)
            .map_err(|_| TlsError::bad_record_mac("AEAD tag verification failed"))
    }

    fn tag_size(&self) -> usize {
        cipher::GCM_TAG_SIZE
    }
}

/// Create the AEAD for an AEAD cipher suite.
pub fn create_aead(params: &CipherSuiteParams, key: &[u8]) -> Result<Box<dyn TlsAead>, TlsError> {
    match params.cipher_type {
        CipherType::Aead => Ok(Box::new(AesGcmAead::new(key)?)),
        CipherType::Block => Err(TlsError::internal_error(format!(
            "{} is not an AEAD suite",
            params.name()
        ))),
    }
}

//! AES-GCM record protection (RFC 5246 §6.2.3.3, RFC 5288).
//!
//! Record body = explicit_nonce(8) || ciphertext || tag(16)
//! nonce = salt(4) || explicit_nonce(8), with the sequence number as the
//! explicit part.

use super::{ContentType, MAX_PLAINTEXT_LENGTH};
use crate::crypt::aead::{create_aead, TlsAead};
use crate::crypt::CipherSuiteParams;
use tlsengine_types::TlsError;
use zeroize::Zeroize;

/// Explicit nonce length carried in each record.
pub const EXPLICIT_NONCE_LEN: usize = 8;

/// `salt(4) || explicit_nonce(8)`.
pub fn build_nonce(fixed_iv: &[u8], explicit_nonce: &[u8; EXPLICIT_NONCE_LEN]) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..4].copy_from_slice(&fixed_iv[..4]);
    nonce[4..].copy_from_slice(explicit_nonce);
    nonce
}

/// `seq(8) || type(1) || version(2) || plaintext_length(2)`.
pub fn build_aad(seq: u64, content_type: ContentType, version: u16, plaintext_len: u16) -> [u8; 13] {
    let mut aad = [0u8; 13];
    aad[..8].copy_from_slice(&seq.to_be_bytes());
    aad[8] = content_type as u8;
    aad[9..11].copy_from_slice(&version.to_be_bytes());
    aad[11..].copy_from_slice(&plaintext_len.to_be_bytes());
    aad
}

/// AES-GCM codec for one direction.
pub struct AeadCodec {
    aead: Box<dyn TlsAead>,
    fixed_iv: Vec<u8>,
}

impl Drop for AeadCodec {
    fn drop(&mut self) {
        self.fixed_iv.zeroize();
    }
}

impl AeadCodec {
    pub fn new(params: &CipherSuiteParams, key: &[u8], fixed_iv: Vec<u8>) -> Result<Self, TlsError> {
        if fixed_iv.len() != params.fixed_iv_len {
            return Err(TlsError::internal_error("GCM salt has wrong length"));
        }
        Ok(Self {
            aead: create_aead(params, key)?,
            fixed_iv,
        })
    }

    pub fn seal(
        &self,
        seq: u64,
        content_type: ContentType,
        version: u16,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if plaintext.len() > MAX_PLAINTEXT_LENGTH {
            return Err(TlsError::internal_error("plaintext exceeds maximum fragment"));
        }
        let explicit = seq.to_be_bytes();
        let nonce = build_nonce(&self.fixed_iv, &explicit);
        let aad = build_aad(seq, content_type, version, plaintext.len() as u16);
        let sealed = self.aead.encrypt(&nonce, &aad, plaintext)?;

        let mut fragment = Vec::with_capacity(EXPLICIT_NONCE_LEN + sealed.len());
        fragment.extend_from_slice(&explicit);
        fragment.extend_from_slice(&sealed);
        Ok(fragment)
    }

    /// Decrypt a record body. Short bodies and tag failures are both
    /// `bad_record_mac`.
    pub fn open(
        &self,
        seq: u64,
        content_type: ContentType,
        version: u16,
        fragment: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let tag_len = self.aead.tag_size();
        if fragment.len() < EXPLICIT_NONCE_LEN + tag_len {
            return Err(TlsError::bad_record_mac("GCM record too short"));
        }
        let (explicit, sealed) = fragment.split_at(EXPLICIT_NONCE_LEN);
        let mut explicit_nonce = [0u8; EXPLICIT_NONCE_LEN];
        explicit_nonce.copy_from_slice(explicit);

        let plaintext_len = sealed.len() - tag_len;
        if plaintext_len > MAX_PLAINTEXT_LENGTH {
            return Err(TlsError::record_overflow("GCM fragment too large"));
        }
        let nonce = build_nonce(&self.fixed_iv, &explicit_nonce);
        let aad = build_aad(seq, content_type, version, plaintext_len as u16);
        self.aead.decrypt(&nonce, &aad, sealed)
    }
}

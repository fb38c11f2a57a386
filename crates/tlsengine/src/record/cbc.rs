//! CBC MAC-then-encrypt record protection (RFC 4346/5246 §6.2.3.2).
//!
//! Record body = explicit_IV(16) || AES-CBC(plaintext || MAC || padding)
//! MAC = HMAC(mac_key, seq(8) || type(1) || version(2) || length(2) || plaintext)
//! Every padding byte, including the final length byte, equals the pad length.

use super::{ContentType, MAX_PLAINTEXT_LENGTH};
use subtle::ConstantTimeEq;
use tlsengine_crypto::cipher::{self, AES_BLOCK_SIZE};
use tlsengine_crypto::random::fill_random;
use tlsengine_crypto::HashAlgorithm;
use tlsengine_types::TlsError;
use zeroize::Zeroize;

/// HMAC over the pseudo-header and the plaintext.
pub fn compute_cbc_mac(
    hash: HashAlgorithm,
    mac_key: &[u8],
    seq: u64,
    content_type: ContentType,
    version: u16,
    plaintext: &[u8],
) -> Result<Vec<u8>, TlsError> {
    hash.hmac_parts(
        mac_key,
        &[
            &seq.to_be_bytes(),
            &[content_type as u8],
            &version.to_be_bytes(),
            &(plaintext.len() as u16).to_be_bytes(),
            plaintext,
        ],
    )
    .map_err(TlsError::CryptoError)
}

/// TLS padding for `data_len` bytes of plaintext plus MAC.
///
/// padding_length = (16 - ((data_len + 1) % 16)) % 16, written
/// padding_length + 1 times.
pub fn build_tls_padding(data_len: usize) -> Vec<u8> {
    let padding_length = (AES_BLOCK_SIZE - ((data_len + 1) % AES_BLOCK_SIZE)) % AES_BLOCK_SIZE;
    vec![padding_length as u8; padding_length + 1]
}

/// AES-CBC + HMAC codec for one direction.
pub struct CbcCodec {
    enc_key: Vec<u8>,
    mac_key: Vec<u8>,
    mac_hash: HashAlgorithm,
}

impl Drop for CbcCodec {
    fn drop(&mut self) {
        self.enc_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl CbcCodec {
    pub fn new(enc_key: Vec<u8>, mac_key: Vec<u8>, mac_hash: HashAlgorithm) -> Self {
        Self {
            enc_key,
            mac_key,
            mac_hash,
        }
    }

    fn mac_len(&self) -> usize {
        self.mac_hash.output_size()
    }

    /// MAC, pad and encrypt under a fresh random IV.
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
        let mac = compute_cbc_mac(
            self.mac_hash,
            &self.mac_key,
            seq,
            content_type,
            version,
            plaintext,
        )?;

        let data_len = plaintext.len() + mac.len();
        let padding = build_tls_padding(data_len);
        let mut data = Vec::with_capacity(data_len + padding.len());
        data.extend_from_slice(plaintext);
        data.extend_from_slice(&mac);
        data.extend_from_slice(&padding);

        let mut iv = [0u8; AES_BLOCK_SIZE];
        fill_random(&mut iv)?;
        let encrypted = cipher::aes_cbc_encrypt(&self.enc_key, &iv, &data)?;
        data.zeroize();

        let mut fragment = Vec::with_capacity(AES_BLOCK_SIZE + encrypted.len());
        fragment.extend_from_slice(&iv);
        fragment.extend_from_slice(&encrypted);
        Ok(fragment)
    }

    /// Decrypt and authenticate a record body.
    ///
    /// Padding and MAC are checked in constant time and every failure is
    /// reported as the same `bad_record_mac`.
    pub fn open(
        &self,
        seq: u64,
        content_type: ContentType,
        version: u16,
        fragment: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let mac_len = self.mac_len();
        let min_encrypted_len = (mac_len + 1).div_ceil(AES_BLOCK_SIZE) * AES_BLOCK_SIZE;
        if fragment.len() < AES_BLOCK_SIZE + min_encrypted_len
            || fragment.len() % AES_BLOCK_SIZE != 0
        {
            return Err(TlsError::bad_record_mac("malformed CBC record"));
        }

        let (iv, encrypted) = fragment.split_at(AES_BLOCK_SIZE);
        let mut decrypted = cipher::aes_cbc_decrypt(&self.enc_key, iv, encrypted)
            .map_err(|_| TlsError::bad_record_mac("CBC decryption failed"))?;

        let padding_length = decrypted[decrypted.len() - 1] as usize;
        let total_overhead = padding_length + 1 + mac_len;
        let good_length = u8::from(total_overhead <= decrypted.len());

        let pad_start = decrypted.len().saturating_sub(padding_length + 1);
        let mut pad_ok = good_length;
        for &b in &decrypted[pad_start..] {
            pad_ok &= b.ct_eq(&(padding_length as u8)).unwrap_u8();
        }

        let content_len = if good_length == 1 {
            decrypted.len() - total_overhead
        } else {
            0
        };

        // Always run the MAC so a bad pad costs the same as a bad MAC.
        let expected_mac = compute_cbc_mac(
            self.mac_hash,
            &self.mac_key,
            seq,
            content_type,
            version,
            &decrypted[..content_len],
        )?;
        let mac_slice = if good_length == 1 {
            &decrypted[content_len..content_len + mac_len]
        } else {
            &decrypted[..mac_len]
        };
        let mac_ok = mac_slice.ct_eq(expected_mac.as_slice()).unwrap_u8();

        if pad_ok & mac_ok != 1 {
            decrypted.zeroize();
            return Err(TlsError::bad_record_mac("CBC record authentication failed"));
        }

        decrypted.truncate(content_len);
        if decrypted.len() > MAX_PLAINTEXT_LENGTH {
            return Err(TlsError::record_overflow("decrypted fragment too large"));
        }
        Ok(decrypted)
    }
}

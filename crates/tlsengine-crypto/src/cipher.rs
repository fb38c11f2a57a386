//! AES-CBC (no padding, caller-supplied IV) and AES-GCM.
//!
//! Record padding, explicit IVs and nonce construction belong to the record
//! layer; these functions only run the raw modes.

use aes::{Aes128, Aes256};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tlsengine_types::CryptoError;

/// AES block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;
/// GCM authentication tag size in bytes.
pub const GCM_TAG_SIZE: usize = 16;
/// GCM nonce size in bytes.
pub const GCM_NONCE_SIZE: usize = 12;

fn check_cbc_args(key: &[u8], iv: &[u8], data: &[u8]) -> Result<(), CryptoError> {
    if key.len() != 16 && key.len() != 32 {
        return Err(CryptoError::InvalidKeyLength {
            expected: 16,
            got: key.len(),
        });
    }
    if iv.len() != AES_BLOCK_SIZE {
        return Err(CryptoError::InvalidIvLength);
    }
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidBlockLength);
    }
    Ok(())
}

/// AES-CBC encrypt a block-aligned buffer.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_cbc_args(key, iv, plaintext)?;
    let mut buf = plaintext.to_vec();
    let len = buf.len();
    let result = if key.len() == 16 {
        cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKey)?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ())
    } else {
        cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKey)?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ())
    };
    result.map_err(|_| CryptoError::InvalidBlockLength)?;
    Ok(buf)
}

/// AES-CBC decrypt a block-aligned buffer. Padding is left in place.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_cbc_args(key, iv, ciphertext)?;
    let mut buf = ciphertext.to_vec();
    let result = if key.len() == 16 {
        cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKey)?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ())
    } else {
        cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKey)?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ())
    };
    result.map_err(|_| CryptoError::InvalidBlockLength)?;
    Ok(buf)
}

/// AES-GCM seal. Returns `ciphertext || tag`.
pub fn aes_gcm_encrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != GCM_NONCE_SIZE {
        return Err(CryptoError::InvalidIvLength);
    }
    let nonce = Nonce::from_slice(nonce);
    let payload = Payload {
        msg: plaintext,
        aad,
    };
    let sealed = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKey)?
            .encrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKey)?
            .encrypt(nonce, payload),
        n => {
            return Err(CryptoError::InvalidKeyLength {
                expected: 16,
                got: n,
            })
        }
    };
    sealed.map_err(|_| CryptoError::InvalidArg)
}

/// AES-GCM open of `ciphertext || tag`.
pub fn aes_gcm_decrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != GCM_NONCE_SIZE {
        return Err(CryptoError::InvalidIvLength);
    }
    if ciphertext.len() < GCM_TAG_SIZE {
        return Err(CryptoError::AeadTagVerifyFail);
    }
    let nonce = Nonce::from_slice(nonce);
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    let opened = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKey)?
            .decrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKey)?
            .decrypt(nonce, payload),
        n => {
            return Err(CryptoError::InvalidKeyLength {
                expected: 16,
                got: n,
            })
        }
    };
    opened.map_err(|_| CryptoError::AeadTagVerifyFail)
}

//! TLS 1.1 and TLS 1.2 PRF (RFC 4346 §5, RFC 5246 §5).
//!
//! ```text
//! TLS 1.2: PRF(secret, label, seed) = P_<hash>(secret, label + seed)
//! TLS 1.1: PRF(secret, label, seed) = P_MD5(S1, label + seed) XOR
//!                                     P_SHA-1(S2, label + seed)
//!
//! P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) ||
//!                         HMAC_hash(secret, A(2) + seed) || ...
//! A(0) = seed
//! A(i) = HMAC_hash(secret, A(i-1))
//! ```

use tlsengine_crypto::HashAlgorithm;
use tlsengine_types::TlsError;

/// Which PRF construction to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrfAlgorithm {
    /// TLS 1.1 MD5/SHA-1 split construction.
    Tls11,
    /// TLS 1.2 P_hash with the suite's PRF hash.
    Tls12(HashAlgorithm),
}

/// Derive `output_len` bytes from `secret`, `label`, and `seed`.
pub fn prf(
    alg: PrfAlgorithm,
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, TlsError> {
    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label.as_bytes());
    label_seed.extend_from_slice(seed);

    match alg {
        PrfAlgorithm::Tls12(hash) => p_hash(hash, secret, &label_seed, output_len),
        PrfAlgorithm::Tls11 => {
            // S1 and S2 share the middle byte when the secret length is odd.
            let half = secret.len().div_ceil(2);
            let s1 = &secret[..half];
            let s2 = &secret[secret.len() - half..];
            let mut out = p_hash(HashAlgorithm::Md5, s1, &label_seed, output_len)?;
            let sha = p_hash(HashAlgorithm::Sha1, s2, &label_seed, output_len)?;
            for (o, s) in out.iter_mut().zip(sha.iter()) {
                *o ^= s;
            }
            Ok(out)
        }
    }
}

/// P_hash expansion function.
pub fn p_hash(
    hash: HashAlgorithm,
    secret: &[u8],
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, TlsError> {
    let mut result = Vec::with_capacity(output_len + hash.output_size());
    let mut a = seed.to_vec();

    while result.len() < output_len {
        a = hash.hmac(secret, &a)?;
        let block = hash.hmac_parts(secret, &[&a, seed])?;
        result.extend_from_slice(&block);
    }

    result.truncate(output_len);
    Ok(result)
}

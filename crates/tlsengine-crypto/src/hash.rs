//! Message digests and HMAC by algorithm identifier.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tlsengine_types::CryptoError;

/// Hash algorithms reachable from the TLS 1.1/1.2 cipher suites and
/// signature schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

macro_rules! hmac_parts {
    ($digest:ty, $key:expr, $parts:expr) => {{
        let mut mac =
            <Hmac<$digest> as Mac>::new_from_slice($key).map_err(|_| CryptoError::InvalidKey)?;
        for part in $parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().to_vec()
    }};
}

fn digest_parts_with<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        self.digest_parts(&[data])
    }

    /// Digest of the concatenation of `parts`, without building it.
    pub fn digest_parts(self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            HashAlgorithm::Md5 => digest_parts_with::<Md5>(parts),
            HashAlgorithm::Sha1 => digest_parts_with::<Sha1>(parts),
            HashAlgorithm::Sha256 => digest_parts_with::<Sha256>(parts),
            HashAlgorithm::Sha384 => digest_parts_with::<Sha384>(parts),
            HashAlgorithm::Sha512 => digest_parts_with::<Sha512>(parts),
        }
    }

    pub fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.hmac_parts(key, &[data])
    }

    /// HMAC over the concatenation of `parts`.
    pub fn hmac_parts(self, key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, CryptoError> {
        Ok(match self {
            HashAlgorithm::Md5 => hmac_parts!(Md5, key, parts),
            HashAlgorithm::Sha1 => hmac_parts!(Sha1, key, parts),
            HashAlgorithm::Sha256 => hmac_parts!(Sha256, key, parts),
            HashAlgorithm::Sha384 => hmac_parts!(Sha384, key, parts),
            HashAlgorithm::Sha512 => hmac_parts!(Sha512, key, parts),
        })
    }
}

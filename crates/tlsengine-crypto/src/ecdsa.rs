//! ECDSA signing over P-256 and P-384 with DER-encoded signatures.

use crate::ecdh::EllipticCurve;
use p256::ecdsa::signature::{Signer, Verifier};
use rand_core::OsRng;
use tlsengine_types::CryptoError;

/// An ECDSA signing key.
#[derive(Clone)]
pub enum EcdsaSigningKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

impl std::fmt::Debug for EcdsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaSigningKey")
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

impl EcdsaSigningKey {
    pub fn generate(curve: EllipticCurve) -> Self {
        match curve {
            EllipticCurve::P256 => Self::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
            EllipticCurve::P384 => Self::P384(p384::ecdsa::SigningKey::random(&mut OsRng)),
        }
    }

    /// Load a key from its big-endian private scalar.
    pub fn from_scalar(curve: EllipticCurve, scalar: &[u8]) -> Result<Self, CryptoError> {
        match curve {
            EllipticCurve::P256 => p256::ecdsa::SigningKey::from_slice(scalar)
                .map(Self::P256)
                .map_err(|_| CryptoError::EccInvalidPrivateKey),
            EllipticCurve::P384 => p384::ecdsa::SigningKey::from_slice(scalar)
                .map(Self::P384)
                .map_err(|_| CryptoError::EccInvalidPrivateKey),
        }
    }

    pub fn curve(&self) -> EllipticCurve {
        match self {
            Self::P256(_) => EllipticCurve::P256,
            Self::P384(_) => EllipticCurve::P384,
        }
    }

    /// Uncompressed SEC1 encoding of the verifying key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            Self::P256(key) => key.verifying_key().to_encoded_point(false).as_bytes().to_vec(),
            Self::P384(key) => key.verifying_key().to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Sign `data` (hashed with the curve's matching SHA-2) and DER-encode.
    pub fn sign_der(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::P256(key) => {
                let sig: p256::ecdsa::Signature = key.sign(data);
                sig.to_der().as_bytes().to_vec()
            }
            Self::P384(key) => {
                let sig: p384::ecdsa::Signature = key.sign(data);
                sig.to_der().as_bytes().to_vec()
            }
        }
    }
}

/// Verify a DER-encoded ECDSA signature against a SEC1 public key.
pub fn verify_der(
    curve: EllipticCurve,
    public_key: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    match curve {
        EllipticCurve::P256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                .map_err(|_| CryptoError::EccInvalidPublicKey)?;
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| CryptoError::DecodeAsn1Fail)?;
            key.verify(data, &sig).map_err(|_| CryptoError::InvalidArg)
        }
        EllipticCurve::P384 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                .map_err(|_| CryptoError::EccInvalidPublicKey)?;
            let sig = p384::ecdsa::Signature::from_der(signature)
                .map_err(|_| CryptoError::DecodeAsn1Fail)?;
            key.verify(data, &sig).map_err(|_| CryptoError::InvalidArg)
        }
    }
}

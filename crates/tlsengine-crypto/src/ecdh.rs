//! Ephemeral ECDH over the NIST P-256 and P-384 curves.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use tlsengine_types::CryptoError;
use zeroize::Zeroizing;

/// Curves supported for ephemeral key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EllipticCurve {
    P256,
    P384,
}

impl EllipticCurve {
    /// Length of an uncompressed SEC1 point (`0x04 || X || Y`).
    pub fn point_len(self) -> usize {
        match self {
            EllipticCurve::P256 => 65,
            EllipticCurve::P384 => 97,
        }
    }

    /// Length of the shared secret (the X coordinate).
    pub fn field_len(self) -> usize {
        match self {
            EllipticCurve::P256 => 32,
            EllipticCurve::P384 => 48,
        }
    }
}

enum EcdhSecret {
    P256(p256::ecdh::EphemeralSecret),
    P384(p384::ecdh::EphemeralSecret),
}

/// An ephemeral ECDH key pair.
pub struct EcdhKeyPair {
    curve: EllipticCurve,
    secret: EcdhSecret,
    public_key: Vec<u8>,
}

impl std::fmt::Debug for EcdhKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdhKeyPair")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

impl EcdhKeyPair {
    /// Generate a fresh key pair on `curve`.
    pub fn generate(curve: EllipticCurve) -> Result<Self, CryptoError> {
        let (secret, public_key) = match curve {
            EllipticCurve::P256 => {
                let secret = p256::ecdh::EphemeralSecret::random(&mut OsRng);
                let public = secret.public_key().to_encoded_point(false);
                (EcdhSecret::P256(secret), public.as_bytes().to_vec())
            }
            EllipticCurve::P384 => {
                let secret = p384::ecdh::EphemeralSecret::random(&mut OsRng);
                let public = secret.public_key().to_encoded_point(false);
                (EcdhSecret::P384(secret), public.as_bytes().to_vec())
            }
        };
        Ok(Self {
            curve,
            secret,
            public_key,
        })
    }

    pub fn curve(&self) -> EllipticCurve {
        self.curve
    }

    /// Uncompressed SEC1 encoding of the public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// ECDH with the peer's SEC1-encoded point; returns the X coordinate.
    pub fn compute_shared_secret(&self, peer_point: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let shared = match &self.secret {
            EcdhSecret::P256(secret) => {
                let peer = p256::PublicKey::from_sec1_bytes(peer_point)
                    .map_err(|_| CryptoError::EccInvalidPublicKey)?;
                secret.diffie_hellman(&peer).raw_secret_bytes().to_vec()
            }
            EcdhSecret::P384(secret) => {
                let peer = p384::PublicKey::from_sec1_bytes(peer_point)
                    .map_err(|_| CryptoError::EccInvalidPublicKey)?;
                secret.diffie_hellman(&peer).raw_secret_bytes().to_vec()
            }
        };
        Ok(Zeroizing::new(shared))
    }
}

//! Ephemeral ECDH key exchange over the named curves.

use crate::crypt::NamedGroup;
use tlsengine_crypto::EcdhKeyPair;
use tlsengine_types::TlsError;
use zeroize::Zeroizing;

/// Ephemeral key pair for one handshake.
pub struct KeyExchange {
    group: NamedGroup,
    key_pair: EcdhKeyPair,
}

impl KeyExchange {
    /// Generate a fresh key pair on `group`'s curve.
    pub fn generate(group: NamedGroup) -> Result<Self, TlsError> {
        let curve = group.curve().ok_or_else(|| {
            TlsError::handshake_failure(format!("unsupported named group {:#06x}", group.0))
        })?;
        let key_pair = EcdhKeyPair::generate(curve)?;
        Ok(Self { group, key_pair })
    }

    pub fn group(&self) -> NamedGroup {
        self.group
    }

    /// Uncompressed public point.
    pub fn public_key_bytes(&self) -> &[u8] {
        self.key_pair.public_key_bytes()
    }

    /// ECDH shared x-coordinate, used directly as the premaster secret.
    ///
    /// An invalid peer point is `illegal_parameter`.
    pub fn compute_shared_secret(&self, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, TlsError> {
        self.key_pair
            .compute_shared_secret(peer_public)
            .map_err(|e| TlsError::illegal_parameter(format!("ECDH: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdh_agreement_both_curves() {
        for (group, point_len) in [(NamedGroup::SECP256R1, 65), (NamedGroup::SECP384R1, 97)] {
            let a = KeyExchange::generate(group).unwrap();
            let b = KeyExchange::generate(group).unwrap();
            assert_eq!(a.group(), group);
            assert_eq!(a.public_key_bytes().len(), point_len);
            assert_eq!(a.public_key_bytes()[0], 0x04);
            let s1 = a.compute_shared_secret(b.public_key_bytes()).unwrap();
            let s2 = b.compute_shared_secret(a.public_key_bytes()).unwrap();
            assert_eq!(*s1, *s2);
            assert_eq!(s1.len(), (point_len - 1) / 2);
        }
    }

    #[test]
    fn test_unsupported_group() {
        assert!(KeyExchange::generate(NamedGroup(0x001D)).is_err());
    }

    #[test]
    fn test_invalid_peer_point() {
        let a = KeyExchange::generate(NamedGroup::SECP256R1).unwrap();
        let err = a.compute_shared_secret(&[4u8; 65]).unwrap_err();
        assert_eq!(
            err.description(),
            Some(tlsengine_types::AlertDescription::IllegalParameter)
        );
    }
}

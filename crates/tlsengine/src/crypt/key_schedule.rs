//! Master secret, key block and Finished derivation (RFC 5246 §6.3, §7.4.9, §8.1).

use super::prf::{prf, PrfAlgorithm};
use super::CipherSuiteParams;
use tlsengine_types::TlsError;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of the master secret.
pub const MASTER_SECRET_LEN: usize = 48;
/// Length of Finished `verify_data`.
pub const VERIFY_DATA_LEN: usize = 12;

pub const CLIENT_FINISHED_LABEL: &str = "client finished";
pub const SERVER_FINISHED_LABEL: &str = "server finished";

/// Write keys for one direction.
///
/// `mac_key` is empty for AEAD suites; `iv` is the 4-byte GCM salt or the
/// (unused by TLS 1.1+) 16-byte CBC IV.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct TrafficKeys {
    pub mac_key: Vec<u8>,
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl std::fmt::Debug for TrafficKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficKeys")
            .field("mac_key_len", &self.mac_key.len())
            .field("key_len", &self.key.len())
            .field("iv_len", &self.iv.len())
            .finish()
    }
}

/// The key block split into the client and server write directions.
#[derive(Debug)]
pub struct KeyBlock {
    pub client: TrafficKeys,
    pub server: TrafficKeys,
}

/// `master_secret = PRF(pre_master_secret, "master secret", client_random + server_random)[0..48]`
pub fn derive_master_secret(
    alg: PrfAlgorithm,
    pre_master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<Zeroizing<Vec<u8>>, TlsError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);
    prf(
        alg,
        pre_master_secret,
        "master secret",
        &seed,
        MASTER_SECRET_LEN,
    )
    .map(Zeroizing::new)
}

/// Expand the master secret into the key block.
///
/// The seed is `server_random + client_random` (reversed from the master
/// secret derivation) and the block is sliced in order: client MAC, server
/// MAC, client key, server key, client IV, server IV.
pub fn derive_key_block(
    alg: PrfAlgorithm,
    master_secret: &[u8],
    server_random: &[u8; 32],
    client_random: &[u8; 32],
    params: &CipherSuiteParams,
) -> Result<KeyBlock, TlsError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let block = Zeroizing::new(prf(
        alg,
        master_secret,
        "key expansion",
        &seed,
        params.key_block_len(),
    )?);

    let mut rest: &[u8] = &block;
    let mut take = |n: usize| {
        let (head, tail) = rest.split_at(n);
        rest = tail;
        head.to_vec()
    };
    let client_mac = take(params.mac_len);
    let server_mac = take(params.mac_len);
    let client_key = take(params.key_len);
    let server_key = take(params.key_len);
    let client_iv = take(params.fixed_iv_len);
    let server_iv = take(params.fixed_iv_len);

    Ok(KeyBlock {
        client: TrafficKeys {
            mac_key: client_mac,
            key: client_key,
            iv: client_iv,
        },
        server: TrafficKeys {
            mac_key: server_mac,
            key: server_key,
            iv: server_iv,
        },
    })
}

/// `verify_data = PRF(master_secret, label, handshake_hash)[0..12]`
pub fn compute_verify_data(
    alg: PrfAlgorithm,
    master_secret: &[u8],
    label: &str,
    handshake_hash: &[u8],
) -> Result<Vec<u8>, TlsError> {
    prf(alg, master_secret, label, handshake_hash, VERIFY_DATA_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CipherSuite;
    use tlsengine_crypto::HashAlgorithm;

    const SHA256: PrfAlgorithm = PrfAlgorithm::Tls12(HashAlgorithm::Sha256);

    #[test]
    fn test_master_secret_length_and_randoms_order() {
        let pms = [0x03u8; 48];
        let cr = [1u8; 32];
        let sr = [2u8; 32];
        let ms = derive_master_secret(SHA256, &pms, &cr, &sr).unwrap();
        assert_eq!(ms.len(), MASTER_SECRET_LEN);
        let swapped = derive_master_secret(SHA256, &pms, &sr, &cr).unwrap();
        assert_ne!(*ms, *swapped);
    }

    #[test]
    fn test_key_block_slices_in_order() {
        let params =
            CipherSuiteParams::from_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA).unwrap();
        let ms = [0x42u8; 48];
        let sr = [3u8; 32];
        let cr = [4u8; 32];
        let kb = derive_key_block(SHA256, &ms, &sr, &cr, &params).unwrap();

        let mut seed = sr.to_vec();
        seed.extend_from_slice(&cr);
        let raw = prf(SHA256, &ms, "key expansion", &seed, params.key_block_len()).unwrap();
        assert_eq!(kb.client.mac_key, raw[0..20]);
        assert_eq!(kb.server.mac_key, raw[20..40]);
        assert_eq!(kb.client.key, raw[40..56]);
        assert_eq!(kb.server.key, raw[56..72]);
        assert_eq!(kb.client.iv, raw[72..88]);
        assert_eq!(kb.server.iv, raw[88..104]);
    }

    #[test]
    fn test_key_block_gcm_has_no_mac() {
        let params =
            CipherSuiteParams::from_suite(CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384)
                .unwrap();
        let kb = derive_key_block(
            PrfAlgorithm::Tls12(HashAlgorithm::Sha384),
            &[7u8; 48],
            &[0u8; 32],
            &[1u8; 32],
            &params,
        )
        .unwrap();
        assert!(kb.client.mac_key.is_empty());
        assert_eq!(kb.client.key.len(), 32);
        assert_eq!(kb.server.iv.len(), 4);
        assert_ne!(kb.client.key, kb.server.key);
    }

    #[test]
    fn test_verify_data_labels_differ() {
        let hash = [0x55u8; 36];
        let c = compute_verify_data(PrfAlgorithm::Tls11, &[9u8; 48], CLIENT_FINISHED_LABEL, &hash)
            .unwrap();
        let s = compute_verify_data(PrfAlgorithm::Tls11, &[9u8; 48], SERVER_FINISHED_LABEL, &hash)
            .unwrap();
        assert_eq!(c.len(), VERIFY_DATA_LEN);
        assert_ne!(c, s);
    }
}

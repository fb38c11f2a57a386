//! Handshake transcript for Finished verification.
//!
//! The PRF hash is unknown until the ServerHello fixes the suite and version,
//! so the raw messages are buffered and hashed on demand.

use super::prf::PrfAlgorithm;
use tlsengine_crypto::HashAlgorithm;

/// Ordered concatenation of the handshake messages seen so far.
#[derive(Debug, Default, Clone)]
pub struct TranscriptHash {
    message_buffer: Vec<u8>,
}

impl TranscriptHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a complete handshake message (header included).
    pub fn update(&mut self, data: &[u8]) {
        self.message_buffer.extend_from_slice(data);
    }

    /// Hash of the transcript for the given PRF.
    ///
    /// TLS 1.1 uses `MD5(messages) || SHA1(messages)`; TLS 1.2 uses the
    /// suite's PRF hash.
    pub fn current_hash(&self, alg: PrfAlgorithm) -> Vec<u8> {
        match alg {
            PrfAlgorithm::Tls11 => {
                let mut out = HashAlgorithm::Md5.digest(&self.message_buffer);
                out.extend_from_slice(&HashAlgorithm::Sha1.digest(&self.message_buffer));
                out
            }
            PrfAlgorithm::Tls12(hash) => hash.digest(&self.message_buffer),
        }
    }

    /// Raw transcript bytes.
    pub fn messages(&self) -> &[u8] {
        &self.message_buffer
    }

    pub fn len(&self) -> usize {
        self.message_buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message_buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_hash_lengths() {
        let mut t = TranscriptHash::new();
        assert!(t.is_empty());
        t.update(b"\x01\x00\x00\x01a");
        t.update(b"\x02\x00\x00\x01b");
        assert_eq!(t.len(), 10);
        assert_eq!(t.current_hash(PrfAlgorithm::Tls11).len(), 36);
        assert_eq!(
            t.current_hash(PrfAlgorithm::Tls12(HashAlgorithm::Sha384)).len(),
            48
        );
    }

    #[test]
    fn test_transcript_is_concatenation() {
        let mut t = TranscriptHash::new();
        t.update(b"hello ");
        t.update(b"world");
        let alg = PrfAlgorithm::Tls12(HashAlgorithm::Sha256);
        assert_eq!(t.current_hash(alg), HashAlgorithm::Sha256.digest(b"hello world"));
        // Hashing does not consume the transcript
        t.update(b"!");
        assert_eq!(t.current_hash(alg), HashAlgorithm::Sha256.digest(b"hello world!"));
        assert_eq!(t.messages(), b"hello world!");
    }

    #[test]
    fn test_tls11_hash_is_md5_sha1() {
        let mut t = TranscriptHash::new();
        t.update(b"abc");
        let h = t.current_hash(PrfAlgorithm::Tls11);
        assert_eq!(&h[..16], &HashAlgorithm::Md5.digest(b"abc")[..]);
        assert_eq!(&h[16..], &HashAlgorithm::Sha1.digest(b"abc")[..]);
    }
}

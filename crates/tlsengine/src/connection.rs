//! Per-direction connection state and the client/server pair.

use crate::crypt::key_schedule::TrafficKeys;
use crate::crypt::CipherSuiteParams;
use crate::record::{
    ContentType, Record, RecordBuffer, RecordCodec, MAX_PLAINTEXT_LENGTH, RECORD_HEADER_LEN,
};
use crate::TlsRole;
use log::trace;
use tlsengine_types::TlsError;

/// State for one direction of traffic.
///
/// The client slot holds what the client writes (and the server reads), and
/// vice versa.
#[derive(Debug)]
pub struct ConnectionState {
    random: [u8; 32],
    keys: TrafficKeys,
    seq: u64,
    codec: RecordCodec,
    pending: Option<(CipherSuiteParams, TrafficKeys)>,
    cipher_changed: bool,
    fragments: RecordBuffer,
}

impl ConnectionState {
    pub fn new(random: [u8; 32]) -> Self {
        Self {
            random,
            keys: TrafficKeys::default(),
            seq: 0,
            codec: RecordCodec::Plaintext,
            pending: None,
            cipher_changed: false,
            fragments: RecordBuffer::default(),
        }
    }

    pub fn random(&self) -> &[u8; 32] {
        &self.random
    }

    pub fn set_random(&mut self, random: [u8; 32]) {
        self.random = random;
    }

    /// Sequence number of the next protected record.
    pub fn sequence_number(&self) -> u64 {
        self.seq
    }

    pub fn cipher_changed(&self) -> bool {
        self.cipher_changed
    }

    /// Active write keys (empty until the cipher changes).
    pub fn keys(&self) -> &TrafficKeys {
        &self.keys
    }

    pub fn has_pending_keys(&self) -> bool {
        self.pending.is_some()
    }

    /// Stage keys to be activated by the next ChangeCipherSpec.
    pub fn install_pending(&mut self, params: CipherSuiteParams, keys: TrafficKeys) {
        self.pending = Some((params, keys));
    }

    /// Switch to the pending keys and restart the sequence number.
    pub fn change_cipher(&mut self) -> Result<(), TlsError> {
        let (params, keys) = self
            .pending
            .take()
            .ok_or_else(|| TlsError::unexpected_message("ChangeCipherSpec before key exchange"))?;
        self.codec = RecordCodec::new(&params, &keys)?;
        self.keys = keys;
        self.seq = 0;
        self.cipher_changed = true;
        trace!("cipher changed to {}", params.name());
        Ok(())
    }

    /// Frame `payload` as one or more records of at most 2^14 bytes each.
    ///
    /// An empty payload still produces one empty record.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        version: u16,
        payload: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let mut out = Vec::with_capacity(payload.len() + RECORD_HEADER_LEN);
        let mut chunks: Vec<&[u8]> = payload.chunks(MAX_PLAINTEXT_LENGTH).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        for chunk in chunks {
            let body = self.codec.protect(self.seq, content_type, version, chunk)?;
            if self.codec.is_protected() {
                self.seq = self.seq.wrapping_add(1);
            }
            trace!(
                "seal {:?} record: {} bytes plaintext, {} on the wire",
                content_type,
                chunk.len(),
                body.len()
            );
            out.extend_from_slice(&Record::new(content_type, version, body).encode());
        }
        Ok(out)
    }

    /// Append inbound bytes to the reassembly buffer.
    pub fn push_inbound(&mut self, data: &[u8]) {
        self.fragments.push(data);
    }

    /// Decode the next complete record under the current codec.
    ///
    /// The declared length is checked before any cipher work. Records are
    /// returned one at a time because a ChangeCipherSpec switches the codec
    /// for everything behind it.
    pub fn next_record(&mut self) -> Result<Option<Record>, TlsError> {
        let Some(mut record) = self.fragments.next_record(self.codec.max_record_len())? else {
            return Ok(None);
        };
        let plaintext =
            self.codec
                .unprotect(self.seq, record.content_type, record.version, record.payload())?;
        if self.codec.is_protected() {
            self.seq = self.seq.wrapping_add(1);
        }
        trace!(
            "open {:?} record: {} bytes plaintext",
            record.content_type,
            plaintext.len()
        );
        record.set_payload(plaintext);
        Ok(Some(record))
    }

    /// Feed `data` and decode every complete record.
    ///
    /// Only valid while no ChangeCipherSpec can appear mid-batch.
    pub fn read_records(&mut self, data: &[u8]) -> Result<Vec<Record>, TlsError> {
        self.push_inbound(data);
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Bytes buffered towards an incomplete record.
    pub fn buffered(&self) -> usize {
        self.fragments.pending()
    }
}

/// The client-write and server-write states plus the local role.
#[derive(Debug)]
pub struct Duplex {
    role: TlsRole,
    pub client: ConnectionState,
    pub server: ConnectionState,
}

impl Duplex {
    pub fn new(role: TlsRole, client_random: [u8; 32], server_random: [u8; 32]) -> Self {
        Self {
            role,
            client: ConnectionState::new(client_random),
            server: ConnectionState::new(server_random),
        }
    }

    pub fn role(&self) -> TlsRole {
        self.role
    }

    /// The direction this endpoint writes.
    pub fn local(&self) -> &ConnectionState {
        match self.role {
            TlsRole::Client => &self.client,
            TlsRole::Server => &self.server,
        }
    }

    /// The direction this endpoint reads.
    pub fn remote(&self) -> &ConnectionState {
        match self.role {
            TlsRole::Client => &self.server,
            TlsRole::Server => &self.client,
        }
    }

    pub fn local_mut(&mut self) -> &mut ConnectionState {
        match self.role {
            TlsRole::Client => &mut self.client,
            TlsRole::Server => &mut self.server,
        }
    }

    pub fn remote_mut(&mut self) -> &mut ConnectionState {
        match self.role {
            TlsRole::Client => &mut self.server,
            TlsRole::Server => &mut self.client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CipherSuite;
    use tlsengine_types::AlertDescription;

    fn keys(params: &CipherSuiteParams) -> TrafficKeys {
        TrafficKeys {
            mac_key: vec![0x5A; params.mac_len],
            key: vec![0xA5; params.key_len],
            iv: vec![0x11; params.fixed_iv_len],
        }
    }

    fn protected_pair(suite: CipherSuite) -> (ConnectionState, ConnectionState) {
        let params = CipherSuiteParams::from_suite(suite).unwrap();
        let mut writer = ConnectionState::new([1; 32]);
        let mut reader = ConnectionState::new([1; 32]);
        writer.install_pending(params.clone(), keys(&params));
        reader.install_pending(params.clone(), keys(&params));
        writer.change_cipher().unwrap();
        reader.change_cipher().unwrap();
        (writer, reader)
    }

    #[test]
    fn test_duplex_directions() {
        let mut d = Duplex::new(TlsRole::Client, [1; 32], [2; 32]);
        assert_eq!(d.local().random(), &[1; 32]);
        assert_eq!(d.remote().random(), &[2; 32]);
        d.local_mut().set_random([3; 32]);
        assert_eq!(d.client.random(), &[3; 32]);

        let d = Duplex::new(TlsRole::Server, [1; 32], [2; 32]);
        assert_eq!(d.local().random(), &[2; 32]);
        assert_eq!(d.remote().random(), &[1; 32]);
    }

    #[test]
    fn test_change_cipher_without_keys() {
        let mut s = ConnectionState::new([0; 32]);
        let err = s.change_cipher().unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::UnexpectedMessage));
        assert!(!s.cipher_changed());
    }

    #[test]
    fn test_plaintext_seal_splits_large_payload() {
        let mut s = ConnectionState::new([0; 32]);
        let wire = s
            .seal(ContentType::ApplicationData, 0x0303, &vec![7u8; 20000])
            .unwrap();
        assert_eq!(wire.len(), 20000 + 2 * RECORD_HEADER_LEN);
        assert_eq!(s.sequence_number(), 0);

        let mut r = ConnectionState::new([0; 32]);
        let records = r.read_records(&wire).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].length(), 16384);
        assert_eq!(records[1].length(), 20000 - 16384);
    }

    #[test]
    fn test_protected_sequence_numbers() {
        for suite in [
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        ] {
            let (mut w, mut r) = protected_pair(suite);
            let mut wire = Vec::new();
            for i in 0..3u8 {
                wire.extend(w.seal(ContentType::ApplicationData, 0x0303, &[i; 5]).unwrap());
            }
            assert_eq!(w.sequence_number(), 3);
            let records = r.read_records(&wire).unwrap();
            assert_eq!(records.len(), 3);
            assert_eq!(records[2].payload(), &[2; 5]);
            assert_eq!(r.sequence_number(), 3);
        }
    }

    #[test]
    fn test_failed_open_leaves_sequence() {
        let (mut w, mut r) = protected_pair(CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256);
        let mut wire = w.seal(ContentType::ApplicationData, 0x0303, b"abc").unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        let err = r.read_records(&wire).unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::BadRecordMac));
        assert_eq!(r.sequence_number(), 0);
    }

    #[test]
    fn test_protected_overflow_checked_before_decrypt() {
        let (_, mut r) = protected_pair(CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA256);
        // 18432 is accepted by the header check, 18433 is not.
        r.push_inbound(&[23, 3, 3, 0x48, 0x01]);
        let err = r.next_record().unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::RecordOverflow));
        assert_eq!(r.sequence_number(), 0);
    }

    #[test]
    fn test_plaintext_limit_before_cipher_change() {
        let mut r = ConnectionState::new([0; 32]);
        r.push_inbound(&[22, 3, 3, 0x44, 0x01]);
        let err = r.next_record().unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::RecordOverflow));
    }
}

//! TLS record layer: framing, reassembly, and the plaintext/CBC/AEAD codecs.

pub mod aead;
pub mod cbc;

use crate::crypt::key_schedule::TrafficKeys;
use crate::crypt::{CipherSuiteParams, CipherType};
use aead::AeadCodec;
use cbc::CbcCodec;
use tlsengine_types::TlsError;

/// Record header length: type(1) || version(2) || length(2).
pub const RECORD_HEADER_LEN: usize = 5;
/// Largest plaintext fragment this engine emits (2^14).
pub const MAX_PLAINTEXT_LENGTH: usize = 16384;
/// Largest acceptable unprotected record body (2^14 + 1024).
pub const MAX_PLAINTEXT_RECORD_LENGTH: usize = MAX_PLAINTEXT_LENGTH + 1024;
/// Largest acceptable protected record body (2^14 + 2048).
pub const MAX_CIPHERTEXT_LENGTH: usize = MAX_PLAINTEXT_LENGTH + 2048;

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        match v {
            20 => Ok(ContentType::ChangeCipherSpec),
            21 => Ok(ContentType::Alert),
            22 => Ok(ContentType::Handshake),
            23 => Ok(ContentType::ApplicationData),
            _ => Err(v),
        }
    }
}

/// A TLS record. The length field is always derived from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub content_type: ContentType,
    pub version: u16,
    payload: Vec<u8>,
}

impl Record {
    pub fn new(content_type: ContentType, version: u16, payload: Vec<u8>) -> Self {
        Self {
            content_type,
            version,
            payload,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    /// Body length as carried in the header.
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Serialize header and body.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_HEADER_LEN + self.payload.len());
        buf.push(self.content_type as u8);
        buf.extend_from_slice(&self.version.to_be_bytes());
        buf.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// A parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    pub version: u16,
    pub length: usize,
}

/// Parse a record header, checking the declared length against `max_len`.
///
/// Returns `Ok(None)` if fewer than five bytes are available.
pub fn parse_header(data: &[u8], max_len: usize) -> Result<Option<RecordHeader>, TlsError> {
    if data.len() < RECORD_HEADER_LEN {
        return Ok(None);
    }
    let content_type = ContentType::from_u8(data[0])
        .map_err(|v| TlsError::unexpected_message(format!("unknown content type {v}")))?;
    let version = u16::from_be_bytes([data[1], data[2]]);
    if data[1] != 3 {
        return Err(TlsError::protocol_version(format!(
            "record version {version:#06x}"
        )));
    }
    let length = u16::from_be_bytes([data[3], data[4]]) as usize;
    if length > max_len {
        return Err(TlsError::record_overflow(format!(
            "record length {length} exceeds {max_len}"
        )));
    }
    Ok(Some(RecordHeader {
        content_type,
        version,
        length,
    }))
}

/// Accumulates inbound bytes until whole records are available.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    buf: Vec<u8>,
}

impl RecordBuffer {
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete record, leaving any remainder buffered.
    ///
    /// An incomplete record consumes nothing.
    pub fn next_record(&mut self, max_len: usize) -> Result<Option<Record>, TlsError> {
        let Some(header) = parse_header(&self.buf, max_len)? else {
            return Ok(None);
        };
        let total = RECORD_HEADER_LEN + header.length;
        if self.buf.len() < total {
            return Ok(None);
        }
        let payload = self.buf[RECORD_HEADER_LEN..total].to_vec();
        self.buf.drain(..total);
        Ok(Some(Record::new(header.content_type, header.version, payload)))
    }

    /// Bytes buffered but not yet returned as records.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// The active record protection for one direction.
pub enum RecordCodec {
    Plaintext,
    Cbc(CbcCodec),
    Aead(AeadCodec),
}

impl std::fmt::Debug for RecordCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordCodec::Plaintext => f.write_str("Plaintext"),
            RecordCodec::Cbc(_) => f.write_str("Cbc"),
            RecordCodec::Aead(_) => f.write_str("Aead"),
        }
    }
}

impl RecordCodec {
    /// Build the protected codec for a suite from one direction's keys.
    pub fn new(params: &CipherSuiteParams, keys: &TrafficKeys) -> Result<Self, TlsError> {
        match params.cipher_type {
            CipherType::Block => {
                let mac_hash = params
                    .mac_hash
                    .ok_or_else(|| TlsError::internal_error("CBC suite without MAC hash"))?;
                Ok(RecordCodec::Cbc(CbcCodec::new(
                    keys.key.clone(),
                    keys.mac_key.clone(),
                    mac_hash,
                )))
            }
            CipherType::Aead => Ok(RecordCodec::Aead(AeadCodec::new(
                params,
                &keys.key,
                keys.iv.clone(),
            )?)),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, RecordCodec::Plaintext)
    }

    /// Largest record body accepted under this codec.
    pub fn max_record_len(&self) -> usize {
        if self.is_protected() {
            MAX_CIPHERTEXT_LENGTH
        } else {
            MAX_PLAINTEXT_RECORD_LENGTH
        }
    }

    /// Protect one plaintext fragment.
    pub fn protect(
        &self,
        seq: u64,
        content_type: ContentType,
        version: u16,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        match self {
            RecordCodec::Plaintext => Ok(plaintext.to_vec()),
            RecordCodec::Cbc(c) => c.seal(seq, content_type, version, plaintext),
            RecordCodec::Aead(c) => c.seal(seq, content_type, version, plaintext),
        }
    }

    /// Authenticate and decrypt one record body.
    pub fn unprotect(
        &self,
        seq: u64,
        content_type: ContentType,
        version: u16,
        fragment: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        match self {
            RecordCodec::Plaintext => Ok(fragment.to_vec()),
            RecordCodec::Cbc(c) => c.open(seq, content_type, version, fragment),
            RecordCodec::Aead(c) => c.open(seq, content_type, version, fragment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlsengine_types::AlertDescription;

    #[test]
    fn test_content_type_values() {
        assert_eq!(ContentType::from_u8(20), Ok(ContentType::ChangeCipherSpec));
        assert_eq!(ContentType::from_u8(23), Ok(ContentType::ApplicationData));
        assert_eq!(ContentType::from_u8(24), Err(24));
    }

    #[test]
    fn test_record_length_tracks_payload() {
        let mut r = Record::new(ContentType::Handshake, 0x0303, vec![1, 2, 3]);
        assert_eq!(r.length(), 3);
        r.set_payload(vec![0; 10]);
        assert_eq!(r.length(), 10);
        assert_eq!(&r.encode()[..5], &[22, 3, 3, 0, 10]);
    }

    #[test]
    fn test_buffer_incomplete_consumes_nothing() {
        let wire = Record::new(ContentType::Alert, 0x0303, vec![1, 0]).encode();
        let mut buf = RecordBuffer::default();
        buf.push(&wire[..3]);
        assert_eq!(buf.next_record(MAX_PLAINTEXT_RECORD_LENGTH).unwrap(), None);
        buf.push(&wire[3..6]);
        assert_eq!(buf.next_record(MAX_PLAINTEXT_RECORD_LENGTH).unwrap(), None);
        assert_eq!(buf.pending(), 6);
        buf.push(&wire[6..]);
        let rec = buf.next_record(MAX_PLAINTEXT_RECORD_LENGTH).unwrap().unwrap();
        assert_eq!(rec.payload(), &[1, 0]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_buffer_multiple_records() {
        let mut wire = Record::new(ContentType::Handshake, 0x0303, vec![9; 4]).encode();
        wire.extend(Record::new(ContentType::ApplicationData, 0x0303, vec![7; 2]).encode());
        wire.extend_from_slice(&[23, 3]);
        let mut buf = RecordBuffer::default();
        buf.push(&wire);
        let a = buf.next_record(MAX_PLAINTEXT_RECORD_LENGTH).unwrap().unwrap();
        let b = buf.next_record(MAX_PLAINTEXT_RECORD_LENGTH).unwrap().unwrap();
        assert_eq!(a.content_type, ContentType::Handshake);
        assert_eq!(b.payload(), &[7, 7]);
        assert_eq!(buf.next_record(MAX_PLAINTEXT_RECORD_LENGTH).unwrap(), None);
        assert_eq!(buf.pending(), 2);
    }

    #[test]
    fn test_header_overflow_rejected() {
        let header = [23, 3, 3, 0x48, 0x01]; // 18433
        let err = parse_header(&header, MAX_CIPHERTEXT_LENGTH).unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::RecordOverflow));
        let header = [22, 3, 3, 0x44, 0x01]; // 17409
        let err = parse_header(&header, MAX_PLAINTEXT_RECORD_LENGTH).unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::RecordOverflow));
        let header = [22, 3, 3, 0x44, 0x00]; // 17408
        assert!(parse_header(&header, MAX_PLAINTEXT_RECORD_LENGTH)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_header_rejects_bad_type_and_version() {
        assert_eq!(
            parse_header(&[99, 3, 3, 0, 0], 100).unwrap_err().description(),
            Some(AlertDescription::UnexpectedMessage)
        );
        assert_eq!(
            parse_header(&[22, 2, 0, 0, 0], 100).unwrap_err().description(),
            Some(AlertDescription::ProtocolVersion)
        );
    }

    #[test]
    fn test_plaintext_codec_passthrough() {
        let codec = RecordCodec::Plaintext;
        assert!(!codec.is_protected());
        assert_eq!(codec.max_record_len(), 17408);
        let out = codec
            .protect(0, ContentType::Handshake, 0x0303, b"hello")
            .unwrap();
        assert_eq!(out, b"hello");
    }
}

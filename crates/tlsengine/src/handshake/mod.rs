//! TLS 1.1/1.2 handshake protocol: message codecs and the client and server
//! state machines.

pub mod client;
pub mod codec;
pub mod codec_kx;
pub mod key_exchange;
pub mod server;
pub mod signing;

use crate::config::TlsConfig;
use crate::session::Session;
use client::ClientHandshake;
use server::ServerHandshake;
use tlsengine_types::TlsError;

/// Handshake message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    HelloRequest = 0,
    ClientHello = 1,
    ServerHello = 2,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    ClientKeyExchange = 16,
    Finished = 20,
}

impl HandshakeType {
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        match v {
            0 => Ok(HandshakeType::HelloRequest),
            1 => Ok(HandshakeType::ClientHello),
            2 => Ok(HandshakeType::ServerHello),
            11 => Ok(HandshakeType::Certificate),
            12 => Ok(HandshakeType::ServerKeyExchange),
            13 => Ok(HandshakeType::CertificateRequest),
            14 => Ok(HandshakeType::ServerHelloDone),
            15 => Ok(HandshakeType::CertificateVerify),
            16 => Ok(HandshakeType::ClientKeyExchange),
            20 => Ok(HandshakeType::Finished),
            _ => Err(v),
        }
    }
}

/// A complete handshake message.
///
/// `raw` is the full encoding (header included) as it enters the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    pub msg_type: HandshakeType,
    pub raw: Vec<u8>,
}

impl HandshakeMessage {
    /// Message body without the 4-byte header.
    pub fn body(&self) -> &[u8] {
        &self.raw[codec::HANDSHAKE_HEADER_LEN..]
    }
}

/// Reassembles handshake messages that span record boundaries.
#[derive(Debug, Default)]
pub struct HandshakeBuffer {
    buf: Vec<u8>,
}

impl HandshakeBuffer {
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete message, if one is buffered.
    pub fn next_message(&mut self) -> Result<Option<HandshakeMessage>, TlsError> {
        let Some((msg_type, total)) = codec::peek_handshake_header(&self.buf)? else {
            return Ok(None);
        };
        if self.buf.len() < total {
            return Ok(None);
        }
        let raw: Vec<u8> = self.buf.drain(..total).collect();
        Ok(Some(HandshakeMessage { msg_type, raw }))
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// The role-specific handshake state machine.
pub enum Handshake {
    Client(ClientHandshake),
    Server(ServerHandshake),
}

impl Handshake {
    /// Process one handshake message.
    pub fn handle_message(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        match self {
            Handshake::Client(hs) => hs.handle_message(session, config, msg),
            Handshake::Server(hs) => hs.handle_message(session, config, msg),
        }
    }

    /// True when a ChangeCipherSpec from the peer is legal now.
    pub fn expects_change_cipher_spec(&self) -> bool {
        match self {
            Handshake::Client(hs) => hs.expects_change_cipher_spec(),
            Handshake::Server(hs) => hs.expects_change_cipher_spec(),
        }
    }

    /// Record that the peer's ChangeCipherSpec was applied.
    pub fn process_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        match self {
            Handshake::Client(hs) => hs.process_change_cipher_spec(),
            Handshake::Server(hs) => hs.process_change_cipher_spec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlsengine_types::AlertDescription;

    #[test]
    fn test_handshake_type_values() {
        assert_eq!(HandshakeType::from_u8(0), Ok(HandshakeType::HelloRequest));
        assert_eq!(HandshakeType::from_u8(16), Ok(HandshakeType::ClientKeyExchange));
        assert_eq!(HandshakeType::from_u8(4), Err(4));
    }

    #[test]
    fn test_buffer_split_and_coalesced_messages() {
        let done = codec::encode_server_hello_done();
        let finished = codec::encode_finished(&[7u8; 12]);
        let mut wire = done.clone();
        wire.extend_from_slice(&finished);

        let mut buf = HandshakeBuffer::default();
        buf.push(&wire[..6]);
        let first = buf.next_message().unwrap().unwrap();
        assert_eq!(first.msg_type, HandshakeType::ServerHelloDone);
        assert!(first.body().is_empty());
        assert_eq!(buf.next_message().unwrap(), None);

        buf.push(&wire[6..]);
        let second = buf.next_message().unwrap().unwrap();
        assert_eq!(second.msg_type, HandshakeType::Finished);
        assert_eq!(second.body(), &[7u8; 12]);
        assert_eq!(second.raw, finished);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_buffer_unknown_type() {
        let mut buf = HandshakeBuffer::default();
        buf.push(&[99, 0, 0, 0]);
        let err = buf.next_message().unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::UnexpectedMessage));
    }
}

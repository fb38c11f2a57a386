//! Handshake message encoding and decoding (RFC 5246 §7.4).
//!
//! Encoders return complete messages (header + body); decoders take the
//! body only. Malformed bodies are `illegal_parameter`.

use super::HandshakeType;
use crate::extensions::codec::{encode_extensions, parse_extensions};
use crate::extensions::Extension;
use crate::CipherSuite;
use tlsengine_types::TlsError;

/// Handshake header length: msg_type(1) || length(3).
pub const HANDSHAKE_HEADER_LEN: usize = 4;
/// Upper bound on a single handshake message body.
pub const MAX_HANDSHAKE_MESSAGE_LEN: usize = 1 << 17;
/// Null compression method.
pub const COMPRESSION_NULL: u8 = 0;

/// ClientHello message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub client_version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

/// ServerHello message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub server_version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: CipherSuite,
    pub compression_method: u8,
    pub extensions: Vec<Extension>,
}

/// Bounds-checked cursor over a message body.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    pub(crate) fn err(&self, msg: &str) -> TlsError {
        TlsError::illegal_parameter(format!("{}: {msg}", self.what))
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], TlsError> {
        if self.data.len() - self.pos < n {
            return Err(self.err("truncated"));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, TlsError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, TlsError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u24(&mut self) -> Result<usize, TlsError> {
        let b = self.take(3)?;
        Ok(read_u24(b))
    }

    pub(crate) fn vec_u8(&mut self) -> Result<&'a [u8], TlsError> {
        let n = self.u8()? as usize;
        self.take(n)
    }

    pub(crate) fn vec_u16(&mut self) -> Result<&'a [u8], TlsError> {
        let n = self.u16()? as usize;
        self.take(n)
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub(crate) fn rest_is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    pub(crate) fn finish(&self) -> Result<(), TlsError> {
        if self.pos != self.data.len() {
            return Err(self.err("trailing bytes"));
        }
        Ok(())
    }
}

fn read_u24(b: &[u8]) -> usize {
    ((b[0] as usize) << 16) | ((b[1] as usize) << 8) | (b[2] as usize)
}

fn push_u24(out: &mut Vec<u8>, len: usize) {
    out.push((len >> 16) as u8);
    out.push((len >> 8) as u8);
    out.push(len as u8);
}

/// Inspect a handshake header: returns the type and the total message
/// length once four bytes are available.
pub fn peek_handshake_header(data: &[u8]) -> Result<Option<(HandshakeType, usize)>, TlsError> {
    if data.len() < HANDSHAKE_HEADER_LEN {
        return Ok(None);
    }
    let msg_type = HandshakeType::from_u8(data[0])
        .map_err(|v| TlsError::unexpected_message(format!("unknown handshake type {v}")))?;
    let length = read_u24(&data[1..4]);
    if length > MAX_HANDSHAKE_MESSAGE_LEN {
        return Err(TlsError::illegal_parameter(format!(
            "handshake message of {length} bytes"
        )));
    }
    Ok(Some((msg_type, HANDSHAKE_HEADER_LEN + length)))
}

/// Wrap a handshake body with the 4-byte header.
pub fn wrap_handshake(msg_type: HandshakeType, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HANDSHAKE_HEADER_LEN + body.len());
    out.push(msg_type as u8);
    push_u24(&mut out, body.len());
    out.extend_from_slice(body);
    out
}

pub fn encode_client_hello(ch: &ClientHello) -> Vec<u8> {
    let mut body = Vec::with_capacity(128);
    body.extend_from_slice(&ch.client_version.to_be_bytes());
    body.extend_from_slice(&ch.random);
    body.push(ch.session_id.len() as u8);
    body.extend_from_slice(&ch.session_id);
    body.extend_from_slice(&((ch.cipher_suites.len() * 2) as u16).to_be_bytes());
    for s in &ch.cipher_suites {
        body.extend_from_slice(&s.0.to_be_bytes());
    }
    body.push(ch.compression_methods.len() as u8);
    body.extend_from_slice(&ch.compression_methods);
    if !ch.extensions.is_empty() {
        body.extend_from_slice(&encode_extensions(&ch.extensions));
    }
    wrap_handshake(HandshakeType::ClientHello, &body)
}

pub fn decode_client_hello(body: &[u8]) -> Result<ClientHello, TlsError> {
    let mut r = Reader::new(body, "ClientHello");
    let client_version = r.u16()?;
    let mut random = [0u8; 32];
    random.copy_from_slice(r.take(32)?);
    let session_id = r.vec_u8()?;
    if session_id.len() > 32 {
        return Err(r.err("session_id longer than 32 bytes"));
    }
    let session_id = session_id.to_vec();
    let suites = r.vec_u16()?;
    if suites.is_empty() || suites.len() % 2 != 0 {
        return Err(r.err("invalid cipher_suites length"));
    }
    let cipher_suites = suites
        .chunks_exact(2)
        .map(|c| CipherSuite(u16::from_be_bytes([c[0], c[1]])))
        .collect();
    let compression_methods = r.vec_u8()?.to_vec();
    if compression_methods.is_empty() {
        return Err(r.err("empty compression_methods"));
    }
    let extensions = parse_extensions(r.rest())?;
    Ok(ClientHello {
        client_version,
        random,
        session_id,
        cipher_suites,
        compression_methods,
        extensions,
    })
}

pub fn encode_server_hello(sh: &ServerHello) -> Vec<u8> {
    let mut body = Vec::with_capacity(80);
    body.extend_from_slice(&sh.server_version.to_be_bytes());
    body.extend_from_slice(&sh.random);
    body.push(sh.session_id.len() as u8);
    body.extend_from_slice(&sh.session_id);
    body.extend_from_slice(&sh.cipher_suite.0.to_be_bytes());
    body.push(sh.compression_method);
    if !sh.extensions.is_empty() {
        body.extend_from_slice(&encode_extensions(&sh.extensions));
    }
    wrap_handshake(HandshakeType::ServerHello, &body)
}

pub fn decode_server_hello(body: &[u8]) -> Result<ServerHello, TlsError> {
    let mut r = Reader::new(body, "ServerHello");
    let server_version = r.u16()?;
    let mut random = [0u8; 32];
    random.copy_from_slice(r.take(32)?);
    let session_id = r.vec_u8()?;
    if session_id.len() > 32 {
        return Err(r.err("session_id longer than 32 bytes"));
    }
    let session_id = session_id.to_vec();
    let cipher_suite = CipherSuite(r.u16()?);
    let compression_method = r.u8()?;
    let extensions = parse_extensions(r.rest())?;
    Ok(ServerHello {
        server_version,
        random,
        session_id,
        cipher_suite,
        compression_method,
        extensions,
    })
}

/// Encode a Certificate message from a DER chain (leaf first).
pub fn encode_certificate(chain: &[Vec<u8>]) -> Vec<u8> {
    let total_len: usize = chain.iter().map(|c| 3 + c.len()).sum();
    let mut body = Vec::with_capacity(3 + total_len);
    push_u24(&mut body, total_len);
    for cert in chain {
        push_u24(&mut body, cert.len());
        body.extend_from_slice(cert);
    }
    wrap_handshake(HandshakeType::Certificate, &body)
}

pub fn decode_certificate(body: &[u8]) -> Result<Vec<Vec<u8>>, TlsError> {
    let mut r = Reader::new(body, "Certificate");
    let total_len = r.u24()?;
    let list = r.take(total_len)?;
    r.finish()?;

    let mut certs = Vec::new();
    let mut entries = Reader::new(list, "Certificate entry");
    while !entries.rest_is_empty() {
        let len = entries.u24()?;
        let cert = entries.take(len)?;
        if cert.is_empty() {
            return Err(entries.err("empty certificate"));
        }
        certs.push(cert.to_vec());
    }
    Ok(certs)
}

pub fn encode_server_hello_done() -> Vec<u8> {
    wrap_handshake(HandshakeType::ServerHelloDone, &[])
}

pub fn encode_finished(verify_data: &[u8]) -> Vec<u8> {
    wrap_handshake(HandshakeType::Finished, verify_data)
}

/// Decode a Finished body; `verify_data` is exactly `expected_len` bytes.
pub fn decode_finished(body: &[u8], expected_len: usize) -> Result<&[u8], TlsError> {
    if body.len() != expected_len {
        return Err(TlsError::illegal_parameter(format!(
            "Finished verify_data must be {expected_len} bytes, got {}",
            body.len()
        )));
    }
    Ok(body)
}

//! Content dispatcher: routes decoded records by content type.

use crate::alert::Alert;
use crate::config::TlsConfig;
use crate::handshake::{Handshake, HandshakeBuffer, HandshakeType};
use crate::record::{ContentType, Record};
use crate::session::Session;
use crate::TlsRole;
use log::{debug, trace, warn};
use tlsengine_types::TlsError;

/// ChangeCipherSpec payload.
const CHANGE_CIPHER_SPEC: [u8; 1] = [1];

/// Owns the handshake state machine and the buffer that reassembles
/// handshake messages spanning records.
pub struct Dispatcher {
    handshake: Handshake,
    buffer: HandshakeBuffer,
}

impl Dispatcher {
    pub fn new(handshake: Handshake) -> Self {
        Self {
            handshake,
            buffer: HandshakeBuffer::default(),
        }
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Process one decoded record.
    pub fn dispatch(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        record: Record,
    ) -> Result<(), TlsError> {
        match record.content_type {
            ContentType::Handshake => self.on_handshake(session, config, record.payload()),
            ContentType::ChangeCipherSpec => self.on_change_cipher_spec(session, record.payload()),
            ContentType::Alert => on_alert(session, record.payload()),
            ContentType::ApplicationData => on_application_data(session, record.payload()),
        }
    }

    fn on_handshake(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        payload: &[u8],
    ) -> Result<(), TlsError> {
        if payload.is_empty() {
            return Err(TlsError::unexpected_message("empty handshake record"));
        }
        self.buffer.push(payload);
        while let Some(msg) = self.buffer.next_message()? {
            trace!("{:?} received {:?} ({} bytes)", session.role, msg.msg_type, msg.raw.len());
            if msg.msg_type == HandshakeType::HelloRequest {
                return Err(match session.role {
                    TlsRole::Client => TlsError::no_renegotiation("HelloRequest received"),
                    TlsRole::Server => {
                        TlsError::unexpected_message("HelloRequest sent to a server")
                    }
                });
            }
            if session.handshake_complete {
                return Err(TlsError::unexpected_message(format!(
                    "{:?} after handshake completion",
                    msg.msg_type
                )));
            }
            self.handshake.handle_message(session, config, &msg)?;
        }
        Ok(())
    }

    /// Switch the read direction to the pending keys.
    fn on_change_cipher_spec(
        &mut self,
        session: &mut Session,
        payload: &[u8],
    ) -> Result<(), TlsError> {
        if payload != &CHANGE_CIPHER_SPEC[..] {
            return Err(TlsError::unexpected_message(format!(
                "malformed ChangeCipherSpec ({} bytes)",
                payload.len()
            )));
        }
        if !self.handshake.expects_change_cipher_spec() {
            return Err(TlsError::unexpected_message("unexpected ChangeCipherSpec"));
        }
        if !self.buffer.is_empty() {
            return Err(TlsError::unexpected_message(
                "ChangeCipherSpec inside a handshake message",
            ));
        }
        session.duplex.remote_mut().change_cipher()?;
        self.handshake.process_change_cipher_spec()?;
        debug!("{:?} read cipher changed", session.role);
        Ok(())
    }
}

fn on_alert(session: &mut Session, payload: &[u8]) -> Result<(), TlsError> {
    let alert = Alert::decode(payload)?;
    session.closed = true;
    if alert.is_close_notify() {
        debug!("{:?} received close_notify", session.role);
        return Ok(());
    }
    warn!(
        "{:?} received {} alert {}",
        session.role, alert.level, alert.description
    );
    Err(TlsError::AlertReceived {
        level: alert.level,
        description: alert.description,
    })
}

fn on_application_data(session: &mut Session, payload: &[u8]) -> Result<(), TlsError> {
    if !session.handshake_complete {
        return Err(TlsError::unexpected_message(
            "application data before handshake completion",
        ));
    }
    session.push_application_data(payload);
    Ok(())
}

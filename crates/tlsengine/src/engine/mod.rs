//! Transport-agnostic engine facade.
//!
//! [`TlsEngine`] owns one session. Bytes from the peer go in through
//! [`TlsEngine::encode`]; bytes for the peer come out of
//! [`TlsEngine::decode`]. Application data is queued with
//! [`TlsEngine::output`] and read back with [`TlsEngine::input`].

use crate::alert::Alert;
use crate::config::TlsConfig;
use crate::connection_info::ConnectionInfo;
use crate::content::Dispatcher;
use crate::handshake::client::ClientHandshake;
use crate::handshake::server::ServerHandshake;
use crate::handshake::Handshake;
use crate::session::Session;
use crate::{TlsRole, TlsVersion};
use log::{debug, warn};
use tlsengine_types::TlsError;

/// One TLS 1.1/1.2 connection, client or server.
pub struct TlsEngine {
    config: TlsConfig,
    session: Session,
    dispatcher: Dispatcher,
    /// Application data waiting to be sealed by the next `decode`.
    pending_output: Vec<u8>,
}

impl std::fmt::Debug for TlsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsEngine")
            .field("session", &self.session)
            .field("pending_output", &self.pending_output.len())
            .finish_non_exhaustive()
    }
}

impl TlsEngine {
    /// Create an engine for `config.role`.
    ///
    /// A client queues its ClientHello right away, so the first `decode`
    /// returns it.
    pub fn new(config: TlsConfig) -> Result<Self, TlsError> {
        config.validate()?;
        let mut session = Session::new(config.role, config.max_version)?;
        let handshake = match config.role {
            TlsRole::Client => Handshake::Client(ClientHandshake::start(&mut session, &config)?),
            TlsRole::Server => Handshake::Server(ServerHandshake::new()),
        };
        debug!("{:?} engine created (max TLS {})", config.role, config.max_version.as_str());
        Ok(Self {
            config,
            session,
            dispatcher: Dispatcher::new(handshake),
            pending_output: Vec::new(),
        })
    }

    pub fn role(&self) -> TlsRole {
        self.session.role
    }

    /// Negotiated version; the configured maximum before ServerHello.
    pub fn version(&self) -> TlsVersion {
        self.session.version
    }

    pub fn is_handshaked(&self) -> bool {
        self.session.handshake_complete
    }

    pub fn is_closed(&self) -> bool {
        self.session.closed
    }

    /// Feed bytes received from the peer.
    ///
    /// Partial records are buffered until complete. On failure the matching
    /// fatal alert is queued for `decode` (unless the failure is an alert from
    /// the peer) and the engine is closed.
    pub fn encode(&mut self, data: &[u8]) -> Result<(), TlsError> {
        if self.session.closed {
            return Err(TlsError::ConnectionClosed);
        }
        self.session.duplex.remote_mut().push_inbound(data);
        let result = self.process_inbound();
        if let Err(err) = &result {
            self.abort(err);
        }
        result
    }

    fn process_inbound(&mut self) -> Result<(), TlsError> {
        // One record at a time: a ChangeCipherSpec changes how the rest of
        // the buffer is read.
        while !self.session.closed {
            let Some(record) = self.session.duplex.remote_mut().next_record()? else {
                break;
            };
            self.dispatcher
                .dispatch(&mut self.session, &self.config, record)?;
        }
        Ok(())
    }

    /// Queue the alert for `err` and close the session.
    fn abort(&mut self, err: &TlsError) {
        self.session.closed = true;
        if err.is_from_peer() {
            return;
        }
        let Some((level, description)) = err.alert() else {
            return;
        };
        warn!("{:?} sending {level} alert {description}: {err}", self.session.role);
        if let Err(e) = self.session.send_alert(Alert::new(level, description)) {
            warn!("failed to queue alert: {e}");
        }
    }

    /// Drain the bytes to send to the peer.
    ///
    /// Once the handshake is complete this also seals the queued application
    /// data into records of at most 2^14 bytes.
    pub fn decode(&mut self) -> Result<Vec<u8>, TlsError> {
        self.flush_application_data()?;
        Ok(self.session.take_output())
    }

    fn flush_application_data(&mut self) -> Result<(), TlsError> {
        if !self.session.handshake_complete
            || self.session.closed
            || self.pending_output.is_empty()
        {
            return Ok(());
        }
        let data = std::mem::take(&mut self.pending_output);
        self.session.send_application_data(&data)
    }

    /// Queue application data for the next `decode`.
    ///
    /// With `append == false` the data replaces anything queued but not yet
    /// decoded.
    pub fn output(&mut self, data: &[u8], append: bool) -> Result<&mut Self, TlsError> {
        if self.session.closed {
            return Err(TlsError::ConnectionClosed);
        }
        if !self.session.handshake_complete {
            return Err(TlsError::HandshakeNotComplete);
        }
        if !append {
            self.pending_output.clear();
        }
        self.pending_output.extend_from_slice(data);
        Ok(self)
    }

    /// Same as `output(data, true)`.
    pub fn append(&mut self, data: &[u8]) -> Result<&mut Self, TlsError> {
        self.output(data, true)
    }

    /// Drain decrypted application data received from the peer.
    pub fn input(&mut self) -> Vec<u8> {
        self.session.take_application_data()
    }

    /// Close the connection.
    ///
    /// Queued application data is sealed first, then a close_notify is
    /// queued when `send_close_notify` is set. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), TlsError> {
        if self.session.closed {
            return Ok(());
        }
        self.flush_application_data()?;
        if self.config.send_close_notify {
            self.session.send_alert(Alert::close_notify())?;
        }
        self.session.closed = true;
        debug!("{:?} connection closed", self.session.role);
        Ok(())
    }

    /// Negotiated parameters, `None` until a cipher suite is agreed.
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        ConnectionInfo::from_session(&self.session)
    }
}

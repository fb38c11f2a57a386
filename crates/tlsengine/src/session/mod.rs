//! Per-connection session state shared by the dispatcher and the handshake.

use crate::alert::Alert;
use crate::connection::Duplex;
use crate::crypt::key_schedule::KeyBlock;
use crate::crypt::prf::PrfAlgorithm;
use crate::crypt::transcript::TranscriptHash;
use crate::crypt::{CipherSuiteParams, NamedGroup, SignatureScheme};
use crate::record::ContentType;
use crate::{TlsRole, TlsVersion};
use log::debug;
use tlsengine_crypto::random::random_array;
use tlsengine_crypto::HashAlgorithm;
use tlsengine_types::TlsError;
use zeroize::Zeroizing;

/// Root state of one TLS connection.
///
/// Created with the engine and dropped with it; nothing is carried over to
/// other connections.
pub struct Session {
    pub role: TlsRole,
    /// Negotiated version; the configured maximum until ServerHello.
    pub version: TlsVersion,
    /// Negotiated suite, `None` until ServerHello.
    pub cipher_suite: Option<CipherSuiteParams>,
    pub session_id: Vec<u8>,
    pub handshake_complete: bool,
    pub closed: bool,
    pub transcript: TranscriptHash,
    pub peer_certificates: Vec<Vec<u8>>,
    pub negotiated_group: Option<NamedGroup>,
    pub signature_scheme: Option<SignatureScheme>,
    pub duplex: Duplex,
    master_secret: Option<Zeroizing<Vec<u8>>>,
    out_buffer: Vec<u8>,
    app_buffer: Vec<u8>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("version", &self.version)
            .field("cipher_suite", &self.cipher_suite.as_ref().map(|p| p.name()))
            .field("handshake_complete", &self.handshake_complete)
            .field("closed", &self.closed)
            .field("duplex", &self.duplex)
            .field("pending_output", &self.out_buffer.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start a session with a fresh local random.
    pub fn new(role: TlsRole, version: TlsVersion) -> Result<Self, TlsError> {
        let local_random: [u8; 32] = random_array()?;
        let (client_random, server_random) = match role {
            TlsRole::Client => (local_random, [0u8; 32]),
            TlsRole::Server => ([0u8; 32], local_random),
        };
        Ok(Self {
            role,
            version,
            cipher_suite: None,
            session_id: Vec::new(),
            handshake_complete: false,
            closed: false,
            transcript: TranscriptHash::new(),
            peer_certificates: Vec::new(),
            negotiated_group: None,
            signature_scheme: None,
            duplex: Duplex::new(role, client_random, server_random),
            master_secret: None,
            out_buffer: Vec::new(),
            app_buffer: Vec::new(),
        })
    }

    pub fn client_random(&self) -> [u8; 32] {
        *self.duplex.client.random()
    }

    pub fn server_random(&self) -> [u8; 32] {
        *self.duplex.server.random()
    }

    /// PRF for the negotiated version and suite.
    pub fn prf_algorithm(&self) -> PrfAlgorithm {
        match self.version {
            TlsVersion::Tls11 => PrfAlgorithm::Tls11,
            TlsVersion::Tls12 => PrfAlgorithm::Tls12(
                self.cipher_suite
                    .as_ref()
                    .map_or(HashAlgorithm::Sha256, |p| p.prf_hash),
            ),
        }
    }

    /// Negotiated suite parameters, or `internal_error` before ServerHello.
    pub fn params(&self) -> Result<&CipherSuiteParams, TlsError> {
        self.cipher_suite
            .as_ref()
            .ok_or_else(|| TlsError::internal_error("cipher suite not negotiated"))
    }

    pub fn master_secret(&self) -> Option<&[u8]> {
        self.master_secret.as_deref().map(Vec::as_slice)
    }

    pub fn set_master_secret(&mut self, master_secret: Zeroizing<Vec<u8>>) {
        self.master_secret = Some(master_secret);
    }

    /// Stage both directions' keys for the next ChangeCipherSpec.
    pub fn install_keys(&mut self, key_block: KeyBlock) -> Result<(), TlsError> {
        let params = self.params()?.clone();
        let KeyBlock { client, server } = key_block;
        self.duplex.client.install_pending(params.clone(), client);
        self.duplex.server.install_pending(params, server);
        Ok(())
    }

    fn seal(&mut self, content_type: ContentType, payload: &[u8]) -> Result<(), TlsError> {
        let version = self.version.wire();
        let wire = self.duplex.local_mut().seal(content_type, version, payload)?;
        self.out_buffer.extend_from_slice(&wire);
        Ok(())
    }

    /// Queue a handshake message, adding it to the transcript while the
    /// handshake is running.
    pub fn send_handshake(&mut self, msg: &[u8]) -> Result<(), TlsError> {
        if !self.handshake_complete {
            self.transcript.update(msg);
        }
        self.seal(ContentType::Handshake, msg)
    }

    /// Queue ChangeCipherSpec and switch the write direction to the pending
    /// keys.
    pub fn send_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        self.seal(ContentType::ChangeCipherSpec, &[1])?;
        self.duplex.local_mut().change_cipher()?;
        debug!("{:?} write cipher changed", self.role);
        Ok(())
    }

    /// Queue an alert under the current write protection.
    pub fn send_alert(&mut self, alert: Alert) -> Result<(), TlsError> {
        self.seal(ContentType::Alert, &alert.encode())
    }

    /// Seal application data into records of at most 2^14 bytes.
    pub fn send_application_data(&mut self, data: &[u8]) -> Result<(), TlsError> {
        if data.is_empty() {
            return Ok(());
        }
        self.seal(ContentType::ApplicationData, data)
    }

    /// Drain the queued wire bytes.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buffer)
    }

    pub fn has_output(&self) -> bool {
        !self.out_buffer.is_empty()
    }

    pub fn push_application_data(&mut self, data: &[u8]) {
        self.app_buffer.extend_from_slice(data);
    }

    /// Drain decrypted application data.
    pub fn take_application_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.app_buffer)
    }
}

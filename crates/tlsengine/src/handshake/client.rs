//! Client handshake state machine (RSA and ECDHE_RSA key exchange).

use super::codec::{
    decode_certificate, decode_finished, decode_server_hello, encode_client_hello,
    encode_finished, ClientHello, COMPRESSION_NULL,
};
use super::codec_kx::{
    build_ske_signed_data, decode_server_key_exchange, encode_client_key_exchange_ecdhe,
    encode_client_key_exchange_rsa, ServerKeyExchange,
};
use super::key_exchange::KeyExchange;
use super::signing::verify_ske_signature;
use super::{HandshakeMessage, HandshakeType};
use crate::config::TlsConfig;
use crate::crypt::key_schedule::{
    compute_verify_data, derive_key_block, derive_master_secret, CLIENT_FINISHED_LABEL,
    SERVER_FINISHED_LABEL, VERIFY_DATA_LEN,
};
use crate::crypt::keylog::log_master_secret;
use crate::crypt::{CipherSuiteParams, KeyExchangeAlg, SignatureScheme};
use crate::extensions::codec::{
    build_ec_point_formats, build_signature_algorithms, build_supported_groups,
};
use crate::extensions::{OfferedExtensions, POINT_FORMAT_UNCOMPRESSED};
use crate::session::Session;
use crate::{CipherSuite, TlsVersion};
use log::debug;
use subtle::ConstantTimeEq;
use tlsengine_crypto::random::fill_random;
use tlsengine_crypto::x509::parse_certificate;
use tlsengine_crypto::RsaPublicKey;
use tlsengine_types::{AlertDescription, TlsError};
use zeroize::Zeroizing;

/// Client handshake states, named by the message expected next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    WaitServerHello,
    WaitCertificate,
    WaitServerKeyExchange,
    WaitServerHelloDone,
    WaitChangeCipherSpec,
    WaitFinished,
    Connected,
}

/// Client side of the handshake.
pub struct ClientHandshake {
    state: ClientState,
    client_version: TlsVersion,
    offered_suites: Vec<CipherSuite>,
    server_key: Option<RsaPublicKey>,
    server_kx: Option<ServerKeyExchange>,
}

impl ClientHandshake {
    /// Queue the ClientHello and wait for the ServerHello.
    pub fn start(session: &mut Session, config: &TlsConfig) -> Result<Self, TlsError> {
        let offered_suites: Vec<CipherSuite> = config
            .cipher_suites
            .iter()
            .copied()
            .filter(|s| {
                CipherSuiteParams::from_suite(*s)
                    .is_ok_and(|p| p.supports_version(config.max_version))
            })
            .collect();
        if offered_suites.is_empty() {
            return Err(TlsError::InvalidConfig(format!(
                "no enabled cipher suite usable with TLS {}",
                config.max_version.as_str()
            )));
        }

        let mut extensions = Vec::with_capacity(3);
        extensions.push(build_ec_point_formats(&[POINT_FORMAT_UNCOMPRESSED]));
        if !config.supported_groups.is_empty() {
            extensions.push(build_supported_groups(&config.supported_groups));
        }
        if config.max_version == TlsVersion::Tls12 && !config.signature_algorithms.is_empty() {
            extensions.push(build_signature_algorithms(&config.signature_algorithms));
        }

        let ch = ClientHello {
            client_version: config.max_version.wire(),
            random: session.client_random(),
            session_id: Vec::new(),
            cipher_suites: offered_suites.clone(),
            compression_methods: vec![COMPRESSION_NULL],
            extensions,
        };
        session.send_handshake(&encode_client_hello(&ch))?;
        debug!(
            "client hello sent: TLS {} with {} suites",
            config.max_version.as_str(),
            offered_suites.len()
        );

        Ok(Self {
            state: ClientState::WaitServerHello,
            client_version: config.max_version,
            offered_suites,
            server_key: None,
            server_kx: None,
        })
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn expects_change_cipher_spec(&self) -> bool {
        self.state == ClientState::WaitChangeCipherSpec
    }

    pub fn process_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        if self.state != ClientState::WaitChangeCipherSpec {
            return Err(TlsError::unexpected_message("unexpected ChangeCipherSpec"));
        }
        self.state = ClientState::WaitFinished;
        Ok(())
    }

    pub fn handle_message(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        match (self.state, msg.msg_type) {
            (ClientState::WaitServerHello, HandshakeType::ServerHello) => {
                self.process_server_hello(session, config, msg)
            }
            (ClientState::WaitCertificate, HandshakeType::Certificate) => {
                self.process_certificate(session, msg)
            }
            (ClientState::WaitServerKeyExchange, HandshakeType::ServerKeyExchange) => {
                self.process_server_key_exchange(session, config, msg)
            }
            (ClientState::WaitServerHelloDone, HandshakeType::ServerHelloDone) => {
                self.process_server_hello_done(session, config, msg)
            }
            (ClientState::WaitFinished, HandshakeType::Finished) => {
                self.process_finished(session, msg)
            }
            (state, msg_type) => Err(TlsError::unexpected_message(format!(
                "{msg_type:?} while in {state:?}"
            ))),
        }
    }

    fn process_server_hello(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        let sh = decode_server_hello(msg.body())?;

        let version = TlsVersion::from_wire(sh.server_version)
            .filter(|v| *v <= self.client_version)
            .ok_or_else(|| {
                TlsError::protocol_version(format!(
                    "server chose version {:#06x}",
                    sh.server_version
                ))
            })?;
        if !self.offered_suites.contains(&sh.cipher_suite) {
            return Err(TlsError::illegal_parameter(format!(
                "server chose suite {:#06x} that was not offered",
                sh.cipher_suite.0
            )));
        }
        let params = CipherSuiteParams::from_suite(sh.cipher_suite)?;
        if !params.supports_version(version) {
            return Err(TlsError::illegal_parameter(format!(
                "{} is not valid for TLS {}",
                params.name(),
                version.as_str()
            )));
        }
        if sh.compression_method != COMPRESSION_NULL {
            return Err(TlsError::illegal_parameter("server chose compression"));
        }
        let offered = OfferedExtensions::from_extensions(&sh.extensions)?;
        if params.is_ecdhe() && offered.point_formats.is_some() && !offered.offers_uncompressed()
        {
            return Err(TlsError::illegal_parameter(
                "server does not accept uncompressed points",
            ));
        }

        session.transcript.update(&msg.raw);
        session.duplex.server.set_random(sh.random);
        session.version = version;
        session.session_id = sh.session_id;
        debug!(
            "server hello: TLS {} {} (max offered TLS {})",
            version.as_str(),
            params.name(),
            config.max_version.as_str()
        );
        session.cipher_suite = Some(params);
        self.state = ClientState::WaitCertificate;
        Ok(())
    }

    fn process_certificate(
        &mut self,
        session: &mut Session,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        let chain = decode_certificate(msg.body())?;
        let leaf = chain
            .first()
            .ok_or_else(|| TlsError::handshake_failure("empty server certificate chain"))?;
        let info = parse_certificate(leaf)
            .map_err(|e| TlsError::fatal(AlertDescription::BadCertificate, e.to_string()))?;
        let key = info.rsa_public_key().map_err(|_| {
            TlsError::fatal(
                AlertDescription::UnsupportedCertificate,
                "server certificate does not carry an RSA key",
            )
        })?;
        debug!("server certificate: {}", info.subject);

        session.transcript.update(&msg.raw);
        session.peer_certificates = chain;
        self.server_key = Some(key);
        self.state = if session.params()?.kx_alg == KeyExchangeAlg::Ecdhe {
            ClientState::WaitServerKeyExchange
        } else {
            ClientState::WaitServerHelloDone
        };
        Ok(())
    }

    fn process_server_key_exchange(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        let ske = decode_server_key_exchange(msg.body(), session.version == TlsVersion::Tls12)?;
        if !config.supported_groups.contains(&ske.named_curve) || ske.named_curve.curve().is_none()
        {
            return Err(TlsError::illegal_parameter(format!(
                "server chose curve {:#06x} that was not offered",
                ske.named_curve.0
            )));
        }
        if let Some(scheme) = ske.signature_scheme {
            let offered = &config.signature_algorithms;
            let acceptable = if offered.is_empty() {
                scheme == SignatureScheme::RSA_PKCS1_SHA1
            } else {
                offered.contains(&scheme)
            };
            if !acceptable {
                return Err(TlsError::illegal_parameter(format!(
                    "server signed with {:#06x} that was not offered",
                    scheme.0
                )));
            }
        }

        if config.verify_server_key_exchange {
            let key = self
                .server_key
                .as_ref()
                .ok_or_else(|| TlsError::internal_error("server key missing"))?;
            let signed = build_ske_signed_data(
                &session.client_random(),
                &session.server_random(),
                &ske.params(),
            );
            verify_ske_signature(key, ske.signature_scheme, &signed, &ske.signature)?;
        }

        session.transcript.update(&msg.raw);
        session.negotiated_group = Some(ske.named_curve);
        session.signature_scheme = ske.signature_scheme;
        self.server_kx = Some(ske);
        self.state = ClientState::WaitServerHelloDone;
        Ok(())
    }

    /// Answer ServerHelloDone with ClientKeyExchange, ChangeCipherSpec and
    /// Finished.
    fn process_server_hello_done(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        if !msg.body().is_empty() {
            return Err(TlsError::illegal_parameter("ServerHelloDone has a body"));
        }
        session.transcript.update(&msg.raw);

        let params = session.params()?.clone();
        let (pre_master_secret, cke) = match params.kx_alg {
            KeyExchangeAlg::Rsa => {
                let key = self
                    .server_key
                    .as_ref()
                    .ok_or_else(|| TlsError::internal_error("server key missing"))?;
                let mut pms = Zeroizing::new(vec![0u8; 48]);
                pms[..2].copy_from_slice(&self.client_version.wire().to_be_bytes());
                fill_random(&mut pms[2..])?;
                let encrypted = key.encrypt_pkcs1(&pms)?;
                (pms, encode_client_key_exchange_rsa(&encrypted))
            }
            KeyExchangeAlg::Ecdhe => {
                let ske = self
                    .server_kx
                    .as_ref()
                    .ok_or_else(|| TlsError::internal_error("ServerKeyExchange missing"))?;
                let kx = KeyExchange::generate(ske.named_curve)?;
                let shared = kx.compute_shared_secret(&ske.public_key)?;
                (shared, encode_client_key_exchange_ecdhe(kx.public_key_bytes()))
            }
        };
        session.send_handshake(&cke)?;

        let alg = session.prf_algorithm();
        let client_random = session.client_random();
        let server_random = session.server_random();
        let master_secret =
            derive_master_secret(alg, &pre_master_secret, &client_random, &server_random)?;
        log_master_secret(config, &client_random, &master_secret);
        let key_block =
            derive_key_block(alg, &master_secret, &server_random, &client_random, &params)?;
        session.install_keys(key_block)?;

        session.send_change_cipher_spec()?;
        let verify_data = compute_verify_data(
            alg,
            &master_secret,
            CLIENT_FINISHED_LABEL,
            &session.transcript.current_hash(alg),
        )?;
        session.set_master_secret(master_secret);
        session.send_handshake(&encode_finished(&verify_data))?;

        self.state = ClientState::WaitChangeCipherSpec;
        Ok(())
    }

    fn process_finished(
        &mut self,
        session: &mut Session,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        let received = decode_finished(msg.body(), VERIFY_DATA_LEN)?;
        let alg = session.prf_algorithm();
        let master_secret = session
            .master_secret()
            .ok_or_else(|| TlsError::internal_error("master secret missing"))?;
        let expected = compute_verify_data(
            alg,
            master_secret,
            SERVER_FINISHED_LABEL,
            &session.transcript.current_hash(alg),
        )?;
        if !bool::from(received.ct_eq(&expected)) {
            return Err(TlsError::bad_record_mac("server Finished verify_data mismatch"));
        }

        session.transcript.update(&msg.raw);
        session.handshake_complete = true;
        self.state = ClientState::Connected;
        debug!(
            "client handshake complete: TLS {} {}",
            session.version.as_str(),
            session.params()?.name()
        );
        Ok(())
    }
}

//! Server handshake state machine (RSA and ECDHE_RSA key exchange).

use super::codec::{
    decode_client_hello, decode_finished, encode_certificate, encode_finished,
    encode_server_hello, encode_server_hello_done, ServerHello, COMPRESSION_NULL,
};
use super::codec_kx::{
    build_ske_params, build_ske_signed_data, decode_client_key_exchange_ecdhe,
    decode_client_key_exchange_rsa, encode_server_key_exchange, ServerKeyExchange,
};
use super::key_exchange::KeyExchange;
use super::signing::{select_signature_scheme, sign_ske_data};
use super::{HandshakeMessage, HandshakeType};
use crate::config::TlsConfig;
use crate::crypt::key_schedule::{
    compute_verify_data, derive_key_block, derive_master_secret, CLIENT_FINISHED_LABEL,
    SERVER_FINISHED_LABEL, VERIFY_DATA_LEN,
};
use crate::crypt::keylog::log_master_secret;
use crate::crypt::{negotiate_cipher_suite, KeyExchangeAlg};
use crate::extensions::codec::build_ec_point_formats;
use crate::extensions::{OfferedExtensions, POINT_FORMAT_UNCOMPRESSED};
use crate::session::Session;
use crate::TlsVersion;
use log::{debug, trace};
use subtle::ConstantTimeEq;
use tlsengine_crypto::random::random_bytes;
use tlsengine_types::TlsError;
use zeroize::Zeroizing;

/// Length of an RSA premaster secret.
const PRE_MASTER_SECRET_LEN: usize = 48;

/// Server handshake states, named by the message expected next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    WaitClientHello,
    WaitClientKeyExchange,
    WaitChangeCipherSpec,
    WaitFinished,
    Connected,
}

/// Server side of the handshake.
pub struct ServerHandshake {
    state: ServerState,
    /// Version the client offered, checked against the RSA premaster secret.
    client_version: u16,
    key_exchange: Option<KeyExchange>,
}

impl Default for ServerHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerHandshake {
    pub fn new() -> Self {
        Self {
            state: ServerState::WaitClientHello,
            client_version: 0,
            key_exchange: None,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn expects_change_cipher_spec(&self) -> bool {
        self.state == ServerState::WaitChangeCipherSpec
    }

    pub fn process_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        if self.state != ServerState::WaitChangeCipherSpec {
            return Err(TlsError::unexpected_message("unexpected ChangeCipherSpec"));
        }
        self.state = ServerState::WaitFinished;
        Ok(())
    }

    pub fn handle_message(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        match (self.state, msg.msg_type) {
            (ServerState::WaitClientHello, HandshakeType::ClientHello) => {
                self.process_client_hello(session, config, msg)
            }
            (ServerState::WaitClientKeyExchange, HandshakeType::ClientKeyExchange) => {
                self.process_client_key_exchange(session, config, msg)
            }
            (ServerState::WaitFinished, HandshakeType::Finished) => {
                self.process_finished(session, msg)
            }
            (state, msg_type) => Err(TlsError::unexpected_message(format!(
                "{msg_type:?} while in {state:?}"
            ))),
        }
    }

    /// Negotiate and answer with ServerHello, Certificate, ServerKeyExchange
    /// (ECDHE only) and ServerHelloDone.
    fn process_client_hello(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        let ch = decode_client_hello(msg.body())?;

        let [major, minor] = ch.client_version.to_be_bytes();
        if major != 3 || minor < 2 {
            return Err(TlsError::protocol_version(format!(
                "client offered version {:#06x}",
                ch.client_version
            )));
        }
        let offered_version = if minor == 2 {
            TlsVersion::Tls11
        } else {
            TlsVersion::Tls12
        };
        let version = offered_version.min(config.max_version);

        if !ch.compression_methods.contains(&COMPRESSION_NULL) {
            return Err(TlsError::handshake_failure(
                "client does not offer null compression",
            ));
        }

        let offered = OfferedExtensions::from_extensions(&ch.extensions)?;
        let group = offered.select_group(&config.supported_groups);
        let ecdhe_usable = group.is_some() && offered.offers_uncompressed();
        let params =
            negotiate_cipher_suite(&ch.cipher_suites, &config.cipher_suites, version, ecdhe_usable)?;
        let scheme = if params.is_ecdhe() {
            select_signature_scheme(version, offered.signature_algorithms.as_deref())?
        } else {
            None
        };
        let key = config
            .private_key
            .as_ref()
            .ok_or_else(|| TlsError::internal_error("server private key missing"))?;

        session.transcript.update(&msg.raw);
        session.duplex.client.set_random(ch.random);
        session.version = version;
        session.session_id = ch.session_id;
        debug!(
            "client hello: offered {:#06x}, negotiated TLS {} {}",
            ch.client_version,
            version.as_str(),
            params.name()
        );
        session.cipher_suite = Some(params.clone());
        self.client_version = ch.client_version;

        let extensions = if params.is_ecdhe() {
            vec![build_ec_point_formats(&[POINT_FORMAT_UNCOMPRESSED])]
        } else {
            Vec::new()
        };
        let sh = ServerHello {
            server_version: version.wire(),
            random: session.server_random(),
            session_id: session.session_id.clone(),
            cipher_suite: params.suite,
            compression_method: COMPRESSION_NULL,
            extensions,
        };
        session.send_handshake(&encode_server_hello(&sh))?;
        session.send_handshake(&encode_certificate(&config.certificate_chain))?;

        if let (KeyExchangeAlg::Ecdhe, Some(group)) = (params.kx_alg, group) {
            let kx = KeyExchange::generate(group)?;
            let ske_params = build_ske_params(group, kx.public_key_bytes());
            let signed = build_ske_signed_data(
                &session.client_random(),
                &session.server_random(),
                &ske_params,
            );
            let ske = ServerKeyExchange {
                named_curve: group,
                public_key: kx.public_key_bytes().to_vec(),
                signature_scheme: scheme,
                signature: sign_ske_data(key, scheme, &signed)?,
            };
            session.send_handshake(&encode_server_key_exchange(&ske))?;
            session.negotiated_group = Some(group);
            session.signature_scheme = scheme;
            self.key_exchange = Some(kx);
            trace!("server key exchange on group {:#06x}", group.0);
        }

        session.send_handshake(&encode_server_hello_done())?;
        self.state = ServerState::WaitClientKeyExchange;
        Ok(())
    }

    fn process_client_key_exchange(
        &mut self,
        session: &mut Session,
        config: &TlsConfig,
        msg: &HandshakeMessage,
    ) -> Result<(), TlsError> {
        let params = session.params()?.clone();
        let pre_master_secret = match params.kx_alg {
            KeyExchangeAlg::Rsa => {
                let encrypted = decode_client_key_exchange_rsa(msg.body())?;
                let key = config
                    .private_key
                    .as_ref()
                    .ok_or_else(|| TlsError::internal_error("server private key missing"))?;
                // RFC 5246 §7.4.7.1: carry on with a random secret so the
                // failure only shows at Finished.
                let fallback = Zeroizing::new(random_bytes(PRE_MASTER_SECRET_LEN)?);
                match key.decrypt_pkcs1(encrypted).map(Zeroizing::new) {
                    Ok(pms)
                        if pms.len() == PRE_MASTER_SECRET_LEN
                            && pms[..2] == self.client_version.to_be_bytes() =>
                    {
                        pms
                    }
                    _ => {
                        debug!("RSA premaster secret rejected, using random fallback");
                        fallback
                    }
                }
            }
            KeyExchangeAlg::Ecdhe => {
                let point = decode_client_key_exchange_ecdhe(msg.body())?;
                let kx = self
                    .key_exchange
                    .take()
                    .ok_or_else(|| TlsError::internal_error("ephemeral key missing"))?;
                kx.compute_shared_secret(point)?
            }
        };
        session.transcript.update(&msg.raw);

        let alg = session.prf_algorithm();
        let client_random = session.client_random();
        let server_random = session.server_random();
        let master_secret =
            derive_master_secret(alg, &pre_master_secret, &client_random, &server_random)?;
        log_master_secret(config, &client_random, &master_secret);
        let key_block =
            derive_key_block(alg, &master_secret, &server_random, &client_random, &params)?;
        session.install_keys(key_block)?;
        session.set_master_secret(master_secret);

        self.state = ServerState::WaitChangeCipherSpec;
        Ok(())
    }

    /// Verify the client Finished, then answer with ChangeCipherSpec and
    /// Finished.
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
            CLIENT_FINISHED_LABEL,
            &session.transcript.current_hash(alg),
        )?;
        if !bool::from(received.ct_eq(&expected)) {
            return Err(TlsError::bad_record_mac("client Finished verify_data mismatch"));
        }
        session.transcript.update(&msg.raw);

        session.send_change_cipher_spec()?;
        let master_secret = session
            .master_secret()
            .ok_or_else(|| TlsError::internal_error("master secret missing"))?;
        let verify_data = compute_verify_data(
            alg,
            master_secret,
            SERVER_FINISHED_LABEL,
            &session.transcript.current_hash(alg),
        )?;
        session.send_handshake(&encode_finished(&verify_data))?;

        session.handshake_complete = true;
        self.state = ServerState::Connected;
        debug!(
            "server handshake complete: TLS {} {}",
            session.version.as_str(),
            session.params()?.name()
        );
        Ok(())
    }
}

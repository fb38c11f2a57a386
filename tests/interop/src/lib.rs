//! Integration tests for tlsengine.
//! Full client/server handshakes through the public API, in memory and over
//! TCP loopback.

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use tlsengine::crypt::NamedGroup;
    use tlsengine::{
        AlertDescription, CipherSuite, TlsConfig, TlsEngine, TlsError, TlsRole, TlsVersion,
    };

    const SERVER_CERT: &str = include_str!("../../../testdata/server.crt");
    const SERVER_KEY: &str = include_str!("../../../testdata/server.key");
    const SERVER_KEY_PK8: &str = include_str!("../../../testdata/server.pk8.key");
    const SERVER_KEY_ENC: &str = include_str!("../../../testdata/server.enc.key");
    const OTHER_KEY: &str = include_str!("../../../testdata/other.key");

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn server_config(key_pem: &str, passphrase: Option<&str>) -> TlsConfig {
        TlsConfig::builder()
            .role(TlsRole::Server)
            .identity_from_pem(SERVER_CERT, key_pem, passphrase)
            .unwrap()
            .build()
    }

    fn client_config(suites: &[CipherSuite], version: TlsVersion) -> TlsConfig {
        TlsConfig::builder()
            .role(TlsRole::Client)
            .max_version(version)
            .cipher_suites(suites)
            .build()
    }

    /// Shuttle bytes between two engines until neither has anything to say.
    fn run_in_memory(client: &mut TlsEngine, server: &mut TlsEngine) -> Result<(), TlsError> {
        loop {
            let to_server = client.decode()?;
            if !to_server.is_empty() {
                server.encode(&to_server)?;
            }
            let to_client = server.decode()?;
            if !to_client.is_empty() {
                client.encode(&to_client)?;
            }
            if to_server.is_empty() && to_client.is_empty() {
                return Ok(());
            }
        }
    }

    /// Drive `engine`'s handshake over a blocking stream.
    fn handshake_over(engine: &mut TlsEngine, stream: &mut TcpStream) {
        let mut buf = [0u8; 4096];
        loop {
            let out = engine.decode().unwrap();
            if !out.is_empty() {
                stream.write_all(&out).unwrap();
            }
            if engine.is_handshaked() {
                return;
            }
            let n = stream.read(&mut buf).unwrap();
            assert!(n > 0, "peer closed during handshake");
            engine.encode(&buf[..n]).unwrap();
        }
    }

    fn send_over(engine: &mut TlsEngine, stream: &mut TcpStream, data: &[u8]) {
        engine.output(data, false).unwrap();
        stream.write_all(&engine.decode().unwrap()).unwrap();
    }

    fn receive_over(engine: &mut TlsEngine, stream: &mut TcpStream, want: usize) -> Vec<u8> {
        let mut buf = [0u8; 4096];
        let mut got = Vec::new();
        while got.len() < want {
            let n = stream.read(&mut buf).unwrap();
            assert!(n > 0, "peer closed early");
            engine.encode(&buf[..n]).unwrap();
            got.extend_from_slice(&engine.input());
        }
        got
    }

    /// Read until the peer's close_notify has been processed.
    fn wait_for_close(engine: &mut TlsEngine, stream: &mut TcpStream) {
        let mut buf = [0u8; 1024];
        while !engine.is_closed() {
            let n = stream.read(&mut buf).unwrap();
            assert!(n > 0, "transport closed before close_notify");
            engine.encode(&buf[..n]).unwrap();
        }
    }

    fn connect(addr: std::net::SocketAddr) -> TcpStream {
        let stream = TcpStream::connect_timeout(&addr, Duration::from_secs(5)).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        stream
    }

    // -------------------------------------------------------
    // 1. RSA key exchange, AES-128-CBC-SHA, TLS 1.2
    // -------------------------------------------------------
    #[test]
    fn test_rsa_cbc_ping() {
        init_logging();
        let mut client = TlsEngine::new(client_config(
            &[CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA],
            TlsVersion::Tls12,
        ))
        .unwrap();
        let mut server = TlsEngine::new(server_config(SERVER_KEY, None)).unwrap();
        run_in_memory(&mut client, &mut server).unwrap();
        assert!(client.is_handshaked());
        assert!(server.is_handshaked());

        client.output(b"ping", false).unwrap();
        run_in_memory(&mut client, &mut server).unwrap();
        assert_eq!(server.input(), b"ping");
    }

    // -------------------------------------------------------
    // 2. ECDHE-RSA, AES-256-GCM-SHA384 over secp256r1
    // -------------------------------------------------------
    #[test]
    fn test_ecdhe_gcm_sha384() {
        init_logging();
        let config = TlsConfig::builder()
            .cipher_suites(&[CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384])
            .supported_groups(&[NamedGroup::SECP256R1])
            .build();
        let mut client = TlsEngine::new(config).unwrap();
        let mut server = TlsEngine::new(server_config(SERVER_KEY, None)).unwrap();
        run_in_memory(&mut client, &mut server).unwrap();

        let info = client.connection_info().unwrap();
        assert_eq!(info.protocol_version(), TlsVersion::Tls12);
        assert_eq!(info.negotiated_group(), Some(NamedGroup::SECP256R1));
        assert_eq!(info.peer_certificates_pem()[0].trim_end(), SERVER_CERT.trim_end());
        assert_eq!(info.master_secret().map(<[u8]>::len), Some(48));
    }

    // -------------------------------------------------------
    // 3. Server identities from PKCS#8 and encrypted PKCS#8
    // -------------------------------------------------------
    #[test]
    fn test_server_key_formats() {
        init_logging();
        for config in [
            server_config(SERVER_KEY_PK8, None),
            server_config(SERVER_KEY_ENC, Some("changeit")),
        ] {
            let mut client = TlsEngine::new(client_config(
                &[CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256],
                TlsVersion::Tls12,
            ))
            .unwrap();
            let mut server = TlsEngine::new(config).unwrap();
            run_in_memory(&mut client, &mut server).unwrap();
            assert!(client.is_handshaked());
        }
    }

    #[test]
    fn test_wrong_passphrase() {
        let err = TlsConfig::builder()
            .role(TlsRole::Server)
            .identity_from_pem(SERVER_CERT, SERVER_KEY_ENC, Some("wrong"))
            .unwrap_err();
        assert!(matches!(err, TlsError::InvalidConfig(_)));
    }

    // -------------------------------------------------------
    // 4. Certificate and key that do not belong together
    // -------------------------------------------------------
    #[test]
    fn test_mismatched_key_fails_ske_verification() {
        init_logging();
        let mut client = TlsEngine::new(client_config(
            &[CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA],
            TlsVersion::Tls12,
        ))
        .unwrap();
        let mut server = TlsEngine::new(server_config(OTHER_KEY, None)).unwrap();
        let err = run_in_memory(&mut client, &mut server).unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::HandshakeFailure));
        assert!(client.is_closed());
        // The alert reaches the server, which does not answer it.
        let err = server.encode(&client.decode().unwrap()).unwrap_err();
        assert!(err.is_from_peer());
        assert!(server.decode().unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_key_rsa_fails_at_finished() {
        init_logging();
        let mut client = TlsEngine::new(client_config(
            &[CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA],
            TlsVersion::Tls12,
        ))
        .unwrap();
        let mut server = TlsEngine::new(server_config(OTHER_KEY, None)).unwrap();
        let err = run_in_memory(&mut client, &mut server).unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::BadRecordMac));
        assert!(server.is_closed());
        assert!(!server.is_handshaked());
    }

    #[test]
    fn test_unverified_server_key_exchange() {
        let config = TlsConfig::builder()
            .cipher_suites(&[CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256])
            .verify_server_key_exchange(false)
            .build();
        let mut client = TlsEngine::new(config).unwrap();
        let mut server = TlsEngine::new(server_config(OTHER_KEY, None)).unwrap();
        run_in_memory(&mut client, &mut server).unwrap();
        assert!(client.is_handshaked());
    }

    // -------------------------------------------------------
    // 5. Version negotiation
    // -------------------------------------------------------
    #[test]
    fn test_tls11_client_against_tls12_server() {
        init_logging();
        let mut client =
            TlsEngine::new(TlsConfig::builder().max_version(TlsVersion::Tls11).build()).unwrap();
        let mut server = TlsEngine::new(server_config(SERVER_KEY, None)).unwrap();
        run_in_memory(&mut client, &mut server).unwrap();
        let info = server.connection_info().unwrap();
        assert_eq!(info.protocol_version(), TlsVersion::Tls11);
        assert_eq!(info.cipher_suite(), CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA);
    }

    #[test]
    fn test_tls11_server_caps_version() {
        let server_config = TlsConfig::builder()
            .role(TlsRole::Server)
            .max_version(TlsVersion::Tls11)
            .identity_from_pem(SERVER_CERT, SERVER_KEY, None)
            .unwrap()
            .build();
        let mut client = TlsEngine::new(TlsConfig::builder().build()).unwrap();
        let mut server = TlsEngine::new(server_config).unwrap();
        run_in_memory(&mut client, &mut server).unwrap();
        assert_eq!(client.version(), TlsVersion::Tls11);
        assert_eq!(
            client.connection_info().unwrap().cipher_suite(),
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA
        );
    }

    #[test]
    fn test_no_common_suite() {
        let mut client = TlsEngine::new(client_config(
            &[CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256],
            TlsVersion::Tls12,
        ))
        .unwrap();
        let server_config = TlsConfig::builder()
            .role(TlsRole::Server)
            .cipher_suites(&[CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA])
            .identity_from_pem(SERVER_CERT, SERVER_KEY, None)
            .unwrap()
            .build();
        let mut server = TlsEngine::new(server_config).unwrap();
        let err = run_in_memory(&mut client, &mut server).unwrap_err();
        assert_eq!(err.description(), Some(AlertDescription::HandshakeFailure));
        assert!(server.is_closed());

        let err = client.encode(&server.decode().unwrap()).unwrap_err();
        assert!(err.is_from_peer());
        assert_eq!(err.description(), Some(AlertDescription::HandshakeFailure));
    }

    // -------------------------------------------------------
    // 6. TCP loopback: TLS 1.2 RSA AES-256-CBC-SHA256
    // -------------------------------------------------------
    #[test]
    fn test_tcp_loopback_rsa_cbc() {
        init_logging();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server_config = server_config(SERVER_KEY, None);

        let server_handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(10)))
                .unwrap();
            let mut engine = TlsEngine::new(server_config).unwrap();
            handshake_over(&mut engine, &mut stream);

            let msg = receive_over(&mut engine, &mut stream, 13);
            assert_eq!(msg, b"RSA over TCP!");
            send_over(&mut engine, &mut stream, b"RSA confirmed!");
            wait_for_close(&mut engine, &mut stream);
        });

        let mut stream = connect(addr);
        let mut engine = TlsEngine::new(client_config(
            &[CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA256],
            TlsVersion::Tls12,
        ))
        .unwrap();
        handshake_over(&mut engine, &mut stream);
        send_over(&mut engine, &mut stream, b"RSA over TCP!");
        assert_eq!(receive_over(&mut engine, &mut stream, 14), b"RSA confirmed!");

        engine.close().unwrap();
        stream.write_all(&engine.decode().unwrap()).unwrap();
        server_handle.join().unwrap();
    }

    // -------------------------------------------------------
    // 7. TCP loopback: TLS 1.1 ECDHE, large payload, close_notify
    // -------------------------------------------------------
    #[test]
    fn test_tcp_loopback_tls11_large_payload() {
        init_logging();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server_config = server_config(SERVER_KEY, None);
        let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 256) as u8).collect();
        let expected = payload.clone();

        let server_handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(10)))
                .unwrap();
            let mut engine = TlsEngine::new(server_config).unwrap();
            handshake_over(&mut engine, &mut stream);
            let got = receive_over(&mut engine, &mut stream, expected.len());
            assert_eq!(got, expected);
            wait_for_close(&mut engine, &mut stream);
        });

        let mut stream = connect(addr);
        let mut engine = TlsEngine::new(client_config(
            &[CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA],
            TlsVersion::Tls11,
        ))
        .unwrap();
        handshake_over(&mut engine, &mut stream);
        assert_eq!(engine.version(), TlsVersion::Tls11);
        send_over(&mut engine, &mut stream, &payload);
        engine.close().unwrap();
        stream.write_all(&engine.decode().unwrap()).unwrap();
        server_handle.join().unwrap();
    }
}

#![no_main]
use libfuzzer_sys::fuzz_target;
use tlsengine::handshake::{codec, codec_kx};
use tlsengine::{TlsConfig, TlsEngine, TlsRole};

const CERT_PEM: &str = include_str!("../../testdata/server.crt");
const KEY_PEM: &str = include_str!("../../testdata/server.key");

fuzz_target!(|data: &[u8]| {
    if data.len() >= codec::HANDSHAKE_HEADER_LEN {
        let body = &data[codec::HANDSHAKE_HEADER_LEN..];
        let _ = codec::decode_client_hello(body);
        let _ = codec::decode_server_hello(body);
        let _ = codec::decode_certificate(body);
        let _ = codec_kx::decode_server_key_exchange(body, data[0] & 1 == 1);
    }

    let Ok(builder) = TlsConfig::builder()
        .role(TlsRole::Server)
        .identity_from_pem(CERT_PEM, KEY_PEM, None)
    else {
        return;
    };
    let Ok(mut server) = TlsEngine::new(builder.build()) else {
        return;
    };
    let _ = server.encode(data);
    let _ = server.decode();

    let Ok(mut client) = TlsEngine::new(TlsConfig::builder().build()) else {
        return;
    };
    let _ = client.decode();
    let _ = client.encode(data);
});

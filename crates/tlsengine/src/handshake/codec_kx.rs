//! Key exchange messages: ServerKeyExchange and ClientKeyExchange
//! (RFC 4492 §5.4, §5.7; RFC 5246 §7.4.3, §7.4.7).

use super::codec::{wrap_handshake, Reader};
use super::HandshakeType;
use crate::crypt::{NamedGroup, SignatureScheme};
use tlsengine_types::TlsError;

/// ECCurveType value for named curves.
pub const CURVE_TYPE_NAMED_CURVE: u8 = 3;

/// ECDHE ServerKeyExchange.
///
/// `signature_scheme` is present on TLS 1.2 only; TLS 1.1 carries a bare
/// MD5||SHA-1 RSA signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerKeyExchange {
    pub named_curve: NamedGroup,
    /// Server's ephemeral public key (uncompressed point).
    pub public_key: Vec<u8>,
    pub signature_scheme: Option<SignatureScheme>,
    pub signature: Vec<u8>,
}

impl ServerKeyExchange {
    /// The signed `ServerECDHParams` portion.
    pub fn params(&self) -> Vec<u8> {
        build_ske_params(self.named_curve, &self.public_key)
    }
}

/// `curve_type(1) || named_curve(2) || point_len(1) || point`
pub fn build_ske_params(named_curve: NamedGroup, public_key: &[u8]) -> Vec<u8> {
    let mut params = Vec::with_capacity(4 + public_key.len());
    params.push(CURVE_TYPE_NAMED_CURVE);
    params.extend_from_slice(&named_curve.0.to_be_bytes());
    params.push(public_key.len() as u8);
    params.extend_from_slice(public_key);
    params
}

/// `client_random(32) || server_random(32) || params`
pub fn build_ske_signed_data(
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    params: &[u8],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(64 + params.len());
    data.extend_from_slice(client_random);
    data.extend_from_slice(server_random);
    data.extend_from_slice(params);
    data
}

pub fn encode_server_key_exchange(ske: &ServerKeyExchange) -> Vec<u8> {
    let params = ske.params();
    let mut body = Vec::with_capacity(params.len() + 4 + ske.signature.len());
    body.extend_from_slice(&params);
    if let Some(scheme) = ske.signature_scheme {
        body.extend_from_slice(&scheme.0.to_be_bytes());
    }
    body.extend_from_slice(&(ske.signature.len() as u16).to_be_bytes());
    body.extend_from_slice(&ske.signature);
    wrap_handshake(HandshakeType::ServerKeyExchange, &body)
}

/// Decode an ECDHE ServerKeyExchange body.
///
/// `with_scheme` selects the TLS 1.2 layout with the two-byte
/// SignatureAndHashAlgorithm before the signature.
pub fn decode_server_key_exchange(
    body: &[u8],
    with_scheme: bool,
) -> Result<ServerKeyExchange, TlsError> {
    let mut r = Reader::new(body, "ServerKeyExchange");
    let curve_type = r.u8()?;
    if curve_type != CURVE_TYPE_NAMED_CURVE {
        return Err(r.err("only named curves are supported"));
    }
    let named_curve = NamedGroup(r.u16()?);
    let public_key = r.vec_u8()?;
    if public_key.is_empty() {
        return Err(r.err("empty public key"));
    }
    let public_key = public_key.to_vec();
    let signature_scheme = if with_scheme {
        Some(SignatureScheme(r.u16()?))
    } else {
        None
    };
    let signature = r.vec_u16()?.to_vec();
    r.finish()?;
    Ok(ServerKeyExchange {
        named_curve,
        public_key,
        signature_scheme,
        signature,
    })
}

/// RSA ClientKeyExchange: `u16 len || EncryptedPreMasterSecret`.
pub fn encode_client_key_exchange_rsa(encrypted_pms: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + encrypted_pms.len());
    body.extend_from_slice(&(encrypted_pms.len() as u16).to_be_bytes());
    body.extend_from_slice(encrypted_pms);
    wrap_handshake(HandshakeType::ClientKeyExchange, &body)
}

pub fn decode_client_key_exchange_rsa(body: &[u8]) -> Result<&[u8], TlsError> {
    let mut r = Reader::new(body, "ClientKeyExchange");
    let encrypted = r.vec_u16()?;
    r.finish()?;
    if encrypted.is_empty() {
        return Err(r.err("empty encrypted premaster secret"));
    }
    Ok(encrypted)
}

/// ECDHE ClientKeyExchange: `u8 len || point`.
pub fn encode_client_key_exchange_ecdhe(public_key: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(1 + public_key.len());
    body.push(public_key.len() as u8);
    body.extend_from_slice(public_key);
    wrap_handshake(HandshakeType::ClientKeyExchange, &body)
}

pub fn decode_client_key_exchange_ecdhe(body: &[u8]) -> Result<&[u8], TlsError> {
    let mut r = Reader::new(body, "ClientKeyExchange");
    let point = r.vec_u8()?;
    r.finish()?;
    if point.is_empty() {
        return Err(r.err("empty public key"));
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(scheme: Option<SignatureScheme>) -> ServerKeyExchange {
        ServerKeyExchange {
            named_curve: NamedGroup::SECP256R1,
            public_key: vec![4; 65],
            signature_scheme: scheme,
            signature: vec![0xEE; 256],
        }
    }

    #[test]
    fn test_ske_tls12_layout() {
        let ske = sample(Some(SignatureScheme::RSA_PKCS1_SHA512));
        let msg = encode_server_key_exchange(&ske);
        let body = &msg[4..];
        assert_eq!(&body[..4], &[3, 0, 23, 65]);
        assert_eq!(&body[69..73], &[6, 1, 1, 0]);
        assert_eq!(decode_server_key_exchange(body, true).unwrap(), ske);
    }

    #[test]
    fn test_ske_tls11_layout() {
        let ske = sample(None);
        let msg = encode_server_key_exchange(&ske);
        let body = &msg[4..];
        assert_eq!(body.len(), 4 + 65 + 2 + 256);
        assert_eq!(decode_server_key_exchange(body, false).unwrap(), ske);
        // The same bytes read with the 1.2 layout do not line up.
        assert!(decode_server_key_exchange(body, true).is_err());
    }

    #[test]
    fn test_ske_rejects_explicit_curves() {
        let mut body = encode_server_key_exchange(&sample(None))[4..].to_vec();
        body[0] = 1;
        assert!(decode_server_key_exchange(&body, false).is_err());
    }

    #[test]
    fn test_signed_data_order() {
        let data = build_ske_signed_data(&[1; 32], &[2; 32], &[3, 0, 24]);
        assert_eq!(&data[..32], &[1; 32]);
        assert_eq!(&data[32..64], &[2; 32]);
        assert_eq!(&data[64..], &[3, 0, 24]);
    }

    #[test]
    fn test_client_key_exchange_bodies() {
        let rsa = encode_client_key_exchange_rsa(&[0xAB; 256]);
        assert_eq!(&rsa[4..6], &[1, 0]);
        assert_eq!(decode_client_key_exchange_rsa(&rsa[4..]).unwrap(), &[0xAB; 256]);

        let ec = encode_client_key_exchange_ecdhe(&[4; 97]);
        assert_eq!(ec[4], 97);
        assert_eq!(decode_client_key_exchange_ecdhe(&ec[4..]).unwrap(), &[4; 97]);

        assert!(decode_client_key_exchange_rsa(&[0, 3, 1]).is_err());
        assert!(decode_client_key_exchange_ecdhe(&[0]).is_err());
    }
}

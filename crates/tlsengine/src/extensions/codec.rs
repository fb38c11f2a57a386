//! Extension wire encoding.
//!
//! Malformed framing is reported as `illegal_parameter`.

use super::{Extension, ExtensionType};
use crate::crypt::{NamedGroup, SignatureScheme};
use tlsengine_types::TlsError;

/// Build the `supported_groups` (`elliptic_curves`) extension.
pub fn build_supported_groups(groups: &[NamedGroup]) -> Extension {
    let mut data = Vec::with_capacity(2 + groups.len() * 2);
    data.extend_from_slice(&((groups.len() * 2) as u16).to_be_bytes());
    for g in groups {
        data.extend_from_slice(&g.0.to_be_bytes());
    }
    Extension {
        extension_type: ExtensionType::SUPPORTED_GROUPS,
        data,
    }
}

/// Build the `ec_point_formats` extension.
pub fn build_ec_point_formats(formats: &[u8]) -> Extension {
    let mut data = Vec::with_capacity(1 + formats.len());
    data.push(formats.len() as u8);
    data.extend_from_slice(formats);
    Extension {
        extension_type: ExtensionType::EC_POINT_FORMATS,
        data,
    }
}

/// Build the `signature_algorithms` extension.
pub fn build_signature_algorithms(schemes: &[SignatureScheme]) -> Extension {
    let mut data = Vec::with_capacity(2 + schemes.len() * 2);
    data.extend_from_slice(&((schemes.len() * 2) as u16).to_be_bytes());
    for s in schemes {
        data.extend_from_slice(&s.0.to_be_bytes());
    }
    Extension {
        extension_type: ExtensionType::SIGNATURE_ALGORITHMS,
        data,
    }
}

fn parse_u16_list(data: &[u8], what: &str) -> Result<Vec<u16>, TlsError> {
    if data.len() < 2 {
        return Err(TlsError::illegal_parameter(format!("{what}: too short")));
    }
    let list_len = u16::from_be_bytes([data[0], data[1]]) as usize;
    if data.len() != 2 + list_len || list_len % 2 != 0 {
        return Err(TlsError::illegal_parameter(format!("{what}: invalid length")));
    }
    Ok(data[2..]
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect())
}

/// Parse `supported_groups`: list_length(2) || group(2)*
pub fn parse_supported_groups(data: &[u8]) -> Result<Vec<NamedGroup>, TlsError> {
    Ok(parse_u16_list(data, "supported_groups")?
        .into_iter()
        .map(NamedGroup)
        .collect())
}

/// Parse `signature_algorithms`: list_length(2) || scheme(2)*
pub fn parse_signature_algorithms(data: &[u8]) -> Result<Vec<SignatureScheme>, TlsError> {
    Ok(parse_u16_list(data, "signature_algorithms")?
        .into_iter()
        .map(SignatureScheme)
        .collect())
}

/// Parse `ec_point_formats`: list_length(1) || format(1)*
pub fn parse_ec_point_formats(data: &[u8]) -> Result<Vec<u8>, TlsError> {
    let Some((&list_len, rest)) = data.split_first() else {
        return Err(TlsError::illegal_parameter("ec_point_formats: empty"));
    };
    if rest.len() != list_len as usize {
        return Err(TlsError::illegal_parameter("ec_point_formats: invalid length"));
    }
    Ok(rest.to_vec())
}

/// Encode an extension block with its two-byte length prefix.
pub fn encode_extensions(exts: &[Extension]) -> Vec<u8> {
    let body_len: usize = exts.iter().map(|e| 4 + e.data.len()).sum();
    let mut out = Vec::with_capacity(2 + body_len);
    out.extend_from_slice(&(body_len as u16).to_be_bytes());
    for ext in exts {
        out.extend_from_slice(&ext.extension_type.0.to_be_bytes());
        out.extend_from_slice(&(ext.data.len() as u16).to_be_bytes());
        out.extend_from_slice(&ext.data);
    }
    out
}

/// Parse the extension block that ends a hello message.
///
/// `data` is everything after the compression field. An empty slice means
/// no extensions were sent. Zero-length extensions are dropped.
pub fn parse_extensions(data: &[u8]) -> Result<Vec<Extension>, TlsError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() < 2 {
        return Err(TlsError::illegal_parameter("extensions: truncated length"));
    }
    let ext_len = u16::from_be_bytes([data[0], data[1]]) as usize;
    if data.len() != 2 + ext_len {
        return Err(TlsError::illegal_parameter("extensions: length mismatch"));
    }

    let mut exts = Vec::new();
    let mut rest = &data[2..];
    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err(TlsError::illegal_parameter("extension header truncated"));
        }
        let extension_type = ExtensionType(u16::from_be_bytes([rest[0], rest[1]]));
        let len = u16::from_be_bytes([rest[2], rest[3]]) as usize;
        if rest.len() < 4 + len {
            return Err(TlsError::illegal_parameter("extension data truncated"));
        }
        if len > 0 {
            exts.push(Extension {
                extension_type,
                data: rest[4..4 + len].to_vec(),
            });
        }
        rest = &rest[4 + len..];
    }
    Ok(exts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlsengine_types::AlertDescription;

    #[test]
    fn test_default_client_extension_bytes() {
        let e = build_ec_point_formats(&[0]);
        assert_eq!(e.data, [1, 0]);
        let g = build_supported_groups(&[NamedGroup::SECP256R1, NamedGroup::SECP384R1]);
        assert_eq!(g.data, [0, 4, 0, 23, 0, 24]);
        let s = build_signature_algorithms(&[
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA256,
        ]);
        assert_eq!(s.data, [0, 6, 6, 1, 5, 1, 4, 1]);
    }

    #[test]
    fn test_block_roundtrip_keeps_order() {
        let exts = vec![
            build_ec_point_formats(&[0]),
            build_supported_groups(&[NamedGroup::SECP384R1]),
        ];
        let wire = encode_extensions(&exts);
        assert_eq!(&wire[..2], &[0, 14]);
        assert_eq!(parse_extensions(&wire).unwrap(), exts);
    }

    #[test]
    fn test_zero_length_extension_skipped() {
        // extended_master_secret (23) with no data, then point formats
        let wire = [0, 10, 0, 23, 0, 0, 0, 11, 0, 2, 1, 0];
        let exts = parse_extensions(&wire).unwrap();
        assert_eq!(exts.len(), 1);
        assert_eq!(exts[0].extension_type, ExtensionType::EC_POINT_FORMATS);
    }

    #[test]
    fn test_malformed_blocks() {
        for wire in [
            &[0u8][..],
            &[0, 5, 0, 11, 0][..],
            &[0, 4, 0, 11, 0, 9][..],
            &[0, 6, 0, 11, 0, 2, 1][..],
        ] {
            let err = parse_extensions(wire).unwrap_err();
            assert_eq!(err.description(), Some(AlertDescription::IllegalParameter));
        }
        assert!(parse_extensions(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lists() {
        assert!(parse_supported_groups(&[0, 3, 0, 23, 0]).is_err());
        assert!(parse_signature_algorithms(&[0, 4, 4, 1]).is_err());
        assert!(parse_ec_point_formats(&[2, 0]).is_err());
        assert_eq!(parse_ec_point_formats(&[2, 0, 1]).unwrap(), vec![0, 1]);
    }
}

//! ClientHello/ServerHello extensions (RFC 4492, RFC 5246 §7.4.1.4).

pub mod codec;

use crate::crypt::{NamedGroup, SignatureScheme};
use tlsengine_types::TlsError;

/// TLS extension type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionType(pub u16);

impl ExtensionType {
    pub const SUPPORTED_GROUPS: Self = Self(10);
    pub const EC_POINT_FORMATS: Self = Self(11);
    pub const SIGNATURE_ALGORITHMS: Self = Self(13);
}

/// EC point format code for uncompressed points.
pub const POINT_FORMAT_UNCOMPRESSED: u8 = 0;

/// A raw TLS extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub data: Vec<u8>,
}

/// A decoded hello extension.
///
/// Types this engine does not interpret are carried as `Unknown` and
/// otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelloExtension {
    SupportedGroups(Vec<NamedGroup>),
    EcPointFormats(Vec<u8>),
    SignatureAlgorithms(Vec<SignatureScheme>),
    Unknown(Extension),
}

impl HelloExtension {
    /// Decode the body of a raw extension.
    pub fn decode(ext: &Extension) -> Result<Self, TlsError> {
        match ext.extension_type {
            ExtensionType::SUPPORTED_GROUPS => {
                codec::parse_supported_groups(&ext.data).map(HelloExtension::SupportedGroups)
            }
            ExtensionType::EC_POINT_FORMATS => {
                codec::parse_ec_point_formats(&ext.data).map(HelloExtension::EcPointFormats)
            }
            ExtensionType::SIGNATURE_ALGORITHMS => codec::parse_signature_algorithms(&ext.data)
                .map(HelloExtension::SignatureAlgorithms),
            _ => Ok(HelloExtension::Unknown(ext.clone())),
        }
    }

    pub fn to_extension(&self) -> Extension {
        match self {
            HelloExtension::SupportedGroups(groups) => codec::build_supported_groups(groups),
            HelloExtension::EcPointFormats(formats) => codec::build_ec_point_formats(formats),
            HelloExtension::SignatureAlgorithms(schemes) => {
                codec::build_signature_algorithms(schemes)
            }
            HelloExtension::Unknown(ext) => ext.clone(),
        }
    }
}

/// What a peer advertised in its hello extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferedExtensions {
    pub groups: Option<Vec<NamedGroup>>,
    pub point_formats: Option<Vec<u8>>,
    pub signature_algorithms: Option<Vec<SignatureScheme>>,
}

impl OfferedExtensions {
    /// Collect the interpreted extensions, ignoring unknown ones.
    pub fn from_extensions(exts: &[Extension]) -> Result<Self, TlsError> {
        let mut offered = Self::default();
        for ext in exts {
            match HelloExtension::decode(ext)? {
                HelloExtension::SupportedGroups(g) => offered.groups = Some(g),
                HelloExtension::EcPointFormats(f) => offered.point_formats = Some(f),
                HelloExtension::SignatureAlgorithms(s) => offered.signature_algorithms = Some(s),
                HelloExtension::Unknown(_) => {}
            }
        }
        Ok(offered)
    }

    /// First group in the peer's order that `supported` also contains.
    pub fn select_group(&self, supported: &[NamedGroup]) -> Option<NamedGroup> {
        self.groups
            .as_ref()?
            .iter()
            .copied()
            .find(|g| supported.contains(g) && g.curve().is_some())
    }

    pub fn offers_uncompressed(&self) -> bool {
        self.point_formats
            .as_ref()
            .is_some_and(|f| f.contains(&POINT_FORMAT_UNCOMPRESSED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_and_unknown() {
        let ext = codec::build_supported_groups(&[NamedGroup::SECP384R1]);
        assert_eq!(
            HelloExtension::decode(&ext).unwrap(),
            HelloExtension::SupportedGroups(vec![NamedGroup::SECP384R1])
        );
        let raw = Extension {
            extension_type: ExtensionType(0xFF01),
            data: vec![0],
        };
        let decoded = HelloExtension::decode(&raw).unwrap();
        assert_eq!(decoded, HelloExtension::Unknown(raw.clone()));
        assert_eq!(decoded.to_extension(), raw);
    }

    #[test]
    fn test_offered_selection() {
        let exts = vec![
            codec::build_ec_point_formats(&[POINT_FORMAT_UNCOMPRESSED]),
            codec::build_supported_groups(&[
                NamedGroup(0x001D),
                NamedGroup::SECP384R1,
                NamedGroup::SECP256R1,
            ]),
            Extension {
                extension_type: ExtensionType(0x0017),
                data: vec![1],
            },
        ];
        let offered = OfferedExtensions::from_extensions(&exts).unwrap();
        assert!(offered.offers_uncompressed());
        assert_eq!(
            offered.select_group(&[NamedGroup::SECP256R1, NamedGroup::SECP384R1]),
            Some(NamedGroup::SECP384R1)
        );
        assert_eq!(offered.select_group(&[NamedGroup(0x001D)]), None);
        assert!(offered.signature_algorithms.is_none());
    }

    #[test]
    fn test_no_point_formats() {
        let offered = OfferedExtensions::default();
        assert!(!offered.offers_uncompressed());
        assert_eq!(offered.select_group(&[NamedGroup::SECP256R1]), None);
    }
}

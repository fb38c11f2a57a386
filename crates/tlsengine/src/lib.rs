#![forbid(unsafe_code)]
#![doc = "Transport-agnostic TLS 1.1/1.2 protocol engine.\n\nThe engine never performs I/O. Feed it bytes received from the peer with\n[`TlsEngine::encode`], collect the bytes to transmit with\n[`TlsEngine::decode`], queue application data with [`TlsEngine::output`] and\nread decrypted application data with [`TlsEngine::input`]."]

pub mod alert;
pub mod config;
pub mod connection;
pub mod connection_info;
pub mod content;
pub mod crypt;
pub mod engine;
pub mod extensions;
pub mod handshake;
pub mod record;
pub mod session;

pub use config::TlsConfig;
pub use connection_info::ConnectionInfo;
pub use engine::TlsEngine;
pub use tlsengine_types::{AlertDescription, AlertLevel, CryptoError, TlsError};

/// TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    Tls11,
    Tls12,
}

impl TlsVersion {
    /// Wire encoding (`major << 8 | minor`).
    pub fn wire(self) -> u16 {
        match self {
            TlsVersion::Tls11 => 0x0302,
            TlsVersion::Tls12 => 0x0303,
        }
    }

    /// Decode a wire version. Only TLS 1.1 and 1.2 are recognised.
    pub fn from_wire(v: u16) -> Option<Self> {
        match v {
            0x0302 => Some(TlsVersion::Tls11),
            0x0303 => Some(TlsVersion::Tls12),
            _ => None,
        }
    }

    /// Human-readable form, e.g. `"1.2"`.
    pub fn as_str(self) -> &'static str {
        match self {
            TlsVersion::Tls11 => "1.1",
            TlsVersion::Tls12 => "1.2",
        }
    }
}

/// TLS cipher suite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite(pub u16);

impl CipherSuite {
    pub const TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384: Self = Self(0xC030);
    pub const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: Self = Self(0xC02F);
    pub const TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA: Self = Self(0xC014);
    pub const TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA: Self = Self(0xC013);
    pub const TLS_RSA_WITH_AES_256_GCM_SHA384: Self = Self(0x009D);
    pub const TLS_RSA_WITH_AES_128_GCM_SHA256: Self = Self(0x009C);
    pub const TLS_RSA_WITH_AES_256_CBC_SHA256: Self = Self(0x003D);
    pub const TLS_RSA_WITH_AES_256_CBC_SHA: Self = Self(0x0035);
    pub const TLS_RSA_WITH_AES_128_CBC_SHA256: Self = Self(0x003C);
    pub const TLS_RSA_WITH_AES_128_CBC_SHA: Self = Self(0x002F);
}

/// The role of a TLS endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRole {
    Client,
    Server,
}

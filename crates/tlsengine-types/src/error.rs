use crate::alert::{AlertDescription, AlertLevel};

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    // General errors
    #[error("invalid argument")]
    InvalidArg,
    #[error("operation not supported")]
    NotSupported,
    #[error("invalid key")]
    InvalidKey,

    // RSA errors
    #[error("rsa: encryption failed")]
    RsaEncryptFail,
    #[error("rsa: decryption failed")]
    RsaDecryptFail,
    #[error("rsa: signing failed")]
    RsaSignFail,
    #[error("rsa: verification failed")]
    RsaVerifyFail,

    // ECC errors
    #[error("ecc: unsupported curve {0:#06x}")]
    EccUnsupportedCurve(u16),
    #[error("ecc: invalid public key")]
    EccInvalidPublicKey,
    #[error("ecc: invalid private key")]
    EccInvalidPrivateKey,

    // Symmetric cipher errors
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("invalid iv length")]
    InvalidIvLength,
    #[error("input is not a multiple of the block size")]
    InvalidBlockLength,
    #[error("aead: tag verification failed")]
    AeadTagVerifyFail,

    // Randomness
    #[error("secure random source unavailable")]
    RandomFailed,

    // Encoding/Decoding errors
    #[error("decode: asn1 buffer failed")]
    DecodeAsn1Fail,
    #[error("decode: pem failed: {0}")]
    DecodePemFail(String),
    #[error("decode: unsupported key format: {0}")]
    UnsupportedKeyFormat(String),
}

/// TLS protocol errors.
///
/// Every protocol failure maps onto a TLS alert. Locally detected failures
/// carry the alert to send plus a context string; failures caused by an alert
/// from the peer are tagged so the engine does not answer them with another
/// alert.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("{level} alert {description}: {context}")]
    Alert {
        level: AlertLevel,
        description: AlertDescription,
        context: String,
    },
    #[error("alert received: {level} {description}")]
    AlertReceived {
        level: AlertLevel,
        description: AlertDescription,
    },
    #[error("handshake not complete")]
    HandshakeNotComplete,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

impl TlsError {
    /// A fatal failure carrying the given alert description.
    pub fn fatal(description: AlertDescription, context: impl Into<String>) -> Self {
        TlsError::Alert {
            level: AlertLevel::Fatal,
            description,
            context: context.into(),
        }
    }

    pub fn unexpected_message(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::UnexpectedMessage, context)
    }

    pub fn bad_record_mac(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::BadRecordMac, context)
    }

    pub fn record_overflow(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::RecordOverflow, context)
    }

    pub fn handshake_failure(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::HandshakeFailure, context)
    }

    pub fn illegal_parameter(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::IllegalParameter, context)
    }

    pub fn internal_error(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::InternalError, context)
    }

    pub fn protocol_version(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::ProtocolVersion, context)
    }

    pub fn no_renegotiation(context: impl Into<String>) -> Self {
        Self::fatal(AlertDescription::NoRenegotiation, context)
    }

    /// The alert that describes this failure, if it has one.
    ///
    /// Crypto back-end failures surface as `internal_error`.
    pub fn alert(&self) -> Option<(AlertLevel, AlertDescription)> {
        match self {
            TlsError::Alert {
                level, description, ..
            }
            | TlsError::AlertReceived { level, description } => Some((*level, *description)),
            TlsError::CryptoError(_) => {
                Some((AlertLevel::Fatal, AlertDescription::InternalError))
            }
            _ => None,
        }
    }

    /// Shorthand for the description half of [`TlsError::alert`].
    pub fn description(&self) -> Option<AlertDescription> {
        self.alert().map(|(_, d)| d)
    }

    /// True when the failure was caused by an alert the peer sent.
    pub fn is_from_peer(&self) -> bool {
        matches!(self, TlsError::AlertReceived { .. })
    }
}

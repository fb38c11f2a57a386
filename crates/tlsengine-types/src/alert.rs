//! TLS alert levels and descriptions (RFC 5246 Section 7.2).

use std::fmt;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

/// Alert description codes defined for TLS 1.1 and 1.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    /// Not sent by TLS 1.1 and later; accepted on receive.
    DecryptionFailed = 21,
    RecordOverflow = 22,
    DecompressionFailure = 30,
    HandshakeFailure = 40,
    NoCertificateReserved = 41,
    BadCertificate = 42,
    UnsupportedCertificate = 43,
    CertificateRevoked = 44,
    CertificateExpired = 45,
    CertificateUnknown = 46,
    IllegalParameter = 47,
    UnknownCa = 48,
    AccessDenied = 49,
    DecodeError = 50,
    DecryptError = 51,
    ExportRestrictionReserved = 60,
    ProtocolVersion = 70,
    InsufficientSecurity = 71,
    InternalError = 80,
    UserCanceled = 90,
    NoRenegotiation = 100,
    UnsupportedExtension = 110,
}

impl AlertLevel {
    /// Convert from u8 to AlertLevel.
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        match v {
            1 => Ok(AlertLevel::Warning),
            2 => Ok(AlertLevel::Fatal),
            _ => Err(v),
        }
    }
}

impl AlertDescription {
    /// Convert from u8 to AlertDescription.
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        use AlertDescription::*;
        Ok(match v {
            0 => CloseNotify,
            10 => UnexpectedMessage,
            20 => BadRecordMac,
            21 => DecryptionFailed,
            22 => RecordOverflow,
            30 => DecompressionFailure,
            40 => HandshakeFailure,
            41 => NoCertificateReserved,
            42 => BadCertificate,
            43 => UnsupportedCertificate,
            44 => CertificateRevoked,
            45 => CertificateExpired,
            46 => CertificateUnknown,
            47 => IllegalParameter,
            48 => UnknownCa,
            49 => AccessDenied,
            50 => DecodeError,
            51 => DecryptError,
            60 => ExportRestrictionReserved,
            70 => ProtocolVersion,
            71 => InsufficientSecurity,
            80 => InternalError,
            90 => UserCanceled,
            100 => NoRenegotiation,
            110 => UnsupportedExtension,
            _ => return Err(v),
        })
    }

    /// The RFC name of this description, e.g. `bad_record_mac`.
    pub fn name(self) -> &'static str {
        use AlertDescription::*;
        match self {
            CloseNotify => "close_notify",
            UnexpectedMessage => "unexpected_message",
            BadRecordMac => "bad_record_mac",
            DecryptionFailed => "decryption_failed",
            RecordOverflow => "record_overflow",
            DecompressionFailure => "decompression_failure",
            HandshakeFailure => "handshake_failure",
            NoCertificateReserved => "no_certificate",
            BadCertificate => "bad_certificate",
            UnsupportedCertificate => "unsupported_certificate",
            CertificateRevoked => "certificate_revoked",
            CertificateExpired => "certificate_expired",
            CertificateUnknown => "certificate_unknown",
            IllegalParameter => "illegal_parameter",
            UnknownCa => "unknown_ca",
            AccessDenied => "access_denied",
            DecodeError => "decode_error",
            DecryptError => "decrypt_error",
            ExportRestrictionReserved => "export_restriction",
            ProtocolVersion => "protocol_version",
            InsufficientSecurity => "insufficient_security",
            InternalError => "internal_error",
            UserCanceled => "user_canceled",
            NoRenegotiation => "no_renegotiation",
            UnsupportedExtension => "unsupported_extension",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => f.write_str("warning"),
            AlertLevel::Fatal => f.write_str("fatal"),
        }
    }
}

impl fmt::Display for AlertDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_level_values() {
        assert_eq!(AlertLevel::Warning as u8, 1);
        assert_eq!(AlertLevel::Fatal as u8, 2);
        assert_eq!(AlertLevel::from_u8(2), Ok(AlertLevel::Fatal));
        assert_eq!(AlertLevel::from_u8(3), Err(3));
    }

    #[test]
    fn test_alert_description_values() {
        assert_eq!(AlertDescription::CloseNotify as u8, 0);
        assert_eq!(AlertDescription::UnexpectedMessage as u8, 10);
        assert_eq!(AlertDescription::BadRecordMac as u8, 20);
        assert_eq!(AlertDescription::RecordOverflow as u8, 22);
        assert_eq!(AlertDescription::HandshakeFailure as u8, 40);
        assert_eq!(AlertDescription::IllegalParameter as u8, 47);
        assert_eq!(AlertDescription::ProtocolVersion as u8, 70);
        assert_eq!(AlertDescription::InternalError as u8, 80);
        assert_eq!(AlertDescription::NoRenegotiation as u8, 100);
    }

    #[test]
    fn test_alert_description_from_u8_all_known() {
        for v in 0u8..=255 {
            if let Ok(desc) = AlertDescription::from_u8(v) {
                assert_eq!(desc as u8, v);
            }
        }
        assert_eq!(AlertDescription::from_u8(86), Err(86));
        assert_eq!(AlertDescription::from_u8(255), Err(255));
    }

    #[test]
    fn test_alert_description_display() {
        assert_eq!(AlertDescription::BadRecordMac.to_string(), "bad_record_mac");
        assert_eq!(AlertDescription::CloseNotify.to_string(), "close_notify");
        assert_eq!(AlertLevel::Fatal.to_string(), "fatal");
    }
}

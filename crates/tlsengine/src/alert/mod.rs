//! TLS alert protocol.

pub use tlsengine_types::{AlertDescription, AlertLevel};
use tlsengine_types::TlsError;

/// A TLS alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub fn new(level: AlertLevel, description: AlertDescription) -> Self {
        Self { level, description }
    }

    pub fn fatal(description: AlertDescription) -> Self {
        Self::new(AlertLevel::Fatal, description)
    }

    pub fn close_notify() -> Self {
        Self::new(AlertLevel::Warning, AlertDescription::CloseNotify)
    }

    /// Two-byte wire form: level, description.
    pub fn encode(&self) -> [u8; 2] {
        [self.level as u8, self.description as u8]
    }

    /// Parse an alert record payload.
    pub fn decode(data: &[u8]) -> Result<Self, TlsError> {
        if data.len() != 2 {
            return Err(TlsError::unexpected_message(format!(
                "alert payload length {}",
                data.len()
            )));
        }
        let level = AlertLevel::from_u8(data[0])
            .map_err(|v| TlsError::illegal_parameter(format!("unknown alert level {v}")))?;
        let description = AlertDescription::from_u8(data[1])
            .map_err(|v| TlsError::illegal_parameter(format!("unknown alert description {v}")))?;
        Ok(Self { level, description })
    }

    pub fn is_close_notify(&self) -> bool {
        self.description == AlertDescription::CloseNotify
    }
}

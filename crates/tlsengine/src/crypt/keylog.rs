//! NSS Key Log Format support (SSLKEYLOGFILE).
//!
//! Emits `CLIENT_RANDOM <client_random_hex> <master_secret_hex>` lines so
//! captured traffic can be decrypted by Wireshark.

use crate::config::TlsConfig;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Format one key log line.
pub fn format_key_log_line(label: &str, client_random: &[u8; 32], secret: &[u8]) -> String {
    format!("{} {} {}", label, to_hex(client_random), to_hex(secret))
}

/// Deliver the master secret to the configured key log callback, if any.
pub fn log_master_secret(config: &TlsConfig, client_random: &[u8; 32], master_secret: &[u8]) {
    if let Some(cb) = &config.key_log_callback {
        cb(&format_key_log_line("CLIENT_RANDOM", client_random, master_secret));
    }
}

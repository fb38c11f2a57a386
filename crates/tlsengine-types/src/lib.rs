#![forbid(unsafe_code)]
#![doc = "Common error types and TLS alert codes for tlsengine."]

pub mod alert;
pub mod error;

pub use alert::*;
pub use error::*;

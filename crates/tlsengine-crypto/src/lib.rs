#![forbid(unsafe_code)]
#![doc = "Cryptographic primitives consumed by the tlsengine protocol core.\n\nEverything here wraps an audited RustCrypto implementation behind a small,\nTLS-agnostic function surface: hashes and HMAC, AES-CBC and AES-GCM, RSA\nPKCS#1 v1.5, ECDH and ECDSA over P-256/P-384, X.509 and PEM handling, and\nthe OS random source."]

pub mod cipher;
pub mod ecdh;
pub mod ecdsa;
pub mod encoding;
pub mod hash;
pub mod random;
pub mod rsa_key;
pub mod x509;

pub use ecdh::{EcdhKeyPair, EllipticCurve};
pub use hash::HashAlgorithm;
pub use rsa_key::{RsaPrivateKey, RsaPublicKey};
pub use tlsengine_types::CryptoError;

//! # Sec Crypto - Trust Substrate Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | RSA PKCS#1 v1.5 / SHA-256 | Identity signatures, secret wrapping |
//! | `symmetric` | AES-256-CBC + HMAC-SHA256 | Session payload protection |
//! | `certificate` | RSA-signed bindings | Entity identities |
//! | `hashing` | BLAKE3 | Certificate fingerprints, transcript framing |
//! | `provider` | Known-answer tests | Once-only self-test |
//!
//! ## Security Properties
//!
//! - **Encrypt-then-MAC**: the MAC is verified in constant time before any
//!   ciphertext is decrypted
//! - **Zeroization**: session keys and exported private keys are wiped on drop
//! - **Canonical encodings**: keys and certificates cross boundaries only as
//!   DER / bincode bytes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod certificate;
pub mod errors;
pub mod hashing;
pub mod provider;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use certificate::Certificate;
pub use errors::CryptoError;
pub use hashing::{blake3_hash, transcript, Fingerprint, Hash};
pub use provider::ensure_initialized;
pub use signatures::{IdentityKeyPair, PublicKey, MIN_KEY_BITS};
pub use symmetric::{random_bytes, SealedPayload, SessionKeys};
pub use zeroize::Zeroizing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Fingerprints
//!
//! BLAKE3 digests used to index certificates. Two certificates are the same
//! identity exactly when their canonical encodings hash to the same value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Concatenate fields as `len (u32 BE) || bytes` so that no two different
/// field lists share an encoding. Both peers sign and verify this layout.
pub fn transcript(parts: &[&[u8]]) -> Vec<u8> {
    let total = parts.iter().map(|p| p.len() + 4).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(&(part.len() as u32).to_be_bytes());
        out.extend_from_slice(part);
    }
    out
}

/// Stable identifier of a certificate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(Hash);

impl Fingerprint {
    /// Fingerprint arbitrary canonical bytes.
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3_hash(bytes))
    }

    /// Fingerprint a list of fields using the [`transcript`] framing.
    pub fn of_parts(parts: &[&[u8]]) -> Self {
        Self::of(&transcript(parts))
    }

    /// Raw digest.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Short hex form for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

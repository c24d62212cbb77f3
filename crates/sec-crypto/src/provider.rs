//! # Provider Initialisation
//!
//! The primitives need no global registration, but the first caller still
//! runs a power-on self-test: one HMAC-SHA256 known-answer vector and an
//! AES-256-CBC round trip. The outcome is computed exactly once and cached,
//! so every entry point can call [`ensure_initialized`] unconditionally.

use crate::symmetric::SessionKeys;
use crate::CryptoError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::OnceLock;

static SELF_TEST: OnceLock<Result<(), CryptoError>> = OnceLock::new();

// RFC 4231, test case 2
const KAT_KEY: &[u8] = b"Jefe";
const KAT_DATA: &[u8] = b"what do ya want for nothing?";
const KAT_MAC: &str = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";

/// Run the self-test on first use; later calls return the cached outcome.
pub fn ensure_initialized() -> Result<(), CryptoError> {
    SELF_TEST
        .get_or_init(|| {
            let outcome = self_test();
            match &outcome {
                Ok(()) => tracing::debug!("crypto provider self-test passed"),
                Err(e) => tracing::error!(error = %e, "crypto provider self-test failed"),
            }
            outcome
        })
        .clone()
}

/// Whether the self-test has already run.
pub fn is_initialized() -> bool {
    SELF_TEST.get().is_some()
}

fn self_test() -> Result<(), CryptoError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(KAT_KEY)
        .map_err(|e| CryptoError::SelfTestFailed(e.to_string()))?;
    mac.update(KAT_DATA);
    let tag = hex::encode(mac.finalize().into_bytes());
    if tag != KAT_MAC {
        return Err(CryptoError::SelfTestFailed(
            "HMAC-SHA256 known answer mismatch".into(),
        ));
    }

    let keys = SessionKeys::generate();
    let probe = b"provider self-test block";
    let sealed = keys.seal(probe)?;
    if sealed.ciphertext.as_slice() == probe.as_slice() || keys.open(&sealed)? != probe {
        return Err(CryptoError::SelfTestFailed("AES-256-CBC round trip".into()));
    }
    Ok(())
}

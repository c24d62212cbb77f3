//! # Sec Session - Session Establishment and Security Management
//!
//! Opens authenticated, encrypted sessions between participants whose
//! policies agree.
//!
//! ## Architecture
//!
//! | Layer | Module | Contents |
//! |-------|--------|----------|
//! | Domain | `domain` | [`Session`] handshake state machine and its messages |
//! | Ports | `ports` | [`SecurityEntity`] contract served to peers |
//! | Service | `service` | [`SecurityManager`]: identity, policy, session table |
//! | Adapters | `adapters` | [`SecurityEndpoint`] variants, [`LoopbackEntity`] |
//!
//! ## Establishing a session
//!
//! ```text
//! initiator                                   responder
//!   certificate / entities / policy  ------>
//!   start_new_session(proposal)      ------>  admit, merge policy, register
//!   random_value(client)             ------>  server random
//!   public_key_exchange(offer)       ------>  verify, signed reply
//!   secret_key_exchange(offer)       ------>  unwrap, reply, validate
//!   validate
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{LoopbackEntity, SecurityEndpoint};
pub use config::{ConfigError, SecurityConfig};
pub use domain::{
    PublicKeyOffer, Role, SecretKeyOffer, Session, SessionId, SessionPhase, LOCK_LEN, RANDOM_LEN,
};
pub use error::{SecurityError, SecurityResult};
pub use ports::{SecurityEntity, SessionProposal};
pub use service::{
    draw_session_id, AccessControl, SecurityManager, SecurityManagerBuilder, TrustAnchors,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}

//! Session domain: handshake state machine and its messages.

pub mod session;

pub use session::{
    PublicKeyOffer, Role, SecretKeyOffer, Session, SessionId, SessionPhase, LOCK_LEN, RANDOM_LEN,
};

//! Error types for session establishment and the `SecurityEntity` contract.
//!
//! Errors cross the peer boundary, so every variant carries owned, plain
//! data and the type is serializable.

use crate::config::ConfigError;
use crate::domain::session::SessionId;
use sec_crypto::CryptoError;
use sec_policy::PolicyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Security errors.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityError {
    /// Two merged constraints contradict each other (REQUIRED vs DENIED).
    #[error("Incompatible policy: {0}")]
    IncompatiblePolicy(String),

    /// Resolved policy forbids the communication.
    #[error("Communication forbidden: {0}")]
    CommunicationForbidden(String),

    /// Peer has no security manager.
    #[error("Security not available")]
    SecurityNotAvailable,

    /// Handshake signature or key unwrapping failed.
    #[error("Key exchange failed: {0}")]
    KeyExchange(String),

    /// Session unknown, closed or not validated in time.
    #[error("Session {session_id} must be renegotiated: {reason}")]
    RenegotiateSession {
        /// Session concerned
        session_id: SessionId,
        /// What went wrong
        reason: String,
    },

    /// Administrative operation refused.
    #[error("Access denied: {0}")]
    AccessControl(String),

    /// Peer chain does not verify or does not end at a trust anchor.
    #[error("Untrusted certificate: {0}")]
    UntrustedCertificate(String),

    /// No usable session id could be drawn.
    #[error("No free session id after {attempts} attempts")]
    SessionIdExhausted {
        /// Draws made
        attempts: u32,
    },

    /// Policy configuration problem other than a conflict.
    #[error("Policy error: {0}")]
    Policy(String),

    /// Manager configuration rejected.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cryptographic primitive failure outside the handshake.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Value could not be encoded or decoded.
    #[error("Wire encoding error: {0}")]
    Wire(String),
}

impl SecurityError {
    pub(crate) fn renegotiate(session_id: SessionId, reason: impl Into<String>) -> Self {
        Self::RenegotiateSession {
            session_id,
            reason: reason.into(),
        }
    }

    pub(crate) fn key_exchange(reason: impl std::fmt::Display) -> Self {
        Self::KeyExchange(reason.to_string())
    }
}

impl From<PolicyError> for SecurityError {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::IncompatiblePolicy { .. } => Self::IncompatiblePolicy(e.to_string()),
            PolicyError::Crypto(inner) => inner.into(),
            other => Self::Policy(other.to_string()),
        }
    }
}

impl From<CryptoError> for SecurityError {
    fn from(e: CryptoError) -> Self {
        Self::Crypto(e.to_string())
    }
}

impl From<ConfigError> for SecurityError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<bincode::Error> for SecurityError {
    fn from(e: bincode::Error) -> Self {
        Self::Wire(e.to_string())
    }
}

/// Result type for security operations
pub type SecurityResult<T> = Result<T, SecurityError>;

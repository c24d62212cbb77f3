//! Error types for policy resolution and policy documents.

use crate::domain::authorization::{Authorization, Axis};
use crate::domain::entity::EntityType;
use sec_crypto::CryptoError;
use thiserror::Error;

/// Policy errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// One constraint REQUIRES what another DENIES.
    ///
    /// This is a configuration error; resolution aborts and is never retried.
    #[error(
        "Incompatible policy on {}: {left} vs {right}",
        .axis.map_or("unspecified axis", Axis::name)
    )]
    IncompatiblePolicy {
        /// Axis on which the conflict occurred, when known
        axis: Option<Axis>,
        /// Left-hand requirement
        left: Authorization,
        /// Right-hand requirement
        right: Authorization,
    },

    /// Entity chain must contain at least one certificate.
    #[error("Entity chain is empty")]
    EmptyEntityChain,

    /// Operation needs the private key, which was stripped.
    #[error("Certificate '{subject}' carries no private key")]
    MissingPrivateKey {
        /// Subject of the certificate
        subject: String,
    },

    /// Claimed entity type is not the one signed into the certificate subject.
    #[error("Certificate '{subject}' does not certify a {claimed}")]
    EntityTypeMismatch {
        /// Subject of the certificate
        subject: String,
        /// Type the holder claimed
        claimed: EntityType,
    },

    /// Policy document references a certificate the directory does not know.
    #[error("Unknown entity name in policy document: {0}")]
    UnknownEntityName(String),

    /// Policy document could not be parsed.
    #[error("Failed to parse policy document: {0}")]
    DocumentParse(String),

    /// Policy document could not be written.
    #[error("Failed to serialize policy document: {0}")]
    DocumentSerialize(String),

    /// Policy document could not be read from disk.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file
        path: String,
        /// Error message from the I/O operation
        error: String,
    },

    /// Underlying certificate or key failure.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl PolicyError {
    /// Attach an axis to an axis-less incompatibility.
    pub fn on_axis(self, on: Axis) -> Self {
        match self {
            Self::IncompatiblePolicy {
                axis: None,
                left,
                right,
            } => Self::IncompatiblePolicy {
                axis: Some(on),
                left,
                right,
            },
            other => other,
        }
    }

    /// True for REQUIRED/DENIED conflicts.
    pub fn is_incompatible_policy(&self) -> bool {
        matches!(self, Self::IncompatiblePolicy { .. })
    }
}

/// Result type for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

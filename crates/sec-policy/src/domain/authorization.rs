//! # Authorization Lattice
//!
//! Three-valued requirement on one protection axis. Combining two values
//! adds their signs: OPTIONAL is neutral, equal values are idempotent and a
//! REQUIRED/DENIED pair is a contradiction that is always reported, never
//! resolved.

use crate::error::{PolicyError, PolicyResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requirement level for one protection axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authorization {
    /// Protection must not be applied.
    Denied,
    /// No constraint.
    Optional,
    /// Protection must be applied.
    Required,
}

impl Authorization {
    /// Signed value: DENIED=-1, OPTIONAL=0, REQUIRED=+1.
    pub const fn value(self) -> i8 {
        match self {
            Self::Denied => -1,
            Self::Optional => 0,
            Self::Required => 1,
        }
    }

    /// Map a sum back onto the lattice by its sign.
    pub const fn from_sign(value: i8) -> Self {
        if value < 0 {
            Self::Denied
        } else if value > 0 {
            Self::Required
        } else {
            Self::Optional
        }
    }

    /// Combine two requirements.
    ///
    /// # Errors
    ///
    /// `PolicyError::IncompatiblePolicy` when one side is REQUIRED and the
    /// other DENIED, in either order.
    pub fn combine(self, other: Self) -> PolicyResult<Self> {
        if self.value() * other.value() == -1 {
            return Err(PolicyError::IncompatiblePolicy {
                axis: None,
                left: self,
                right: other,
            });
        }
        Ok(Self::from_sign(self.value() + other.value()))
    }

    /// True for REQUIRED.
    pub fn is_required(self) -> bool {
        self == Self::Required
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Denied => "DENIED",
            Self::Optional => "OPTIONAL",
            Self::Required => "REQUIRED",
        })
    }
}

/// Protection axes carried by a [`Communication`](super::communication::Communication).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Peer identity proof.
    Authentication,
    /// Payload secrecy.
    Confidentiality,
    /// Payload tamper detection.
    Integrity,
}

impl Axis {
    /// Lowercase axis name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Confidentiality => "confidentiality",
            Self::Integrity => "integrity",
        }
    }
}

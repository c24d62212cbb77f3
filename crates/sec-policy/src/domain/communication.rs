//! # Communication
//!
//! Policy for one direction of traffic: whether it may flow at all, and the
//! requirement on each protection axis.

use super::authorization::{Authorization, Axis};
use crate::error::PolicyResult;
use serde::{Deserialize, Serialize};

/// Directional traffic policy.
///
/// The default value is the deny-everything policy: every axis REQUIRED and
/// `allowed` false. It is what an entity pair with no matching rule gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Communication {
    allowed: bool,
    authentication: Authorization,
    confidentiality: Authorization,
    integrity: Authorization,
}

impl Default for Communication {
    fn default() -> Self {
        Self {
            allowed: false,
            authentication: Authorization::Required,
            confidentiality: Authorization::Required,
            integrity: Authorization::Required,
        }
    }
}

impl Communication {
    /// Create a communication policy.
    pub fn new(
        allowed: bool,
        authentication: Authorization,
        confidentiality: Authorization,
        integrity: Authorization,
    ) -> Self {
        Self {
            allowed,
            authentication,
            confidentiality,
            integrity,
        }
    }

    /// Allowed, no constraint on any axis.
    pub fn permissive() -> Self {
        Self::new(
            true,
            Authorization::Optional,
            Authorization::Optional,
            Authorization::Optional,
        )
    }

    /// Allowed, every axis REQUIRED.
    pub fn protected() -> Self {
        Self::new(
            true,
            Authorization::Required,
            Authorization::Required,
            Authorization::Required,
        )
    }

    /// Merge the policies of two sides of an interaction.
    ///
    /// `allowed` is the conjunction; each axis is [`Authorization::combine`]d.
    pub fn compute(from: &Self, to: &Self) -> PolicyResult<Self> {
        let combine = |a: Authorization, b: Authorization, axis: Axis| {
            a.combine(b).map_err(|e| e.on_axis(axis))
        };
        Ok(Self {
            allowed: from.allowed && to.allowed,
            authentication: combine(from.authentication, to.authentication, Axis::Authentication)?,
            confidentiality: combine(
                from.confidentiality,
                to.confidentiality,
                Axis::Confidentiality,
            )?,
            integrity: combine(from.integrity, to.integrity, Axis::Integrity)?,
        })
    }

    /// Whether traffic may flow.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Authentication requirement.
    pub fn authentication(&self) -> Authorization {
        self.authentication
    }

    /// Confidentiality requirement.
    pub fn confidentiality(&self) -> Authorization {
        self.confidentiality
    }

    /// Integrity requirement.
    pub fn integrity(&self) -> Authorization {
        self.integrity
    }

    /// Requirement on `axis`.
    pub fn axis(&self, axis: Axis) -> Authorization {
        match axis {
            Axis::Authentication => self.authentication,
            Axis::Confidentiality => self.confidentiality,
            Axis::Integrity => self.integrity,
        }
    }

    /// Copy with a different `allowed` flag.
    pub fn with_allowed(mut self, allowed: bool) -> Self {
        self.allowed = allowed;
        self
    }

    /// Copy with a different requirement on `axis`.
    pub fn with_axis(mut self, axis: Axis, value: Authorization) -> Self {
        match axis {
            Axis::Authentication => self.authentication = value,
            Axis::Confidentiality => self.confidentiality = value,
            Axis::Integrity => self.integrity = value,
        }
        self
    }
}

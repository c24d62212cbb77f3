//! # Sec Policy - Hierarchical Security Policy
//!
//! Decides whether two entities may talk and with which protection.
//!
//! ## Model
//!
//! - [`Authorization`]: DENIED / OPTIONAL / REQUIRED with a combine operator
//!   that refuses to reconcile REQUIRED with DENIED
//! - [`Communication`]: allow flag plus authentication, confidentiality and
//!   integrity requirements for one direction
//! - [`Entity`]: typed certificate chain, leaf first
//! - [`PolicyRule`]: two entity patterns plus request/reply communication
//! - [`PolicyServer`]: resolves an entity pair into a [`SecurityContext`]
//!
//! Absence of a matching rule is total denial, never total permission.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod domain;
pub mod error;
pub mod server;

pub use document::{CertificateDirectory, PolicyDocument};
pub use domain::{
    Authorization, Axis, Communication, Direction, Entities, Entity, EntityType, Match,
    MatchLevel, PolicyRule, RuleEntities, RuleEntity, SecurityContext, TypedCertificate,
};
pub use error::{PolicyError, PolicyResult};
pub use server::{merge_policies, PolicyServer, RankedRule};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

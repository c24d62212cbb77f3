//! Policy domain model.

pub mod authorization;
pub mod communication;
pub mod context;
pub mod entity;
pub mod rule;

pub use authorization::{Authorization, Axis};
pub use communication::Communication;
pub use context::{Direction, SecurityContext};
pub use entity::{Entities, Entity, EntityType, TypedCertificate};
pub use rule::{Match, MatchLevel, PolicyRule, RuleEntities, RuleEntity};

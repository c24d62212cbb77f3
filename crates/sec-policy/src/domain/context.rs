//! # Security Context
//!
//! Resolved, directional policy for one (local, distant) pair. Always
//! expressed from the local side: `request` governs traffic from local to
//! distant, `reply` the way back.

use super::communication::Communication;
use super::entity::Entities;
use crate::error::PolicyResult;
use serde::{Deserialize, Serialize};

/// Direction of a message relative to the local side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Local to distant.
    Request,
    /// Distant to local.
    Reply,
}

impl Direction {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Request => Self::Reply,
            Self::Reply => Self::Request,
        }
    }
}

/// Resolved policy for one interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    local: Entities,
    distant: Entities,
    request: Communication,
    reply: Communication,
    migration: bool,
    ao_creation: bool,
}

impl SecurityContext {
    /// Build a context.
    pub fn new(
        local: Entities,
        distant: Entities,
        request: Communication,
        reply: Communication,
        migration: bool,
        ao_creation: bool,
    ) -> Self {
        Self {
            local,
            distant,
            request,
            reply,
            migration,
            ao_creation,
        }
    }

    /// Nothing allowed: the context of an entity pair no rule covers.
    pub fn default_deny(local: Entities, distant: Entities) -> Self {
        Self::new(
            local,
            distant,
            Communication::default(),
            Communication::default(),
            false,
            false,
        )
    }

    /// True when neither direction may carry traffic.
    pub fn is_everything_forbidden(&self) -> bool {
        !self.request.is_allowed() && !self.reply.is_allowed()
    }

    /// Combine with another context for the same pair.
    ///
    /// Entity sets come from `self`; communications are
    /// [`Communication::compute`]d and flags are ANDed.
    pub fn merge_contexts(&self, other: &Self) -> PolicyResult<Self> {
        Ok(Self {
            local: self.local.clone(),
            distant: self.distant.clone(),
            request: Communication::compute(&self.request, &other.request)?,
            reply: Communication::compute(&self.reply, &other.reply)?,
            migration: self.migration && other.migration,
            ao_creation: self.ao_creation && other.ao_creation,
        })
    }

    /// The same context seen from the distant side.
    pub fn swapped(&self) -> Self {
        Self {
            local: self.distant.clone(),
            distant: self.local.clone(),
            request: self.reply,
            reply: self.request,
            migration: self.migration,
            ao_creation: self.ao_creation,
        }
    }

    /// Policy for `direction`.
    pub fn communication(&self, direction: Direction) -> &Communication {
        match direction {
            Direction::Request => &self.request,
            Direction::Reply => &self.reply,
        }
    }

    /// Local entity set.
    pub fn local(&self) -> &Entities {
        &self.local
    }

    /// Distant entity set.
    pub fn distant(&self) -> &Entities {
        &self.distant
    }

    /// Request policy.
    pub fn request(&self) -> &Communication {
        &self.request
    }

    /// Reply policy.
    pub fn reply(&self) -> &Communication {
        &self.reply
    }

    /// Migration allowed.
    pub fn migration(&self) -> bool {
        self.migration
    }

    /// Remote object creation allowed.
    pub fn ao_creation(&self) -> bool {
        self.ao_creation
    }

    /// Copy with private keys stripped from both entity sets.
    pub fn no_private_key(&self) -> Self {
        Self {
            local: self.local.no_private_key(),
            distant: self.distant.no_private_key(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::authorization::{Authorization, Axis};

    fn context(request: Communication, reply: Communication) -> SecurityContext {
        SecurityContext::new(
            Entities::default(),
            Entities::default(),
            request,
            reply,
            true,
            true,
        )
    }

    #[test]
    fn test_default_deny_forbids_everything() {
        let ctx = SecurityContext::default_deny(Entities::default(), Entities::default());
        assert!(ctx.is_everything_forbidden());
        assert!(!ctx.migration());
        assert!(!ctx.ao_creation());
    }

    #[test]
    fn test_one_open_direction_is_not_everything_forbidden() {
        let ctx = context(Communication::permissive(), Communication::default());
        assert!(!ctx.is_everything_forbidden());
        assert!(ctx.communication(Direction::Request).is_allowed());
        assert!(!ctx.communication(Direction::Reply).is_allowed());
    }

    #[test]
    fn test_merge_combines_both_directions() {
        let a = context(
            Communication::permissive().with_axis(Axis::Integrity, Authorization::Required),
            Communication::permissive(),
        );
        let b = SecurityContext::new(
            Entities::default(),
            Entities::default(),
            Communication::permissive(),
            Communication::permissive().with_allowed(false),
            false,
            true,
        );

        let merged = a.merge_contexts(&b).unwrap();
        assert_eq!(merged.request().integrity(), Authorization::Required);
        assert!(!merged.reply().is_allowed());
        assert!(!merged.migration());
        assert!(merged.ao_creation());
    }

    #[test]
    fn test_merge_conflict_propagates() {
        let a = context(
            Communication::permissive().with_axis(Axis::Authentication, Authorization::Required),
            Communication::permissive(),
        );
        let b = context(
            Communication::permissive().with_axis(Axis::Authentication, Authorization::Denied),
            Communication::permissive(),
        );
        assert!(a.merge_contexts(&b).unwrap_err().is_incompatible_policy());
    }

    #[test]
    fn test_swapped_is_involution() {
        let ctx = context(Communication::protected(), Communication::permissive());
        let swapped = ctx.swapped();

        assert_eq!(swapped.request(), ctx.reply());
        assert_eq!(swapped.swapped(), ctx);
        assert_eq!(Direction::Request.reversed(), Direction::Reply);
    }
}

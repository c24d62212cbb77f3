//! # Policy Rules
//!
//! A rule names two entity patterns (`from`, `to`) and the communication
//! allowed between them. Patterns match either by type alone (wildcard) or by
//! a certificate that must appear in an entity's chain (exact). Exact matches
//! carry the type rank of the pattern as their specificity level.

use super::communication::Communication;
use super::entity::{Entities, Entity, EntityType};
use sec_crypto::Certificate;
use serde::{Deserialize, Serialize};

/// Outcome of matching a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Match {
    /// No match.
    Failed,
    /// Matched by type only.
    Wildcard,
    /// Matched by certificate.
    Exact,
}

/// Match outcome plus specificity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchLevel {
    /// Outcome
    pub outcome: Match,
    /// Specificity: 0 for wildcard, the type rank for exact matches
    pub level: u8,
}

impl MatchLevel {
    const FAILED: Self = Self {
        outcome: Match::Failed,
        level: 0,
    };

    /// True unless the match failed.
    pub fn matched(&self) -> bool {
        self.outcome != Match::Failed
    }
}

/// One member of a rule-side pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntity {
    entity_type: EntityType,
    certificate: Option<Certificate>,
}

impl RuleEntity {
    /// Match any entity of a compatible type.
    pub fn any(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            certificate: None,
        }
    }

    /// Match entities whose chain contains `certificate`.
    pub fn certified(entity_type: EntityType, certificate: Certificate) -> Self {
        Self {
            entity_type,
            certificate: Some(certificate),
        }
    }

    /// Pattern type.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Pattern certificate, if any.
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Specificity of this member when it matches.
    pub fn level(&self) -> u8 {
        match self.certificate {
            Some(_) => self.entity_type.level(),
            None => 0,
        }
    }

    /// Match one entity.
    ///
    /// With a certificate, the type must be compatible with some link of the
    /// chain holding that certificate, so a DOMAIN pattern matches every
    /// entity minted under that domain.
    pub fn match_entity(&self, entity: &Entity) -> Match {
        match &self.certificate {
            None if self.entity_type.matches(entity.entity_type()) => Match::Wildcard,
            None => Match::Failed,
            Some(wanted) => {
                let fingerprint = wanted.fingerprint();
                let hit = entity.chain().iter().any(|link| {
                    link.fingerprint() == fingerprint
                        && self.entity_type.matches(link.entity_type())
                });
                if hit {
                    Match::Exact
                } else {
                    Match::Failed
                }
            }
        }
    }
}

/// Rule-side pattern: a list of [`RuleEntity`].
///
/// Every member must match at least one entity of the set being tested. An
/// empty pattern matches anything as a wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntities(Vec<RuleEntity>);

impl RuleEntities {
    /// Build from members.
    pub fn new(members: Vec<RuleEntity>) -> Self {
        Self(members)
    }

    /// Single-member pattern.
    pub fn single(member: RuleEntity) -> Self {
        Self(vec![member])
    }

    /// Members.
    pub fn members(&self) -> &[RuleEntity] {
        &self.0
    }

    /// Match an entity set.
    pub fn match_entities(&self, entities: &Entities) -> MatchLevel {
        let mut result = MatchLevel {
            outcome: Match::Wildcard,
            level: 0,
        };
        for member in &self.0 {
            let best = entities
                .iter()
                .map(|e| member.match_entity(e))
                .max()
                .unwrap_or(Match::Failed);
            match best {
                Match::Failed => return MatchLevel::FAILED,
                Match::Wildcard => {}
                Match::Exact => {
                    result.outcome = Match::Exact;
                    result.level = result.level.max(member.level());
                }
            }
        }
        result
    }
}

/// Declarative communication rule between two entity patterns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    from: RuleEntities,
    to: RuleEntities,
    request: Communication,
    reply: Communication,
    ao_creation: bool,
    migration: bool,
}

impl PolicyRule {
    /// Rule with creation and migration forbidden.
    pub fn new(
        from: RuleEntities,
        to: RuleEntities,
        request: Communication,
        reply: Communication,
    ) -> Self {
        Self {
            from,
            to,
            request,
            reply,
            ao_creation: false,
            migration: false,
        }
    }

    /// Set the remote-object-creation flag.
    pub fn with_ao_creation(mut self, allowed: bool) -> Self {
        self.ao_creation = allowed;
        self
    }

    /// Set the migration flag.
    pub fn with_migration(mut self, allowed: bool) -> Self {
        self.migration = allowed;
        self
    }

    /// Same rule seen from the other end: patterns and directions swapped.
    pub fn swapped(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            request: self.reply,
            reply: self.request,
            ao_creation: self.ao_creation,
            migration: self.migration,
        }
    }

    /// Source pattern.
    pub fn from(&self) -> &RuleEntities {
        &self.from
    }

    /// Target pattern.
    pub fn to(&self) -> &RuleEntities {
        &self.to
    }

    /// Policy for requests from `from` to `to`.
    pub fn request(&self) -> &Communication {
        &self.request
    }

    /// Policy for replies from `to` to `from`.
    pub fn reply(&self) -> &Communication {
        &self.reply
    }

    /// Remote object creation allowed.
    pub fn ao_creation(&self) -> bool {
        self.ao_creation
    }

    /// Migration allowed.
    pub fn migration(&self) -> bool {
        self.migration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::TypedCertificate;
    use sec_crypto::MIN_KEY_BITS;

    fn domain_and_object() -> (TypedCertificate, Entity) {
        let domain = TypedCertificate::mint_root(EntityType::Domain, "acme", MIN_KEY_BITS).unwrap();
        let object = domain
            .mint_child(EntityType::Object, "ao-1", MIN_KEY_BITS)
            .unwrap();
        let entity = Entity::root(domain.clone()).child(object);
        (domain, entity)
    }

    #[test]
    fn test_wildcard_member_matches_by_type() {
        let (_, object) = domain_and_object();
        assert_eq!(RuleEntity::any(EntityType::Entity).match_entity(&object), Match::Wildcard);
        assert_eq!(RuleEntity::any(EntityType::Node).match_entity(&object), Match::Failed);
    }

    #[test]
    fn test_certified_member_matches_chain_link() {
        let (domain, object) = domain_and_object();
        let member = RuleEntity::certified(EntityType::Domain, domain.certificate().clone());

        assert_eq!(member.match_entity(&object), Match::Exact);
        assert_eq!(member.level(), EntityType::Domain.level());

        let other = TypedCertificate::mint_root(EntityType::Domain, "other", MIN_KEY_BITS).unwrap();
        let stranger = RuleEntity::certified(EntityType::Domain, other.certificate().clone());
        assert_eq!(stranger.match_entity(&object), Match::Failed);
    }

    #[test]
    fn test_empty_pattern_is_wildcard() {
        let m = RuleEntities::default().match_entities(&Entities::default());
        assert_eq!(m.outcome, Match::Wildcard);
        assert_eq!(m.level, 0);
    }

    #[test]
    fn test_every_member_must_match() {
        let (domain, object) = domain_and_object();
        let set = Entities::new(vec![object]);

        let both = RuleEntities::new(vec![
            RuleEntity::any(EntityType::Object),
            RuleEntity::certified(EntityType::Domain, domain.certificate().clone()),
        ]);
        let m = both.match_entities(&set);
        assert_eq!(m.outcome, Match::Exact);
        assert_eq!(m.level, EntityType::Domain.level());

        let with_user = RuleEntities::new(vec![
            RuleEntity::any(EntityType::Object),
            RuleEntity::any(EntityType::User),
        ]);
        assert!(!with_user.match_entities(&set).matched());
    }

    #[test]
    fn test_swapped_exchanges_sides_and_directions() {
        let request = Communication::protected();
        let reply = Communication::permissive();
        let rule = PolicyRule::new(
            RuleEntities::single(RuleEntity::any(EntityType::Object)),
            RuleEntities::single(RuleEntity::any(EntityType::Runtime)),
            request,
            reply,
        )
        .with_migration(true);

        let swapped = rule.swapped();
        assert_eq!(swapped.from(), rule.to());
        assert_eq!(swapped.request(), &reply);
        assert_eq!(swapped.reply(), &request);
        assert!(swapped.migration());
        assert_eq!(swapped.swapped(), rule);
    }
}

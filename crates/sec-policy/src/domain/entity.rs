//! # Entities
//!
//! An entity is a typed identity in the containment hierarchy
//! (object/node/runtime ⊂ application ⊂ user ⊂ domain), represented by its
//! certificate chain from leaf to root.

use crate::error::{PolicyError, PolicyResult};
use sec_crypto::{Certificate, CryptoError, Fingerprint, IdentityKeyPair};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Matches anything.
    Unknown,
    /// Active object.
    Object,
    /// Node hosting objects.
    Node,
    /// Runtime process.
    Runtime,
    /// Wildcard for object, node or runtime.
    Entity,
    /// Application.
    Application,
    /// User.
    User,
    /// Administrative domain.
    Domain,
}

impl EntityType {
    /// Type compatibility.
    ///
    /// Equal types match, UNKNOWN matches anything and ENTITY matches any
    /// of OBJECT, NODE and RUNTIME.
    pub fn matches(self, other: Self) -> bool {
        if self == other || self == Self::Unknown || other == Self::Unknown {
            return true;
        }
        match (self, other) {
            (Self::Entity, t) | (t, Self::Entity) => t.is_leaf(),
            _ => false,
        }
    }

    /// OBJECT, NODE or RUNTIME.
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Object | Self::Node | Self::Runtime)
    }

    /// Specificity rank: DOMAIN lowest, leaf kinds highest.
    pub fn level(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Domain => 1,
            Self::User => 2,
            Self::Application => 3,
            Self::Object | Self::Node | Self::Runtime | Self::Entity => 4,
        }
    }

    /// Lowercase name, as used in policy documents.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Object => "object",
            Self::Node => "node",
            Self::Runtime => "runtime",
            Self::Entity => "entity",
            Self::Application => "application",
            Self::User => "user",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Certificate tagged with its entity type.
///
/// The private key is only present for identities owned by this process. It
/// is never serialized: the encoded form always equals the
/// [`Self::no_private_key`] copy.
#[derive(Clone, Serialize, Deserialize)]
pub struct TypedCertificate {
    certificate: Certificate,
    entity_type: EntityType,
    #[serde(skip)]
    private_key: Option<Arc<IdentityKeyPair>>,
}

impl TypedCertificate {
    /// Public-only typed certificate.
    pub fn new(certificate: Certificate, entity_type: EntityType) -> Self {
        Self {
            certificate,
            entity_type,
            private_key: None,
        }
    }

    /// Typed certificate owning its private key.
    pub fn with_private_key(
        certificate: Certificate,
        entity_type: EntityType,
        keys: Arc<IdentityKeyPair>,
    ) -> Self {
        Self {
            certificate,
            entity_type,
            private_key: Some(keys),
        }
    }

    /// Mint a fresh self-signed identity.
    pub fn mint_root(
        entity_type: EntityType,
        name: &str,
        key_bits: usize,
    ) -> PolicyResult<Self> {
        let keys = IdentityKeyPair::generate(key_bits)?;
        let certificate = Certificate::self_signed(subject_name(entity_type, name), &keys)?;
        Ok(Self::with_private_key(
            certificate,
            entity_type,
            Arc::new(keys),
        ))
    }

    /// Mint a fresh identity signed by this one.
    ///
    /// # Errors
    ///
    /// `PolicyError::MissingPrivateKey` when this certificate was stripped.
    pub fn mint_child(
        &self,
        entity_type: EntityType,
        name: &str,
        key_bits: usize,
    ) -> PolicyResult<Self> {
        let issuer_keys = self.private_key.as_ref().ok_or_else(|| {
            PolicyError::MissingPrivateKey {
                subject: self.certificate.subject().to_string(),
            }
        })?;
        let keys = IdentityKeyPair::generate(key_bits)?;
        let certificate = Certificate::issue(
            subject_name(entity_type, name),
            keys.public_key(),
            &self.certificate,
            issuer_keys,
        )?;
        Ok(Self::with_private_key(
            certificate,
            entity_type,
            Arc::new(keys),
        ))
    }

    /// Copy without the private key; safe to hand to a peer.
    pub fn no_private_key(&self) -> Self {
        Self::new(self.certificate.clone(), self.entity_type)
    }

    /// The certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Entity type.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Private key, when owned.
    pub fn private_key(&self) -> Option<&Arc<IdentityKeyPair>> {
        self.private_key.as_ref()
    }

    /// Fingerprint of the certificate.
    pub fn fingerprint(&self) -> Fingerprint {
        self.certificate.fingerprint()
    }

    /// Check the entity type against the signed subject.
    ///
    /// Minted subjects are `"{type}:{name}"`, so the issuer's signature
    /// covers the type; a holder cannot relabel its certificate.
    pub fn verify_type(&self) -> PolicyResult<()> {
        let subject = self.certificate.subject();
        let certified = subject
            .split_once(':')
            .is_some_and(|(prefix, _)| prefix == self.entity_type.name());
        if !certified {
            return Err(PolicyError::EntityTypeMismatch {
                subject: subject.to_string(),
                claimed: self.entity_type,
            });
        }
        Ok(())
    }

    /// Canonical bytes (never include the private key).
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        bincode::serialize(self).map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
    }

    /// Inverse of [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        bincode::deserialize(bytes).map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
    }
}

fn subject_name(entity_type: EntityType, name: &str) -> String {
    format!("{entity_type}:{name}")
}

impl PartialEq for TypedCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type && self.certificate == other.certificate
    }
}

impl Eq for TypedCertificate {}

impl fmt::Debug for TypedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCertificate")
            .field("subject", &self.certificate.subject())
            .field("entity_type", &self.entity_type)
            .field("has_private_key", &self.private_key.is_some())
            .finish()
    }
}

/// Identity: certificate chain, leaf first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    chain: Vec<TypedCertificate>,
}

impl Entity {
    /// Build from a leaf-to-root chain.
    pub fn new(chain: Vec<TypedCertificate>) -> PolicyResult<Self> {
        if chain.is_empty() {
            return Err(PolicyError::EmptyEntityChain);
        }
        Ok(Self { chain })
    }

    /// Single-certificate entity.
    pub fn root(certificate: TypedCertificate) -> Self {
        Self {
            chain: vec![certificate],
        }
    }

    /// New entity whose leaf is `certificate` and whose parents are this chain.
    pub fn child(&self, certificate: TypedCertificate) -> Self {
        let mut chain = Vec::with_capacity(self.chain.len() + 1);
        chain.push(certificate);
        chain.extend(self.chain.iter().cloned());
        Self { chain }
    }

    /// Leaf certificate.
    pub fn leaf(&self) -> &TypedCertificate {
        &self.chain[0]
    }

    /// Root certificate.
    pub fn root_certificate(&self) -> &TypedCertificate {
        &self.chain[self.chain.len() - 1]
    }

    /// Type of the leaf.
    pub fn entity_type(&self) -> EntityType {
        self.leaf().entity_type()
    }

    /// Full chain.
    pub fn chain(&self) -> &[TypedCertificate] {
        &self.chain
    }

    /// Whether `certificate` appears anywhere in the chain.
    pub fn contains(&self, certificate: &Certificate) -> bool {
        let wanted = certificate.fingerprint();
        self.chain.iter().any(|c| c.fingerprint() == wanted)
    }

    /// Check every link and that the chain ends in a self-signed root.
    pub fn verify_chain(&self) -> Result<&Certificate, CryptoError> {
        for pair in self.chain.windows(2) {
            pair[0].certificate().verify_issued_by(pair[1].certificate())?;
        }
        let root = self.root_certificate().certificate();
        if !root.is_self_signed() {
            return Err(CryptoError::IssuerMismatch {
                subject: root.subject().to_string(),
                issuer: root.issuer().to_string(),
            });
        }
        Ok(root)
    }

    /// Check that every link carries the type its subject certifies.
    pub fn verify_types(&self) -> PolicyResult<()> {
        self.chain.iter().try_for_each(TypedCertificate::verify_type)
    }

    /// Copy with every private key stripped.
    pub fn no_private_key(&self) -> Self {
        Self {
            chain: self.chain.iter().map(TypedCertificate::no_private_key).collect(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.leaf().certificate().subject())
    }
}

/// Ordered entity set: an identity followed by its containers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities(Vec<Entity>);

impl Entities {
    /// Build from a list.
    pub fn new(entities: Vec<Entity>) -> Self {
        Self(entities)
    }

    /// Append an entity.
    pub fn push(&mut self, entity: Entity) {
        self.0.push(entity);
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.0.iter()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First entity (the identity itself).
    pub fn first(&self) -> Option<&Entity> {
        self.0.first()
    }

    /// Copy with every private key stripped.
    pub fn no_private_key(&self) -> Self {
        Self(self.0.iter().map(Entity::no_private_key).collect())
    }
}

impl<'a> IntoIterator for &'a Entities {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Entity>> for Entities {
    fn from(entities: Vec<Entity>) -> Self {
        Self(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sec_crypto::MIN_KEY_BITS;

    #[test]
    fn test_entity_wildcard_matches_leaf_kinds_only() {
        for leaf in [EntityType::Object, EntityType::Node, EntityType::Runtime] {
            assert!(EntityType::Entity.matches(leaf));
            assert!(leaf.matches(EntityType::Entity));
        }
        assert!(!EntityType::Entity.matches(EntityType::Domain));
        assert!(!EntityType::Application.matches(EntityType::Entity));
    }

    #[test]
    fn test_unknown_matches_anything() {
        for t in [
            EntityType::Object,
            EntityType::Entity,
            EntityType::User,
            EntityType::Domain,
        ] {
            assert!(EntityType::Unknown.matches(t));
            assert!(t.matches(EntityType::Unknown));
        }
    }

    #[test]
    fn test_distinct_types_do_not_match() {
        assert!(!EntityType::Object.matches(EntityType::Runtime));
        assert!(!EntityType::User.matches(EntityType::Domain));
    }

    #[test]
    fn test_levels_order_containment() {
        assert!(EntityType::Domain.level() < EntityType::User.level());
        assert!(EntityType::User.level() < EntityType::Application.level());
        assert!(EntityType::Application.level() < EntityType::Object.level());
        assert_eq!(EntityType::Node.level(), EntityType::Runtime.level());
    }

    #[test]
    fn test_child_chain_verifies_and_contains_parent() {
        let domain = TypedCertificate::mint_root(EntityType::Domain, "acme", MIN_KEY_BITS).unwrap();
        let runtime = domain
            .mint_child(EntityType::Runtime, "rt-1", MIN_KEY_BITS)
            .unwrap();
        let entity = Entity::root(domain.clone()).child(runtime);

        assert_eq!(entity.entity_type(), EntityType::Runtime);
        assert!(entity.contains(domain.certificate()));
        assert!(entity.verify_chain().is_ok());
        assert_eq!(entity.to_string(), "runtime:rt-1");
    }

    #[test]
    fn test_stripped_certificate_cannot_mint() {
        let domain = TypedCertificate::mint_root(EntityType::Domain, "acme", MIN_KEY_BITS).unwrap();
        let stripped = domain.no_private_key();

        assert!(stripped.private_key().is_none());
        assert_eq!(stripped, domain);
        assert!(matches!(
            stripped.mint_child(EntityType::Object, "o", MIN_KEY_BITS),
            Err(PolicyError::MissingPrivateKey { .. })
        ));
    }

    #[test]
    fn test_encoding_drops_private_key() {
        let node = TypedCertificate::mint_root(EntityType::Node, "n1", MIN_KEY_BITS).unwrap();
        let decoded = TypedCertificate::from_bytes(&node.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded, node);
        assert!(decoded.private_key().is_none());
    }

    #[test]
    fn test_relabelled_certificate_fails_type_check() {
        let domain = TypedCertificate::mint_root(EntityType::Domain, "acme", MIN_KEY_BITS).unwrap();
        let object = domain
            .mint_child(EntityType::Object, "ao", MIN_KEY_BITS)
            .unwrap();
        let relabelled = TypedCertificate::with_private_key(
            object.certificate().clone(),
            EntityType::Runtime,
            object.private_key().unwrap().clone(),
        );

        assert!(object.verify_type().is_ok());
        assert_eq!(
            relabelled.verify_type(),
            Err(PolicyError::EntityTypeMismatch {
                subject: "object:ao".into(),
                claimed: EntityType::Runtime,
            })
        );

        let root = Entity::root(domain);
        assert!(root.child(object).verify_types().is_ok());
        let forged = root.child(relabelled);
        assert!(forged.verify_chain().is_ok());
        assert!(forged.verify_types().is_err());
    }

    #[test]
    fn test_unknown_claim_is_not_a_wildcard() {
        let node = TypedCertificate::mint_root(EntityType::Node, "n1", MIN_KEY_BITS).unwrap();
        let claimed = TypedCertificate::new(node.certificate().clone(), EntityType::Unknown);
        assert!(claimed.verify_type().is_err());
    }

    #[test]
    fn test_broken_chain_rejected() {
        let a = TypedCertificate::mint_root(EntityType::Domain, "a", MIN_KEY_BITS).unwrap();
        let b = TypedCertificate::mint_root(EntityType::Domain, "b", MIN_KEY_BITS).unwrap();
        let orphan = b.mint_child(EntityType::Object, "o", MIN_KEY_BITS).unwrap();

        let forged = Entity::new(vec![orphan, a]).unwrap();
        assert!(forged.verify_chain().is_err());
        assert_eq!(Entity::new(vec![]), Err(PolicyError::EmptyEntityChain));
    }
}

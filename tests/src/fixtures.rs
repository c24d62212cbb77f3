//! Shared fixtures for the integration scenarios.

use sec_crypto::MIN_KEY_BITS;
use sec_policy::{
    Communication, Entity, EntityType, PolicyRule, PolicyServer, RuleEntities, RuleEntity,
    TypedCertificate,
};
use sec_session::{SecurityConfig, SecurityManager, SecurityManagerBuilder};
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Small keys and a short validation wait.
pub fn test_config() -> SecurityConfig {
    SecurityConfig {
        rsa_key_bits: MIN_KEY_BITS,
        validation_timeout_ms: 500,
        ..SecurityConfig::default()
    }
}

/// A self-signed domain and everything minted under it.
pub struct Domain {
    pub certificate: TypedCertificate,
    pub root: Entity,
}

impl Domain {
    pub fn new(name: &str) -> Self {
        let certificate = TypedCertificate::mint_root(EntityType::Domain, name, MIN_KEY_BITS)
            .expect("mint domain");
        let root = Entity::root(certificate.clone());
        Self { certificate, root }
    }

    /// Entity of `entity_type` signed directly by the domain.
    pub fn member(&self, entity_type: EntityType, name: &str) -> Entity {
        let leaf = self
            .certificate
            .mint_child(entity_type, name, MIN_KEY_BITS)
            .expect("mint member");
        self.root.child(leaf)
    }

    /// Pattern matching exactly this domain.
    pub fn pattern(&self) -> RuleEntities {
        RuleEntities::single(RuleEntity::certified(
            EntityType::Domain,
            self.certificate.certificate().clone(),
        ))
    }
}

/// Pattern matching any leaf entity.
pub fn any_entity() -> RuleEntities {
    RuleEntities::single(RuleEntity::any(EntityType::Entity))
}

/// One rule between any two leaf entities.
pub fn rules_between_any(request: Communication, reply: Communication) -> PolicyServer {
    PolicyServer::new(vec![PolicyRule::new(any_entity(), any_entity(), request, reply)])
}

/// Everything allowed, everything protected.
pub fn protected_rules() -> PolicyServer {
    rules_between_any(Communication::protected(), Communication::protected())
}

/// Builder preloaded with the test config.
pub fn builder(identity: Entity) -> SecurityManagerBuilder {
    SecurityManager::builder(identity).config(test_config())
}

/// Manager with `rules` and the test config.
pub fn manager(identity: Entity, rules: PolicyServer) -> SecurityManager {
    builder(identity)
        .policy_server(rules)
        .build()
        .expect("build manager")
}

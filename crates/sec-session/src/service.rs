//! # Security Manager
//!
//! Ties an identity, a policy server, a session table and an optional parent
//! together, and serves the [`SecurityEntity`] contract to peers.
//!
//! ## Concurrency
//!
//! The session table (id index and certificate index) sits behind one coarse
//! `parking_lot::Mutex`; ids are drawn under that lock. Each session has its
//! own mutex, taken only for the synchronous step of a handshake phase and
//! never held across an `.await`. Lock order is table, then session.
//! Waiting for validation goes through the session's `watch` channel with a
//! bounded timeout.
//!
//! ## Certificate index
//!
//! A peer certificate maps to at most one reusable session: one this side is
//! driving, or a validated one the peer opened. A session proposed by a peer
//! enters the index only once the handshake has proven the peer holds its
//! key, and then replaces an earlier session the peer opened.

use crate::config::SecurityConfig;
use crate::domain::{
    PublicKeyOffer, Role, SecretKeyOffer, Session, SessionId, SessionPhase, RANDOM_LEN,
};
use crate::error::{SecurityError, SecurityResult};
use crate::ports::{SecurityEntity, SessionProposal};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use sec_crypto::{ensure_initialized, Certificate, Fingerprint, IdentityKeyPair, SealedPayload};
use sec_policy::{
    Direction, Entities, Entity, EntityType, PolicyError, PolicyRule, PolicyServer,
    SecurityContext, TypedCertificate,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Trust anchors
// =============================================================================

/// Roots a peer chain may end at.
#[derive(Clone, Debug, Default)]
pub struct TrustAnchors {
    roots: HashSet<Fingerprint>,
}

impl TrustAnchors {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `root`.
    pub fn add(&mut self, root: &Certificate) {
        self.roots.insert(root.fingerprint());
    }

    /// Whether `root` is trusted.
    pub fn contains(&self, root: &Certificate) -> bool {
        self.roots.contains(&root.fingerprint())
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// True when no root is trusted.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Check every link of `entity` and that its root is an anchor.
    pub fn verify(&self, entity: &Entity) -> SecurityResult<()> {
        let root = entity
            .verify_chain()
            .map_err(|e| SecurityError::UntrustedCertificate(format!("{entity}: {e}")))?;
        if !self.contains(root) {
            return Err(SecurityError::UntrustedCertificate(format!(
                "{entity}: root '{}' is not a trust anchor",
                root.subject()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Access control
// =============================================================================

/// Administrative check on policy-mutating operations.
#[derive(Clone, Debug, Default)]
pub struct AccessControl {
    enforce: bool,
    administrators: HashSet<Fingerprint>,
}

impl AccessControl {
    /// Hook with enforcement on or off and no administrators.
    pub fn new(enforce: bool) -> Self {
        Self {
            enforce,
            administrators: HashSet::new(),
        }
    }

    /// Grant administrative rights to `certificate`.
    #[must_use]
    pub fn with_administrator(mut self, certificate: &Certificate) -> Self {
        self.administrators.insert(certificate.fingerprint());
        self
    }

    /// Whether checks are enforced.
    pub fn is_enforced(&self) -> bool {
        self.enforce
    }

    /// Allow `caller` or fail with `AccessControl`.
    pub fn check(&self, caller: &Certificate) -> SecurityResult<()> {
        if !self.enforce || self.administrators.contains(&caller.fingerprint()) {
            return Ok(());
        }
        Err(SecurityError::AccessControl(format!(
            "'{}' is not an administrator",
            caller.subject()
        )))
    }
}

// =============================================================================
// Session table
// =============================================================================

/// Draw a non-zero id for which `taken` is false.
pub fn draw_session_id<R: Rng + ?Sized>(
    rng: &mut R,
    attempts: u32,
    taken: impl Fn(SessionId) -> bool,
) -> SecurityResult<SessionId> {
    for _ in 0..attempts {
        let id: SessionId = rng.gen();
        if id != 0 && !taken(id) {
            return Ok(id);
        }
    }
    Err(SecurityError::SessionIdExhausted { attempts })
}

type SharedSession = Arc<Mutex<Session>>;

#[derive(Default)]
struct SessionTable {
    by_id: HashMap<SessionId, SharedSession>,
    by_certificate: HashMap<Fingerprint, SessionId>,
}

impl SessionTable {
    fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.by_id.get(&id).cloned()
    }

    fn find(&self, certificate: &Fingerprint) -> Option<SessionId> {
        self.by_certificate.get(certificate).copied()
    }

    fn insert(
        &mut self,
        attempts: u32,
        certificate: Option<Fingerprint>,
        make: impl FnOnce(SessionId) -> Session,
    ) -> SecurityResult<SessionId> {
        let id = draw_session_id(&mut rand::thread_rng(), attempts, |id| {
            self.by_id.contains_key(&id)
        })?;
        self.by_id.insert(id, Arc::new(Mutex::new(make(id))));
        if let Some(certificate) = certificate {
            self.by_certificate.insert(certificate, id);
        }
        Ok(id)
    }

    /// Index a validated responder session under `certificate`.
    ///
    /// A session this side is driving keeps its slot; an earlier session the
    /// peer opened is dropped. Returns the dropped id.
    fn promote(&mut self, certificate: Fingerprint, id: SessionId) -> Option<SessionId> {
        let stale = self.find(&certificate).filter(|&current| current != id);
        if let Some(current) = stale {
            let driving = self
                .get(current)
                .is_some_and(|session| session.lock().role() == Role::Initiator);
            if driving {
                return None;
            }
            self.remove(current);
        }
        self.by_certificate.insert(certificate, id);
        stale
    }

    fn remove(&mut self, id: SessionId) -> Option<SharedSession> {
        let session = self.by_id.remove(&id)?;
        self.by_certificate.retain(|_, indexed| *indexed != id);
        Some(session)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`SecurityManager`].
pub struct SecurityManagerBuilder {
    identity: Entity,
    config: SecurityConfig,
    policy: Option<PolicyServer>,
    containers: Vec<Entity>,
    parent: Option<Arc<dyn SecurityEntity>>,
    trust: TrustAnchors,
    access: Option<AccessControl>,
}

impl SecurityManagerBuilder {
    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: SecurityConfig) -> Self {
        self.config = config;
        self
    }

    /// Own rule set. Without one, policy comes from the parent alone.
    #[must_use]
    pub fn policy_server(mut self, server: PolicyServer) -> Self {
        self.policy = Some(server);
        self
    }

    /// Append a containing entity (runtime, node, domain...).
    #[must_use]
    pub fn container(mut self, entity: Entity) -> Self {
        self.containers.push(entity);
        self
    }

    /// Delegate policy to `parent` as well.
    #[must_use]
    pub fn parent(mut self, parent: Arc<dyn SecurityEntity>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Trust chains ending at `root`. The identity's own root is always
    /// trusted.
    #[must_use]
    pub fn trust_anchor(mut self, root: &Certificate) -> Self {
        self.trust.add(root);
        self
    }

    /// Override the access-control hook.
    #[must_use]
    pub fn access_control(mut self, access: AccessControl) -> Self {
        self.access = Some(access);
        self
    }

    /// Build the manager.
    ///
    /// # Errors
    ///
    /// Fails if the crypto self-test fails, the configuration is invalid or
    /// the identity carries no private key.
    pub fn build(self) -> SecurityResult<SecurityManager> {
        ensure_initialized()?;
        self.config.validate()?;

        let leaf = self.identity.leaf();
        let keys = leaf
            .private_key()
            .cloned()
            .ok_or_else(|| PolicyError::MissingPrivateKey {
                subject: leaf.certificate().subject().to_string(),
            })?;

        let mut trust = self.trust;
        trust.add(self.identity.root_certificate().certificate());

        let mut entities = Entities::new(vec![self.identity.no_private_key()]);
        for container in &self.containers {
            entities.push(container.no_private_key());
        }

        let access = self
            .access
            .unwrap_or_else(|| AccessControl::new(self.config.enforce_access_control));

        info!(
            identity = %self.identity,
            containers = self.containers.len(),
            has_policy = self.policy.is_some(),
            has_parent = self.parent.is_some(),
            "security manager ready"
        );

        Ok(SecurityManager {
            config: self.config,
            identity: self.identity,
            keys,
            entities,
            policy: RwLock::new(self.policy),
            sessions: Mutex::new(SessionTable::default()),
            parent: self.parent,
            trust,
            access,
        })
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Identity, policy and sessions of one participant.
pub struct SecurityManager {
    config: SecurityConfig,
    identity: Entity,
    keys: Arc<IdentityKeyPair>,
    entities: Entities,
    policy: RwLock<Option<PolicyServer>>,
    sessions: Mutex<SessionTable>,
    parent: Option<Arc<dyn SecurityEntity>>,
    trust: TrustAnchors,
    access: AccessControl,
}

impl SecurityManager {
    /// Start building a manager for `identity`, whose leaf must own its
    /// private key.
    pub fn builder(identity: Entity) -> SecurityManagerBuilder {
        SecurityManagerBuilder {
            identity,
            config: SecurityConfig::default(),
            policy: None,
            containers: Vec::new(),
            parent: None,
            trust: TrustAnchors::new(),
            access: None,
        }
    }

    /// Own identity, with private key.
    pub fn identity(&self) -> &Entity {
        &self.identity
    }

    /// Identity certificate, without private key.
    pub fn certificate_public(&self) -> TypedCertificate {
        self.identity.leaf().no_private_key()
    }

    /// Identity followed by containers, without private keys.
    pub fn local_entities(&self) -> &Entities {
        &self.entities
    }

    /// Active configuration.
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Accepted roots.
    pub fn trust_anchors(&self) -> &TrustAnchors {
        &self.trust
    }

    // -------------------------------------------------------------------------
    // Policy
    // -------------------------------------------------------------------------

    /// Resolve policy for `local` talking to `distant`.
    ///
    /// The own rule set and the parent's answer are merged. A parent without
    /// security adds no constraint; a manager with neither rules nor parent
    /// has no security to offer.
    pub async fn get_policy(
        &self,
        local: &Entities,
        distant: &Entities,
    ) -> SecurityResult<SecurityContext> {
        let own = self
            .policy
            .read()
            .as_ref()
            .map(|server| server.get_policy(local, distant))
            .transpose()?;

        let Some(parent) = &self.parent else {
            return own.ok_or(SecurityError::SecurityNotAvailable);
        };

        let inherited = match parent.policy(local.clone(), distant.clone()).await {
            Ok(context) => Some(context),
            Err(SecurityError::SecurityNotAvailable) => None,
            Err(e) => return Err(e),
        };

        match (own, inherited) {
            (Some(own), Some(inherited)) => Ok(own.merge_contexts(&inherited)?),
            (Some(context), None) | (None, Some(context)) => Ok(context),
            (None, None) => Err(SecurityError::SecurityNotAvailable),
        }
    }

    /// Replace the rule set.
    pub fn replace_policy_server(
        &self,
        caller: &Certificate,
        server: PolicyServer,
    ) -> SecurityResult<()> {
        self.access.check(caller)?;
        info!(caller = caller.subject(), rules = server.rules().len(), "policy server replaced");
        *self.policy.write() = Some(server);
        Ok(())
    }

    /// Append a rule, creating the rule set if needed.
    pub fn add_policy_rule(&self, caller: &Certificate, rule: PolicyRule) -> SecurityResult<()> {
        self.access.check(caller)?;
        self.policy
            .write()
            .get_or_insert_with(PolicyServer::default)
            .add_rule(rule);
        debug!(caller = caller.subject(), "policy rule added");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Mint a new identity signed by this manager's certificate.
    ///
    /// The returned chain is the new certificate followed by this manager's
    /// chain, so the new entity inherits every policy pattern that names an
    /// ancestor.
    pub fn generate_sibling_certificate(
        &self,
        entity_type: EntityType,
        name: &str,
    ) -> SecurityResult<Entity> {
        let leaf = self
            .identity
            .leaf()
            .mint_child(entity_type, name, self.config.rsa_key_bits)?;
        let entity = self.identity.child(leaf);
        info!(issuer = %self.identity, entity = %entity, "minted child identity");
        Ok(entity)
    }

    fn admit(&self, certificate: &TypedCertificate, entities: &Entities) -> SecurityResult<Entity> {
        let identity = entities.first().ok_or_else(|| {
            SecurityError::UntrustedCertificate("peer presented no entities".into())
        })?;
        if identity.leaf() != certificate {
            return Err(SecurityError::UntrustedCertificate(format!(
                "certificate '{}' does not match entity '{identity}'",
                certificate.certificate().subject()
            )));
        }
        for entity in entities {
            entity
                .verify_types()
                .map_err(|e| SecurityError::UntrustedCertificate(format!("{entity}: {e}")))?;
        }
        if self.config.require_trust_anchor {
            for entity in entities {
                self.trust.verify(entity)?;
            }
        }
        Ok(identity.clone())
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    /// Open (or reuse) a validated session with `peer`.
    ///
    /// # Errors
    ///
    /// - `CommunicationForbidden` if either side's policy forbids everything
    /// - `IncompatiblePolicy` if the two policies conflict
    /// - `UntrustedCertificate` if the peer chain is not anchored
    /// - `KeyExchange` if the handshake fails; no state survives on either side
    pub async fn initiate_session(&self, peer: &dyn SecurityEntity) -> SecurityResult<SessionId> {
        ensure_initialized()?;
        let peer_certificate = peer.certificate().await?;
        let fingerprint = peer_certificate.fingerprint();
        if let Some(id) = self.session_for(peer_certificate.certificate()) {
            debug!(session_id = id, peer = peer_certificate.certificate().subject(), "reusing session");
            return Ok(id);
        }

        let distant = peer.entities().await?;
        let distant_identity = self.admit(&peer_certificate, &distant)?;

        let local_context = self.get_policy(&self.entities, &distant).await?;
        let remote_context = peer
            .policy(distant.clone(), self.entities.clone())
            .await?
            .swapped();
        if local_context.is_everything_forbidden() || remote_context.is_everything_forbidden() {
            warn!(peer = %distant_identity, "communication forbidden by policy");
            return Err(SecurityError::CommunicationForbidden(format!(
                "no traffic allowed between {} and {distant_identity}",
                self.identity
            )));
        }
        let agreed = local_context.merge_contexts(&remote_context)?;

        let (id, session) = {
            let mut table = self.sessions.lock();
            if let Some(id) = table.find(&fingerprint) {
                return Ok(id);
            }
            let id = table.insert(self.config.max_session_id_attempts, Some(fingerprint), |id| {
                Session::initiator(id, agreed.clone(), distant_identity.clone())
            })?;
            (id, table.get(id))
        };
        let session =
            session.ok_or_else(|| SecurityError::renegotiate(id, "session vanished"))?;

        let proposal = SessionProposal {
            initiator_session: id,
            context: agreed.swapped(),
        };
        match self.drive_handshake(&session, peer, proposal).await {
            Ok(()) => {
                info!(session_id = id, peer = %distant_identity, "session established");
                Ok(id)
            }
            Err(e) => {
                warn!(session_id = id, peer = %distant_identity, error = %e, "handshake failed");
                let distant_id = session.lock().distant_id();
                self.remove_session(id);
                if distant_id != 0 {
                    if let Err(notify) = peer.terminate_session(distant_id).await {
                        debug!(session_id = id, error = %notify, "peer not notified of abort");
                    }
                }
                Err(e)
            }
        }
    }

    async fn drive_handshake(
        &self,
        session: &SharedSession,
        peer: &dyn SecurityEntity,
        proposal: SessionProposal,
    ) -> SecurityResult<()> {
        let distant_id = peer.start_new_session(proposal).await?;
        if distant_id == 0 {
            return Err(SecurityError::key_exchange("peer assigned session id 0"));
        }
        session.lock().bind_distant(distant_id);

        let client = session.lock().begin_random_exchange()?;
        let server = peer.random_value(distant_id, client).await?;
        session.lock().complete_random_exchange(server)?;

        let offer = session
            .lock()
            .public_key_offer(self.identity.leaf().certificate(), &self.keys)?;
        let reply = peer.public_key_exchange(distant_id, offer).await?;
        session.lock().accept_public_key(&reply)?;

        let offer = session.lock().secret_key_offer(&self.keys)?;
        let reply = peer.secret_key_exchange(distant_id, offer).await?;
        let mut session = session.lock();
        session.accept_secret_key(&reply, &self.keys)?;
        session.validate()
    }

    /// Close a session locally and tell the peer.
    pub async fn close_session(
        &self,
        session_id: SessionId,
        peer: &dyn SecurityEntity,
    ) -> SecurityResult<()> {
        let distant_id = self
            .remove_session(session_id)
            .map(|session| session.lock().distant_id())
            .ok_or_else(|| SecurityError::renegotiate(session_id, "unknown session"))?;
        peer.terminate_session(distant_id).await
    }

    fn remove_session(&self, session_id: SessionId) -> Option<SharedSession> {
        let removed = self.sessions.lock().remove(session_id);
        if removed.is_some() {
            debug!(session_id, "session removed");
        }
        removed
    }

    fn session(&self, session_id: SessionId) -> SecurityResult<SharedSession> {
        self.sessions
            .lock()
            .get(session_id)
            .ok_or_else(|| SecurityError::renegotiate(session_id, "unknown session"))
    }

    fn abort_on_error<T>(&self, session_id: SessionId, result: SecurityResult<T>) -> SecurityResult<T> {
        if let Err(e) = &result {
            warn!(session_id, error = %e, "handshake step rejected");
            self.remove_session(session_id);
        }
        result
    }

    async fn validated_session(&self, session_id: SessionId) -> SecurityResult<SharedSession> {
        // Only the receiver is held while waiting, so removing the session
        // closes the channel and ends the wait.
        let mut validated = self.session(session_id)?.lock().subscribe();
        let timeout = self.config.validation_timeout();
        let outcome = tokio::time::timeout(timeout, validated.wait_for(|v| *v))
            .await
            .map(|waited| waited.map(|_| ()));
        match outcome {
            Ok(Ok(())) => self.session(session_id),
            Ok(Err(_)) => Err(SecurityError::renegotiate(
                session_id,
                "session closed before validation",
            )),
            Err(_) => Err(SecurityError::renegotiate(
                session_id,
                format!("not validated within {timeout:?}"),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Traffic
    // -------------------------------------------------------------------------

    /// Seal raw bytes for `direction`, waiting for validation if needed.
    pub async fn encrypt_bytes(
        &self,
        session_id: SessionId,
        direction: Direction,
        plaintext: &[u8],
    ) -> SecurityResult<SealedPayload> {
        let session = self.validated_session(session_id).await?;
        let sealed = session.lock().seal(direction, plaintext)?;
        Ok(sealed)
    }

    /// Open raw bytes sealed by the peer for `direction`.
    pub async fn decrypt_bytes(
        &self,
        session_id: SessionId,
        direction: Direction,
        sealed: &SealedPayload,
    ) -> SecurityResult<Vec<u8>> {
        let session = self.validated_session(session_id).await?;
        let opened = session.lock().open(direction, sealed)?;
        Ok(opened)
    }

    /// Serialize and seal `value`.
    pub async fn encrypt<T: Serialize + Sync + ?Sized>(
        &self,
        session_id: SessionId,
        direction: Direction,
        value: &T,
    ) -> SecurityResult<SealedPayload> {
        let body = bincode::serialize(value)?;
        self.encrypt_bytes(session_id, direction, &body).await
    }

    /// Open and deserialize a value.
    pub async fn decrypt<T: DeserializeOwned>(
        &self,
        session_id: SessionId,
        direction: Direction,
        sealed: &SealedPayload,
    ) -> SecurityResult<T> {
        let body = self.decrypt_bytes(session_id, direction, sealed).await?;
        Ok(bincode::deserialize(&body)?)
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Live session ids, ascending.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.lock().by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Phase of a session.
    pub fn session_phase(&self, session_id: SessionId) -> Option<SessionPhase> {
        let session = self.sessions.lock().get(session_id)?;
        let phase = session.lock().phase();
        Some(phase)
    }

    /// Whether a session is validated; false for unknown ids.
    pub fn is_validated(&self, session_id: SessionId) -> bool {
        self.sessions
            .lock()
            .get(session_id)
            .is_some_and(|session| session.lock().is_validated())
    }

    /// Id the peer uses for a session.
    pub fn distant_session_id(&self, session_id: SessionId) -> Option<SessionId> {
        let session = self.sessions.lock().get(session_id)?;
        let distant_id = session.lock().distant_id();
        Some(distant_id)
    }

    /// Agreed context of a session.
    pub fn session_context(&self, session_id: SessionId) -> Option<SecurityContext> {
        let session = self.sessions.lock().get(session_id)?;
        let context = session.lock().context().clone();
        Some(context)
    }

    /// Session held with the owner of `certificate`.
    pub fn session_for(&self, certificate: &Certificate) -> Option<SessionId> {
        self.sessions.lock().find(&certificate.fingerprint())
    }

    // -------------------------------------------------------------------------
    // Responder steps
    // -------------------------------------------------------------------------

    fn respond_public_key(
        &self,
        session: &SharedSession,
        offer: &PublicKeyOffer,
    ) -> SecurityResult<PublicKeyOffer> {
        let mut session = session.lock();
        let reply = session.public_key_offer(self.identity.leaf().certificate(), &self.keys)?;
        session.accept_public_key(offer)?;
        Ok(reply)
    }

    fn respond_secret_key(
        &self,
        session: &SharedSession,
        offer: &SecretKeyOffer,
    ) -> SecurityResult<SecretKeyOffer> {
        let mut session = session.lock();
        session.accept_secret_key(offer, &self.keys)?;
        let reply = session.secret_key_offer(&self.keys)?;
        session.validate()?;
        Ok(reply)
    }
}

impl std::fmt::Debug for SecurityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityManager")
            .field("identity", &self.identity.to_string())
            .field("sessions", &self.sessions.lock().by_id.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[async_trait]
impl SecurityEntity for SecurityManager {
    async fn certificate(&self) -> SecurityResult<TypedCertificate> {
        Ok(self.certificate_public())
    }

    async fn start_new_session(&self, proposal: SessionProposal) -> SecurityResult<SessionId> {
        ensure_initialized()?;
        let initiator = proposal.initiator().cloned().ok_or_else(|| {
            SecurityError::UntrustedCertificate("proposal names no initiator".into())
        })?;
        self.admit(initiator.leaf(), proposal.context.distant())?;

        let own = self
            .get_policy(&self.entities, proposal.context.distant())
            .await?;
        if own.is_everything_forbidden() || proposal.context.is_everything_forbidden() {
            warn!(peer = %initiator, "refusing session: communication forbidden");
            return Err(SecurityError::CommunicationForbidden(format!(
                "no traffic allowed between {} and {initiator}",
                self.identity
            )));
        }
        let agreed = own.merge_contexts(&proposal.context)?;

        let id = self
            .sessions
            .lock()
            .insert(self.config.max_session_id_attempts, None, |id| {
                Session::responder(id, proposal.initiator_session, agreed, initiator.clone())
            })?;
        info!(session_id = id, peer = %initiator, "session proposed by peer");
        Ok(id)
    }

    async fn public_key(&self) -> SecurityResult<Vec<u8>> {
        Ok(self.keys.public_key().to_bytes()?)
    }

    async fn random_value(
        &self,
        session_id: SessionId,
        client_random: [u8; RANDOM_LEN],
    ) -> SecurityResult<[u8; RANDOM_LEN]> {
        let session = self.session(session_id)?;
        let result = session.lock().accept_client_random(client_random);
        self.abort_on_error(session_id, result)
    }

    async fn public_key_exchange(
        &self,
        session_id: SessionId,
        offer: PublicKeyOffer,
    ) -> SecurityResult<PublicKeyOffer> {
        let session = self.session(session_id)?;
        let result = self.respond_public_key(&session, &offer);
        self.abort_on_error(session_id, result)
    }

    async fn secret_key_exchange(
        &self,
        session_id: SessionId,
        offer: SecretKeyOffer,
    ) -> SecurityResult<SecretKeyOffer> {
        let session = self.session(session_id)?;
        let result = self.respond_secret_key(&session, &offer);
        if result.is_ok() {
            let fingerprint = session.lock().distant().leaf().fingerprint();
            let stale = self.sessions.lock().promote(fingerprint, session_id);
            if let Some(stale) = stale {
                debug!(session_id = stale, "replaced session with re-proposing peer");
            }
            info!(session_id, "session validated by responder");
        }
        self.abort_on_error(session_id, result)
    }

    async fn policy(&self, local: Entities, distant: Entities) -> SecurityResult<SecurityContext> {
        self.get_policy(&local, &distant).await
    }

    async fn entities(&self) -> SecurityResult<Entities> {
        Ok(self.entities.clone())
    }

    async fn terminate_session(&self, session_id: SessionId) -> SecurityResult<()> {
        self.remove_session(session_id);
        Ok(())
    }
}

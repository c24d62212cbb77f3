//! The `SecurityEntity` contract.
//!
//! Implemented by every participant and invoked by remote peers' managers.
//! Arguments and results are plain serializable values so an implementation
//! may sit on the far side of any transport.

use crate::domain::{PublicKeyOffer, SecretKeyOffer, SessionId, RANDOM_LEN};
use crate::error::SecurityResult;
use async_trait::async_trait;
use sec_policy::{Entities, Entity, SecurityContext, TypedCertificate};
use serde::{Deserialize, Serialize};

/// Request to open a session, sent by the initiator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProposal {
    /// Initiator's id for the session
    pub initiator_session: SessionId,
    /// Agreed context, expressed from the responder's side
    pub context: SecurityContext,
}

impl SessionProposal {
    /// Initiator identity: the first distant entity of the context.
    pub fn initiator(&self) -> Option<&Entity> {
        self.context.distant().first()
    }
}

/// Security contract between peers.
#[async_trait]
pub trait SecurityEntity: Send + Sync {
    /// Identity certificate, without private key.
    async fn certificate(&self) -> SecurityResult<TypedCertificate>;

    /// Register an unvalidated session; returns the responder's id (never 0).
    async fn start_new_session(&self, proposal: SessionProposal) -> SecurityResult<SessionId>;

    /// SPKI DER of the identity public key.
    async fn public_key(&self) -> SecurityResult<Vec<u8>>;

    /// Phase 1: exchange randoms.
    async fn random_value(
        &self,
        session_id: SessionId,
        client_random: [u8; RANDOM_LEN],
    ) -> SecurityResult<[u8; RANDOM_LEN]>;

    /// Phase 2: exchange signed public keys.
    async fn public_key_exchange(
        &self,
        session_id: SessionId,
        offer: PublicKeyOffer,
    ) -> SecurityResult<PublicKeyOffer>;

    /// Phase 3: exchange wrapped session keys.
    async fn secret_key_exchange(
        &self,
        session_id: SessionId,
        offer: SecretKeyOffer,
    ) -> SecurityResult<SecretKeyOffer>;

    /// Resolve policy, from the callee's point of view.
    async fn policy(&self, local: Entities, distant: Entities) -> SecurityResult<SecurityContext>;

    /// Identity followed by its containers, without private keys.
    async fn entities(&self) -> SecurityResult<Entities>;

    /// Forget a session. Unknown ids are ignored.
    async fn terminate_session(&self, session_id: SessionId) -> SecurityResult<()>;
}

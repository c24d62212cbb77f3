//! # Security Endpoint
//!
//! The forms a participant's security can take behind the
//! [`SecurityEntity`] contract: its own manager, a forwarder to another
//! participant's manager, or nothing at all.

use crate::domain::{PublicKeyOffer, SecretKeyOffer, SessionId, RANDOM_LEN};
use crate::error::{SecurityError, SecurityResult};
use crate::ports::{SecurityEntity, SessionProposal};
use crate::service::SecurityManager;
use async_trait::async_trait;
use sec_policy::{Entities, SecurityContext, TypedCertificate};
use std::sync::Arc;

/// Security endpoint of one participant.
#[derive(Clone)]
pub enum SecurityEndpoint {
    /// Participant owns a manager.
    Local(Arc<SecurityManager>),
    /// Participant defers to another participant's security.
    Forwarder(Arc<dyn SecurityEntity>),
    /// Participant has no security.
    Disabled,
}

impl SecurityEndpoint {
    /// Whether calls can succeed at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Own manager, if any.
    pub fn manager(&self) -> Option<&Arc<SecurityManager>> {
        match self {
            Self::Local(manager) => Some(manager),
            _ => None,
        }
    }

    fn target(&self) -> SecurityResult<&dyn SecurityEntity> {
        match self {
            Self::Local(manager) => Ok(&**manager as &dyn SecurityEntity),
            Self::Forwarder(target) => Ok(&**target),
            Self::Disabled => Err(SecurityError::SecurityNotAvailable),
        }
    }
}

impl std::fmt::Debug for SecurityEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(manager) => f.debug_tuple("Local").field(manager).finish(),
            Self::Forwarder(_) => f.write_str("Forwarder"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

#[async_trait]
impl SecurityEntity for SecurityEndpoint {
    async fn certificate(&self) -> SecurityResult<TypedCertificate> {
        self.target()?.certificate().await
    }

    async fn start_new_session(&self, proposal: SessionProposal) -> SecurityResult<SessionId> {
        self.target()?.start_new_session(proposal).await
    }

    async fn public_key(&self) -> SecurityResult<Vec<u8>> {
        self.target()?.public_key().await
    }

    async fn random_value(
        &self,
        session_id: SessionId,
        client_random: [u8; RANDOM_LEN],
    ) -> SecurityResult<[u8; RANDOM_LEN]> {
        self.target()?.random_value(session_id, client_random).await
    }

    async fn public_key_exchange(
        &self,
        session_id: SessionId,
        offer: PublicKeyOffer,
    ) -> SecurityResult<PublicKeyOffer> {
        self.target()?.public_key_exchange(session_id, offer).await
    }

    async fn secret_key_exchange(
        &self,
        session_id: SessionId,
        offer: SecretKeyOffer,
    ) -> SecurityResult<SecretKeyOffer> {
        self.target()?.secret_key_exchange(session_id, offer).await
    }

    async fn policy(&self, local: Entities, distant: Entities) -> SecurityResult<SecurityContext> {
        self.target()?.policy(local, distant).await
    }

    async fn entities(&self) -> SecurityResult<Entities> {
        self.target()?.entities().await
    }

    async fn terminate_session(&self, session_id: SessionId) -> SecurityResult<()> {
        self.target()?.terminate_session(session_id).await
    }
}

//! # Loopback Wire Adapter
//!
//! Forwards every [`SecurityEntity`] call to an inner entity, passing
//! arguments and results through their bincode encoding on the way. Nothing
//! that cannot be rebuilt from bytes reaches the other side, so a handshake
//! that succeeds over loopback also succeeds over a real transport.

use crate::domain::{PublicKeyOffer, SecretKeyOffer, SessionId, RANDOM_LEN};
use crate::error::SecurityResult;
use crate::ports::{SecurityEntity, SessionProposal};
use async_trait::async_trait;
use sec_policy::{Entities, SecurityContext, TypedCertificate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Byte-level relay to another entity.
pub struct LoopbackEntity {
    inner: Arc<dyn SecurityEntity>,
    frames: AtomicU64,
    bytes: AtomicU64,
}

impl LoopbackEntity {
    /// Relay to `inner`.
    pub fn new(inner: Arc<dyn SecurityEntity>) -> Self {
        Self {
            inner,
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Frames relayed so far (one per argument list, one per result).
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Encoded bytes relayed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    fn relay<T: Serialize + DeserializeOwned>(&self, call: &str, value: &T) -> SecurityResult<T> {
        let frame = bincode::serialize(value)?;
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(frame.len() as u64, Ordering::Relaxed);
        trace!(call, len = frame.len(), "loopback frame");
        Ok(bincode::deserialize(&frame)?)
    }

    fn reply<T: Serialize + DeserializeOwned>(
        &self,
        call: &str,
        result: SecurityResult<T>,
    ) -> SecurityResult<T> {
        self.relay(call, &result)?
    }
}

#[async_trait]
impl SecurityEntity for LoopbackEntity {
    async fn certificate(&self) -> SecurityResult<TypedCertificate> {
        self.relay("certificate", &())?;
        let result = self.inner.certificate().await;
        self.reply("certificate", result)
    }

    async fn start_new_session(&self, proposal: SessionProposal) -> SecurityResult<SessionId> {
        let proposal = self.relay("start_new_session", &proposal)?;
        let result = self.inner.start_new_session(proposal).await;
        self.reply("start_new_session", result)
    }

    async fn public_key(&self) -> SecurityResult<Vec<u8>> {
        self.relay("public_key", &())?;
        let result = self.inner.public_key().await;
        self.reply("public_key", result)
    }

    async fn random_value(
        &self,
        session_id: SessionId,
        client_random: [u8; RANDOM_LEN],
    ) -> SecurityResult<[u8; RANDOM_LEN]> {
        let (session_id, client_random) =
            self.relay("random_value", &(session_id, client_random))?;
        let result = self.inner.random_value(session_id, client_random).await;
        self.reply("random_value", result)
    }

    async fn public_key_exchange(
        &self,
        session_id: SessionId,
        offer: PublicKeyOffer,
    ) -> SecurityResult<PublicKeyOffer> {
        let (session_id, offer) = self.relay("public_key_exchange", &(session_id, offer))?;
        let result = self.inner.public_key_exchange(session_id, offer).await;
        self.reply("public_key_exchange", result)
    }

    async fn secret_key_exchange(
        &self,
        session_id: SessionId,
        offer: SecretKeyOffer,
    ) -> SecurityResult<SecretKeyOffer> {
        let (session_id, offer) = self.relay("secret_key_exchange", &(session_id, offer))?;
        let result = self.inner.secret_key_exchange(session_id, offer).await;
        self.reply("secret_key_exchange", result)
    }

    async fn policy(&self, local: Entities, distant: Entities) -> SecurityResult<SecurityContext> {
        let (local, distant) = self.relay("policy", &(local, distant))?;
        let result = self.inner.policy(local, distant).await;
        self.reply("policy", result)
    }

    async fn entities(&self) -> SecurityResult<Entities> {
        self.relay("entities", &())?;
        let result = self.inner.entities().await;
        self.reply("entities", result)
    }

    async fn terminate_session(&self, session_id: SessionId) -> SecurityResult<()> {
        let session_id = self.relay("terminate_session", &session_id)?;
        let result = self.inner.terminate_session(session_id).await;
        self.reply("terminate_session", result)
    }
}

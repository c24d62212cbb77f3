//! # Session Handshake
//!
//! Per-peer state machine. Phases only move forward:
//!
//! ```text
//! New -> RandomExchanged -> PublicKeyExchanged -> SecretExchanged (validated)
//! ```
//!
//! 1. **Random exchange**: the initiator sends 32 random bytes and receives
//!    the responder's 32. Every later signature covers both values.
//! 2. **Public-key exchange**: each side signs the randoms, its public key
//!    and its certificate. The certificate must be the one presented when
//!    the session was proposed.
//! 3. **Secret exchange**: each side mints AES/IV/HMAC material for its own
//!    outgoing traffic, wraps each part under the peer's RSA key and proves
//!    possession with a 24-byte lock encrypted under the new keys. The
//!    signature covers the wrapped parts and the plaintext lock.
//!
//! Each side therefore seals with the material it generated and opens with
//! the material the peer generated. No secret is derived from both.
//!
//! Signed transcripts are length-prefixed field lists (see
//! [`sec_crypto::transcript`]) starting with a label naming the step and the
//! signer's role, so a signature can never be replayed at another step or
//! reflected back to its author.

use crate::error::{SecurityError, SecurityResult};
use sec_crypto::symmetric::{AES_KEY_LEN, HMAC_KEY_LEN, IV_LEN};
use sec_crypto::{
    random_bytes, transcript, Certificate, IdentityKeyPair, PublicKey, SealedPayload, SessionKeys,
    Zeroizing,
};
use sec_policy::{Direction, Entity, SecurityContext};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Session identifier; never 0 for a live session.
pub type SessionId = u64;

/// Length of each handshake random.
pub const RANDOM_LEN: usize = 32;

/// Length of the key-possession lock.
pub const LOCK_LEN: usize = 24;

/// Handshake progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Registered, nothing exchanged.
    New,
    /// Both randoms known.
    RandomExchanged,
    /// Peer public key verified.
    PublicKeyExchanged,
    /// Both directions keyed.
    SecretExchanged,
}

/// Side of the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Drives the handshake.
    Initiator,
    /// Answers it.
    Responder,
}

impl Role {
    fn peer(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }

    fn public_key_label(self) -> &'static [u8] {
        match self {
            Self::Initiator => b"public-key/initiator",
            Self::Responder => b"public-key/responder",
        }
    }

    fn secret_key_label(self) -> &'static [u8] {
        match self {
            Self::Initiator => b"secret-key/initiator",
            Self::Responder => b"secret-key/responder",
        }
    }
}

/// Phase-2 message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyOffer {
    /// SPKI DER of the sender's public key
    pub public_key: Vec<u8>,
    /// Sender's certificate bytes
    pub certificate: Vec<u8>,
    /// Signature over randoms, key and certificate
    pub signature: Vec<u8>,
}

/// Phase-3 message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeyOffer {
    /// RSA-wrapped AES key
    pub enc_aes_key: Vec<u8>,
    /// RSA-wrapped IV
    pub enc_iv: Vec<u8>,
    /// RSA-wrapped HMAC key
    pub enc_hmac_key: Vec<u8>,
    /// Lock encrypted under the new keys
    pub enc_lock: Vec<u8>,
    /// Signature over randoms, wrapped keys and plaintext lock
    pub signature: Vec<u8>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    direction: Direction,
    body: &'a [u8],
}

#[derive(Deserialize)]
struct Envelope {
    direction: Direction,
    body: Vec<u8>,
}

/// Live handshake and cipher state for one peer.
pub struct Session {
    id: SessionId,
    distant_id: SessionId,
    role: Role,
    context: SecurityContext,
    distant: Entity,
    phase: SessionPhase,
    client_random: Option<[u8; RANDOM_LEN]>,
    server_random: Option<[u8; RANDOM_LEN]>,
    distant_key: Option<PublicKey>,
    send_keys: Option<SessionKeys>,
    receive_keys: Option<SessionKeys>,
    validated: watch::Sender<bool>,
}

impl Session {
    /// Session opened by this side. The distant id is bound later.
    pub fn initiator(id: SessionId, context: SecurityContext, distant: Entity) -> Self {
        Self::new(id, 0, Role::Initiator, context, distant)
    }

    /// Session opened on request of `distant`.
    pub fn responder(
        id: SessionId,
        distant_id: SessionId,
        context: SecurityContext,
        distant: Entity,
    ) -> Self {
        Self::new(id, distant_id, Role::Responder, context, distant)
    }

    fn new(
        id: SessionId,
        distant_id: SessionId,
        role: Role,
        context: SecurityContext,
        distant: Entity,
    ) -> Self {
        let (validated, _) = watch::channel(false);
        Self {
            id,
            distant_id,
            role,
            context,
            distant: distant.no_private_key(),
            phase: SessionPhase::New,
            client_random: None,
            server_random: None,
            distant_key: None,
            send_keys: None,
            receive_keys: None,
            validated,
        }
    }

    /// Record the id the peer assigned.
    pub fn bind_distant(&mut self, distant_id: SessionId) {
        self.distant_id = distant_id;
    }

    /// Local id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Peer's id for this session; 0 until bound.
    pub fn distant_id(&self) -> SessionId {
        self.distant_id
    }

    /// Side of the handshake.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Agreed policy, from the local side.
    pub fn context(&self) -> &SecurityContext {
        &self.context
    }

    /// Peer identity.
    pub fn distant(&self) -> &Entity {
        &self.distant
    }

    /// Whether both directions are keyed and confirmed.
    pub fn is_validated(&self) -> bool {
        *self.validated.borrow()
    }

    /// Watch the validated flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.validated.subscribe()
    }

    fn require(&self, role: Option<Role>, phase: SessionPhase) -> SecurityResult<()> {
        if role.is_some_and(|r| r != self.role) || self.phase != phase {
            return Err(SecurityError::key_exchange(format!(
                "session {} is a {:?} in phase {:?}, expected {:?}",
                self.id, self.role, self.phase, phase
            )));
        }
        Ok(())
    }

    fn randoms(&self) -> SecurityResult<([u8; RANDOM_LEN], [u8; RANDOM_LEN])> {
        match (self.client_random, self.server_random) {
            (Some(client), Some(server)) => Ok((client, server)),
            _ => Err(SecurityError::key_exchange("randoms not exchanged")),
        }
    }

    fn distant_key(&self) -> SecurityResult<&PublicKey> {
        self.distant_key
            .as_ref()
            .ok_or_else(|| SecurityError::key_exchange("peer public key unknown"))
    }

    // ------------------------------------------------------------------
    // Phase 1
    // ------------------------------------------------------------------

    /// Initiator: draw the client random.
    pub fn begin_random_exchange(&mut self) -> SecurityResult<[u8; RANDOM_LEN]> {
        self.require(Some(Role::Initiator), SessionPhase::New)?;
        let client = random_bytes();
        self.client_random = Some(client);
        Ok(client)
    }

    /// Initiator: record the responder's random.
    pub fn complete_random_exchange(&mut self, server: [u8; RANDOM_LEN]) -> SecurityResult<()> {
        self.require(Some(Role::Initiator), SessionPhase::New)?;
        if self.client_random.is_none() {
            return Err(SecurityError::key_exchange("client random not drawn"));
        }
        self.server_random = Some(server);
        self.advance(SessionPhase::RandomExchanged);
        Ok(())
    }

    /// Responder: record the client random and answer with a fresh one.
    pub fn accept_client_random(
        &mut self,
        client: [u8; RANDOM_LEN],
    ) -> SecurityResult<[u8; RANDOM_LEN]> {
        self.require(Some(Role::Responder), SessionPhase::New)?;
        let server = random_bytes();
        self.client_random = Some(client);
        self.server_random = Some(server);
        self.advance(SessionPhase::RandomExchanged);
        Ok(server)
    }

    // ------------------------------------------------------------------
    // Phase 2
    // ------------------------------------------------------------------

    fn public_key_transcript(
        &self,
        signer: Role,
        public_key: &[u8],
        certificate: &[u8],
    ) -> SecurityResult<Vec<u8>> {
        let (client, server) = self.randoms()?;
        Ok(transcript(&[
            signer.public_key_label(),
            &client,
            &server,
            public_key,
            certificate,
        ]))
    }

    /// Sign this side's public key and certificate.
    pub fn public_key_offer(
        &self,
        certificate: &Certificate,
        keys: &IdentityKeyPair,
    ) -> SecurityResult<PublicKeyOffer> {
        self.require(None, SessionPhase::RandomExchanged)?;
        let public_key = keys
            .public_key()
            .to_bytes()
            .map_err(SecurityError::key_exchange)?;
        let certificate = certificate.to_bytes().map_err(SecurityError::key_exchange)?;
        let signature = keys
            .sign(&self.public_key_transcript(self.role, &public_key, &certificate)?)
            .map_err(SecurityError::key_exchange)?;
        Ok(PublicKeyOffer {
            public_key,
            certificate,
            signature,
        })
    }

    /// Verify the peer's offer against the certificate it was admitted with.
    pub fn accept_public_key(&mut self, offer: &PublicKeyOffer) -> SecurityResult<()> {
        self.require(None, SessionPhase::RandomExchanged)?;
        let certificate =
            Certificate::from_bytes(&offer.certificate).map_err(SecurityError::key_exchange)?;
        if &certificate != self.distant.leaf().certificate() {
            return Err(SecurityError::key_exchange(format!(
                "offered certificate '{}' is not the admitted peer '{}'",
                certificate.subject(),
                self.distant
            )));
        }
        if offer.public_key != certificate.public_key_bytes() {
            return Err(SecurityError::key_exchange(
                "offered public key does not match its certificate",
            ));
        }
        let key = PublicKey::from_bytes(&offer.public_key).map_err(SecurityError::key_exchange)?;
        let message =
            self.public_key_transcript(self.role.peer(), &offer.public_key, &offer.certificate)?;
        key.verify(&message, &offer.signature)
            .map_err(SecurityError::key_exchange)?;

        self.distant_key = Some(key);
        self.advance(SessionPhase::PublicKeyExchanged);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 3
    // ------------------------------------------------------------------

    fn secret_key_transcript(
        &self,
        signer: Role,
        offer: &SecretKeyOffer,
        lock: &[u8],
    ) -> SecurityResult<Vec<u8>> {
        let (client, server) = self.randoms()?;
        Ok(transcript(&[
            signer.secret_key_label(),
            &client,
            &server,
            &offer.enc_aes_key,
            &offer.enc_iv,
            &offer.enc_hmac_key,
            lock,
        ]))
    }

    /// Mint this side's sending keys and wrap them for the peer.
    pub fn secret_key_offer(&mut self, keys: &IdentityKeyPair) -> SecurityResult<SecretKeyOffer> {
        self.require(None, SessionPhase::PublicKeyExchanged)?;
        if self.send_keys.is_some() {
            return Err(SecurityError::key_exchange("sending keys already minted"));
        }
        let distant_key = self.distant_key()?;
        let session_keys = SessionKeys::generate();
        let lock: [u8; LOCK_LEN] = random_bytes();

        let mut offer = SecretKeyOffer {
            enc_aes_key: wrap_part(distant_key, session_keys.aes_key())?,
            enc_iv: wrap_part(distant_key, session_keys.iv())?,
            enc_hmac_key: wrap_part(distant_key, session_keys.hmac_key())?,
            enc_lock: session_keys.encrypt_raw(&lock),
            signature: Vec::new(),
        };
        offer.signature = keys
            .sign(&self.secret_key_transcript(self.role, &offer, &lock)?)
            .map_err(SecurityError::key_exchange)?;

        self.send_keys = Some(session_keys);
        self.advance_if_keyed();
        Ok(offer)
    }

    /// Unwrap the peer's sending keys and install them for receiving.
    pub fn accept_secret_key(
        &mut self,
        offer: &SecretKeyOffer,
        keys: &IdentityKeyPair,
    ) -> SecurityResult<()> {
        self.require(None, SessionPhase::PublicKeyExchanged)?;
        if self.receive_keys.is_some() {
            return Err(SecurityError::key_exchange("receiving keys already installed"));
        }
        let session_keys = SessionKeys::from_parts(
            &unwrap_part(keys, &offer.enc_aes_key, AES_KEY_LEN, "AES key")?,
            &unwrap_part(keys, &offer.enc_iv, IV_LEN, "IV")?,
            &unwrap_part(keys, &offer.enc_hmac_key, HMAC_KEY_LEN, "HMAC key")?,
        )
        .map_err(SecurityError::key_exchange)?;

        let lock = session_keys
            .decrypt_raw(&offer.enc_lock)
            .map_err(SecurityError::key_exchange)?;
        if lock.len() != LOCK_LEN {
            return Err(SecurityError::key_exchange("lock has the wrong length"));
        }
        let message = self.secret_key_transcript(self.role.peer(), offer, &lock)?;
        self.distant_key()?
            .verify(&message, &offer.signature)
            .map_err(SecurityError::key_exchange)?;

        self.receive_keys = Some(session_keys);
        self.advance_if_keyed();
        Ok(())
    }

    fn advance_if_keyed(&mut self) {
        if self.send_keys.is_some() && self.receive_keys.is_some() {
            self.advance(SessionPhase::SecretExchanged);
        }
    }

    fn advance(&mut self, next: SessionPhase) {
        debug!(session_id = self.id, role = ?self.role, phase = ?next, "session phase");
        self.phase = next;
    }

    /// Mark the session usable. Idempotent; never reverts.
    pub fn validate(&mut self) -> SecurityResult<()> {
        self.require(None, SessionPhase::SecretExchanged)?;
        self.validated.send_replace(true);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Traffic
    // ------------------------------------------------------------------

    fn ready(&self) -> SecurityResult<()> {
        if !self.is_validated() {
            return Err(SecurityError::renegotiate(self.id, "session not validated"));
        }
        Ok(())
    }

    /// Seal an outgoing payload belonging to invocation leg `direction`.
    ///
    /// Outgoing traffic is governed by the request side of the local
    /// context.
    pub fn seal(&self, direction: Direction, body: &[u8]) -> SecurityResult<SealedPayload> {
        self.ready()?;
        if !self.context.request().is_allowed() {
            return Err(SecurityError::CommunicationForbidden(format!(
                "outgoing traffic to {} is not allowed",
                self.distant
            )));
        }
        let keys = self
            .send_keys
            .as_ref()
            .ok_or_else(|| SecurityError::renegotiate(self.id, "no sending keys"))?;
        let envelope = bincode::serialize(&EnvelopeRef { direction, body })?;
        Ok(keys.seal(&envelope)?)
    }

    /// Open an incoming payload, checking it was sealed for `direction`.
    ///
    /// Incoming traffic is governed by the reply side of the local context.
    pub fn open(&self, direction: Direction, sealed: &SealedPayload) -> SecurityResult<Vec<u8>> {
        self.ready()?;
        if !self.context.reply().is_allowed() {
            return Err(SecurityError::CommunicationForbidden(format!(
                "incoming traffic from {} is not allowed",
                self.distant
            )));
        }
        let keys = self
            .receive_keys
            .as_ref()
            .ok_or_else(|| SecurityError::renegotiate(self.id, "no receiving keys"))?;
        let envelope: Envelope = bincode::deserialize(&keys.open(sealed)?)?;
        if envelope.direction != direction {
            return Err(SecurityError::Crypto(format!(
                "payload sealed as {:?} opened as {direction:?}",
                envelope.direction
            )));
        }
        Ok(envelope.body)
    }
}

fn wrap_part(key: &PublicKey, part: &[u8]) -> SecurityResult<Vec<u8>> {
    key.encrypt(part).map_err(SecurityError::key_exchange)
}

fn unwrap_part(
    keys: &IdentityKeyPair,
    wrapped: &[u8],
    len: usize,
    what: &str,
) -> SecurityResult<Zeroizing<Vec<u8>>> {
    let plain = keys.decrypt(wrapped).map_err(SecurityError::key_exchange)?;
    if plain.len() != len {
        return Err(SecurityError::key_exchange(format!(
            "{what} is {} bytes, expected {len}",
            plain.len()
        )));
    }
    Ok(plain)
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("distant_id", &self.distant_id)
            .field("role", &self.role)
            .field("distant", &self.distant.to_string())
            .field("phase", &self.phase)
            .field("validated", &self.is_validated())
            .finish()
    }
}

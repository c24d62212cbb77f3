//! # Certificates
//!
//! A deliberately small certificate model: subject, issuer, serial, the
//! subject's RSA public key and the issuer's signature over those fields.
//! Certificates never carry live key handles; they cross process boundaries
//! only as the canonical bytes produced by [`Certificate::to_bytes`].

use crate::hashing::Fingerprint;
use crate::signatures::{IdentityKeyPair, PublicKey};
use crate::CryptoError;
use serde::{Deserialize, Serialize};

/// Signed binding between a subject name and an RSA public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    serial: u64,
    subject: String,
    issuer: String,
    public_key: Vec<u8>,
    signature: Vec<u8>,
}

#[derive(Serialize)]
struct SignedBody<'a> {
    serial: u64,
    subject: &'a str,
    issuer: &'a str,
    public_key: &'a [u8],
}

impl Certificate {
    /// Mint a self-signed root certificate.
    pub fn self_signed(
        subject: impl Into<String>,
        keys: &IdentityKeyPair,
    ) -> Result<Self, CryptoError> {
        let subject = subject.into();
        Self::sign_new(subject.clone(), subject, keys.public_key(), keys)
    }

    /// Mint a certificate for `subject_key`, signed by `issuer`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::IssuerMismatch` if `issuer_keys` is not the key
    /// pair named by `issuer`.
    pub fn issue(
        subject: impl Into<String>,
        subject_key: &PublicKey,
        issuer: &Certificate,
        issuer_keys: &IdentityKeyPair,
    ) -> Result<Self, CryptoError> {
        let subject = subject.into();
        if &issuer.public_key()? != issuer_keys.public_key() {
            return Err(CryptoError::IssuerMismatch {
                subject,
                issuer: issuer.subject.clone(),
            });
        }
        Self::sign_new(subject, issuer.subject.clone(), subject_key, issuer_keys)
    }

    fn sign_new(
        subject: String,
        issuer: String,
        subject_key: &PublicKey,
        signer: &IdentityKeyPair,
    ) -> Result<Self, CryptoError> {
        let mut cert = Self {
            serial: rand::random(),
            subject,
            issuer,
            public_key: subject_key.to_bytes()?,
            signature: Vec::new(),
        };
        cert.signature = signer.sign(&cert.signed_body()?)?;
        Ok(cert)
    }

    fn signed_body(&self) -> Result<Vec<u8>, CryptoError> {
        bincode::serialize(&SignedBody {
            serial: self.serial,
            subject: &self.subject,
            issuer: &self.issuer,
            public_key: &self.public_key,
        })
        .map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
    }

    /// Check that `issuer` signed this certificate.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<(), CryptoError> {
        if self.issuer != issuer.subject {
            return Err(CryptoError::IssuerMismatch {
                subject: self.subject.clone(),
                issuer: issuer.subject.clone(),
            });
        }
        issuer
            .public_key()?
            .verify(&self.signed_body()?, &self.signature)
    }

    /// True for a root whose signature verifies under its own key.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer && self.verify_issued_by(self).is_ok()
    }

    /// Subject name.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer name.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Decode the embedded public key.
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        PublicKey::from_bytes(&self.public_key)
    }

    /// SPKI DER of the embedded public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// Identity of this certificate, independent of encoding.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_parts(&[
            &self.serial.to_be_bytes(),
            self.subject.as_bytes(),
            self.issuer.as_bytes(),
            &self.public_key,
            &self.signature,
        ])
    }

    /// Canonical byte encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        bincode::serialize(self).map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
    }

    /// Inverse of [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        bincode::deserialize(bytes).map_err(|e| CryptoError::MalformedCertificate(e.to_string()))
    }
}

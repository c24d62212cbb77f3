//! # RSA Identity Keys
//!
//! Every participant owns one RSA key pair. The private half signs handshake
//! transcripts and unwraps session secrets; the public half travels inside the
//! participant's certificate.
//!
//! ## Algorithms
//!
//! - Signatures: RSASSA-PKCS1-v1_5 over SHA-256
//! - Key wrapping: RSAES-PKCS1-v1_5
//! - Encodings: SPKI DER (public), PKCS#8 DER (private)

use crate::CryptoError;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

/// Smallest modulus accepted when minting identities.
pub const MIN_KEY_BITS: usize = 1024;

/// RSA public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Decode from SPKI DER.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        RsaPublicKey::from_public_key_der(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Encode as SPKI DER.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        self.0
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.0.size() * 8
    }

    /// Verify a PKCS#1 v1.5 / SHA-256 signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let signature =
            Signature::try_from(signature).map_err(|_| CryptoError::InvalidSignatureFormat)?;

        VerifyingKey::<Sha256>::new(self.0.clone())
            .verify(message, &signature)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Wrap a short secret so only the private key holder can read it.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.0
            .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }
}

/// RSA key pair owned by one participant.
#[derive(Clone)]
pub struct IdentityKeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl IdentityKeyPair {
    /// Generate a fresh key pair.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyGenerationFailed` for moduli below
    /// [`MIN_KEY_BITS`] or when the generator fails.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        if bits < MIN_KEY_BITS {
            return Err(CryptoError::KeyGenerationFailed(format!(
                "{bits}-bit modulus is below the {MIN_KEY_BITS}-bit minimum"
            )));
        }

        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let public = PublicKey(RsaPublicKey::from(&private));
        Ok(Self { private, public })
    }

    /// Restore from PKCS#8 DER.
    pub fn from_pkcs8_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        let private =
            RsaPrivateKey::from_pkcs8_der(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = PublicKey(RsaPublicKey::from(&private));
        Ok(Self { private, public })
    }

    /// Export as PKCS#8 DER. The buffer is wiped when dropped.
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.private
            .to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|_| CryptoError::InvalidPrivateKey)
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Sign a message (PKCS#1 v1.5 over SHA-256).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        SigningKey::<Sha256>::new(self.private.clone())
            .try_sign(message)
            .map(|sig| sig.to_vec())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))
    }

    /// Unwrap a secret produced by [`PublicKey::encrypt`].
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.private
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map(Zeroizing::new)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKeyPair({} bits, ***)", self.public.bits())
    }
}

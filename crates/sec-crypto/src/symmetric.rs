//! # Session Ciphers
//!
//! Authenticated encryption composed explicitly from AES-256-CBC (PKCS#7
//! padding) and HMAC-SHA256 in encrypt-then-MAC order.
//!
//! One [`SessionKeys`] bundle protects one direction of one session. The
//! bundle is minted by the sending side and delivered to the receiver wrapped
//! under the receiver's RSA key.

use crate::CryptoError;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES-256 key length.
pub const AES_KEY_LEN: usize = 32;
/// CBC initialisation vector length.
pub const IV_LEN: usize = 16;
/// HMAC-SHA256 key length.
pub const HMAC_KEY_LEN: usize = 32;

/// Fill an array with OS-seeded random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    bytes
}

/// Ciphertext plus its MAC, as carried on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    /// AES-256-CBC ciphertext
    pub ciphertext: Vec<u8>,
    /// HMAC-SHA256 over the ciphertext
    pub mac: Vec<u8>,
}

/// Symmetric material for one traffic direction.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    aes_key: [u8; AES_KEY_LEN],
    iv: [u8; IV_LEN],
    hmac_key: [u8; HMAC_KEY_LEN],
}

impl SessionKeys {
    /// Generate a fresh random bundle.
    pub fn generate() -> Self {
        Self {
            aes_key: random_bytes(),
            iv: random_bytes(),
            hmac_key: random_bytes(),
        }
    }

    /// Rebuild a bundle from unwrapped slices, checking every length.
    pub fn from_parts(aes_key: &[u8], iv: &[u8], hmac_key: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            aes_key: aes_key
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: AES_KEY_LEN,
                    actual: aes_key.len(),
                })?,
            iv: iv.try_into().map_err(|_| CryptoError::InvalidIvLength {
                expected: IV_LEN,
                actual: iv.len(),
            })?,
            hmac_key: hmac_key
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: HMAC_KEY_LEN,
                    actual: hmac_key.len(),
                })?,
        })
    }

    /// AES key bytes.
    pub fn aes_key(&self) -> &[u8; AES_KEY_LEN] {
        &self.aes_key
    }

    /// IV bytes.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// HMAC key bytes.
    pub fn hmac_key(&self) -> &[u8; HMAC_KEY_LEN] {
        &self.hmac_key
    }

    /// AES-256-CBC only, no MAC.
    pub fn encrypt_raw(&self, plaintext: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(&self.aes_key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Inverse of [`Self::encrypt_raw`].
    pub fn decrypt_raw(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Aes256CbcDec::new(&self.aes_key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }

    /// HMAC-SHA256 tag over `data`.
    pub fn mac(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut mac = hmac_with_key(&self.hmac_key)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Encrypt then MAC.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedPayload, CryptoError> {
        let ciphertext = self.encrypt_raw(plaintext);
        let mac = self.mac(&ciphertext)?;
        Ok(SealedPayload { ciphertext, mac })
    }

    /// Verify the MAC in constant time, then decrypt.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MacMismatch` before touching the ciphertext if
    /// the tag does not verify.
    pub fn open(&self, sealed: &SealedPayload) -> Result<Vec<u8>, CryptoError> {
        let mut mac = hmac_with_key(&self.hmac_key)?;
        mac.update(&sealed.ciphertext);
        mac.verify_slice(&sealed.mac)
            .map_err(|_| CryptoError::MacMismatch)?;

        self.decrypt_raw(&sealed.ciphertext)
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys(***)")
    }
}

fn hmac_with_key(key: &[u8; HMAC_KEY_LEN]) -> Result<HmacSha256, CryptoError> {
    HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: HMAC_KEY_LEN,
        actual: key.len(),
    })
}

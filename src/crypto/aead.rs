//! Authenticated encryption with internally generated nonces.
//!
//! - **AES-256-GCM**: chosen for profiles whose CPU has AES instructions
//! - **ChaCha20-Poly1305**: constant-time in software everywhere else
//!
//! Callers never supply a nonce for encryption. Each call draws 12 fresh
//! bytes from the OS RNG, which keeps nonce reuse under one key
//! negligible for the message counts a session key sees before expiry.
//!
//! Every authentication failure (tampered ciphertext, nonce, tag or
//! associated data, or the wrong key) maps to the same
//! [`CryptoError::DecryptionAuthFailure`] with no detail attached.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;

use super::algorithm::{AeadCipher, AEAD_NONCE_LEN, AEAD_TAG_LEN};
use super::errors::CryptoError;
use super::SymmetricKey;

fn seal_with<C>(key: &SymmetricKey, nonce: &[u8; AEAD_NONCE_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: Aead + KeyInit,
{
    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::invalid_size("AEAD key", 32, key.as_bytes().len()))?;
    cipher
        .encrypt(
            aes_gcm::aead::Nonce::<C>::from_slice(nonce),
            Payload { msg: plaintext, aad },
        )
        .map_err(|_| CryptoError::InvalidFormat("plaintext too long for AEAD".into()))
}

fn open_with<C>(key: &SymmetricKey, nonce: &[u8; AEAD_NONCE_LEN], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: Aead + KeyInit,
{
    let cipher = C::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::DecryptionAuthFailure)?;
    cipher
        .decrypt(
            aes_gcm::aead::Nonce::<C>::from_slice(nonce),
            Payload { msg: ciphertext, aad },
        )
        .map_err(|_| CryptoError::DecryptionAuthFailure)
}

/// AEAD operations for a fixed cipher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymmetricCipherProvider {
    cipher: AeadCipher,
}

impl SymmetricCipherProvider {
    /// Creates a provider for `cipher`.
    pub fn new(cipher: AeadCipher) -> Self {
        Self { cipher }
    }

    /// The cipher this provider is bound to.
    pub fn cipher(&self) -> AeadCipher {
        self.cipher
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// Returns `(ciphertext || tag, nonce)`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
        associated_data: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; AEAD_NONCE_LEN]), CryptoError> {
        let mut nonce = [0u8; AEAD_NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let aad = associated_data.unwrap_or_default();

        let ciphertext = match self.cipher {
            AeadCipher::Aes256Gcm => seal_with::<Aes256Gcm>(key, &nonce, plaintext, aad)?,
            AeadCipher::ChaCha20Poly1305 => {
                seal_with::<ChaCha20Poly1305>(key, &nonce, plaintext, aad)?
            }
        };
        Ok((ciphertext, nonce))
    }

    /// Decrypts and authenticates `ciphertext`.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &SymmetricKey,
        nonce: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let nonce: &[u8; AEAD_NONCE_LEN] = nonce.try_into().map_err(|_| {
            CryptoError::InvalidFormat(format!(
                "nonce must be {AEAD_NONCE_LEN} bytes, got {}",
                nonce.len()
            ))
        })?;
        if ciphertext.len() < AEAD_TAG_LEN {
            return Err(CryptoError::DecryptionAuthFailure);
        }
        let aad = associated_data.unwrap_or_default();

        match self.cipher {
            AeadCipher::Aes256Gcm => open_with::<Aes256Gcm>(key, nonce, ciphertext, aad),
            AeadCipher::ChaCha20Poly1305 => {
                open_with::<ChaCha20Poly1305>(key, nonce, ciphertext, aad)
            }
        }
    }

    /// Encrypts into one opaque `nonce || ciphertext` blob.
    pub fn encrypt_blob(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let (ciphertext, nonce) = self.encrypt(plaintext, key, associated_data)?;
        let mut blob = Vec::with_capacity(AEAD_NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypts a blob produced by [`Self::encrypt_blob`].
    ///
    /// Fails with `InvalidFormat` if the blob cannot even hold a nonce.
    pub fn decrypt_blob(
        &self,
        blob: &[u8],
        key: &SymmetricKey,
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        if blob.len() < AEAD_NONCE_LEN {
            return Err(CryptoError::InvalidFormat(format!(
                "blob of {} bytes is shorter than the {AEAD_NONCE_LEN}-byte nonce",
                blob.len()
            )));
        }
        let (nonce, ciphertext) = blob.split_at(AEAD_NONCE_LEN);
        self.decrypt(ciphertext, key, nonce, associated_data)
    }
}

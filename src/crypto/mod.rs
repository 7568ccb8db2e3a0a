//! Post-quantum primitives and their orchestration for qshield.
//!
//! Algorithms are never called directly by the session or telemetry layers.
//! They are dispatched through a [`CryptoProvider`] backend chosen from the
//! [`registry`] at initialization, wrapped in typed strategy objects that
//! enforce each variant's fixed size table.
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`algorithm`] | Variant enums and fixed size tables |
//! | [`errors`] | `CryptoError` type for all crypto operations |
//! | [`registry`] | Runtime algorithm-to-backend mapping |
//! | [`providers`] | Concrete `CryptoProvider` backends |
//! | [`kem`] | Size-checked KEM strategy |
//! | [`signature`] | Size-checked signature strategy |
//! | [`aead`] | AEAD encryption with internal nonce generation |
//! | [`kdf`] | HKDF-SHA-256 session-key derivation |
//! | [`profile`] | Device profiles, suite table, profile selection |
//!
//! ## Standards
//!
//! | FIPS | Algorithm | Status |
//! |------|-----------|--------|
//! | FIPS 203 | ML-KEM (CRYSTALS-Kyber) | Implemented |
//! | FIPS 204 | ML-DSA (CRYSTALS-Dilithium) | Implemented |

pub mod aead;
pub mod algorithm;
pub mod errors;
pub mod kdf;
pub mod kem;
pub mod profile;
pub mod providers;
pub mod registry;
pub mod signature;

pub use algorithm::{
    AeadCipher, AlgorithmDescriptor, AlgorithmVariant, KemAlgorithm, SignatureAlgorithm,
};
pub use errors::CryptoError;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Opaque wrapper for public key bytes. Does not implement `Display`
/// to keep key material out of log lines.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyBytes(pub Vec<u8>);

impl std::fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKeyBytes([{} bytes])", self.0.len())
    }
}

/// Opaque wrapper for signature bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureBytes(pub Vec<u8>);

impl std::fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureBytes([{} bytes])", self.0.len())
    }
}

/// Opaque wrapper for KEM ciphertext bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct CiphertextBytes(pub Vec<u8>);

impl std::fmt::Debug for CiphertextBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CiphertextBytes([{} bytes])", self.0.len())
    }
}

/// Private key bytes for either a KEM or a signature variant.
/// Cleared from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyBytes(pub Vec<u8>);

impl std::fmt::Debug for SecretKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKeyBytes([REDACTED])")
    }
}

/// Raw shared secret from KEM encapsulation or decapsulation.
/// Only ever fed to the KDF; cleared from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(pub Vec<u8>);

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// A 32-byte AEAD key. Construction checks the length, so holding one
/// is proof the size is right.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; algorithm::AEAD_KEY_LEN]);

impl SymmetricKey {
    /// Wraps an owned key array.
    pub fn new(bytes: [u8; algorithm::AEAD_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copies a key out of a slice, rejecting any length but 32.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; algorithm::AEAD_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::invalid_size("symmetric key", algorithm::AEAD_KEY_LEN, bytes.len())
        })?;
        Ok(Self(array))
    }

    /// Generates a uniformly random key from the OS RNG.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; algorithm::AEAD_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Borrows the key bytes.
    pub fn as_bytes(&self) -> &[u8; algorithm::AEAD_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// A public/private keypair bound to its variant and owner.
///
/// The private half zeroizes on drop. Call [`KeyPair::zeroize_private`] to
/// clear it earlier once the caller is done signing or decapsulating.
#[derive(Clone)]
pub struct KeyPair {
    /// Public key bytes.
    pub public: PublicKeyBytes,
    /// Private key bytes.
    pub private: SecretKeyBytes,
    /// Which primitive the key belongs to.
    pub variant: AlgorithmVariant,
    /// Owner the keypair was generated for.
    pub owner_id: String,
}

impl KeyPair {
    /// Checks both halves against the variant's size table.
    pub fn validate(&self) -> Result<(), CryptoError> {
        let expected = self.variant.public_key_len();
        if self.public.0.len() != expected {
            return Err(CryptoError::invalid_size(
                format!("{} public key", self.variant),
                expected,
                self.public.0.len(),
            ));
        }
        let expected = self.variant.private_key_len();
        if self.private.0.len() != expected {
            return Err(CryptoError::invalid_size(
                format!("{} private key", self.variant),
                expected,
                self.private.0.len(),
            ));
        }
        Ok(())
    }

    /// Overwrites the private key with zeros and empties it.
    pub fn zeroize_private(&mut self) {
        self.private.zeroize();
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("private", &self.private)
            .field("variant", &self.variant)
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

/// Result of a signature verification operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationResult {
    /// Signature is valid.
    Valid,
    /// Signature is invalid (the message or key doesn't match).
    Invalid {
        /// Human-readable reason for the failure.
        reason: String,
    },
}

impl VerificationResult {
    /// Returns `true` if the verification passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// The backend abstraction for all asymmetric operations.
///
/// A backend receives already-typed variants; size checks against the
/// variant tables happen in the [`kem`] and [`signature`] strategy layers
/// before and after each call.
pub trait CryptoProvider: Send + Sync {
    /// Returns a unique identifier for this backend (e.g., `"rustcrypto"`).
    fn provider_id(&self) -> &'static str;

    /// `false` for stand-in backends that offer no real security.
    fn is_secure(&self) -> bool;

    /// Lists all algorithms implemented by this backend.
    fn supported_algorithms(&self) -> Vec<AlgorithmDescriptor>;

    /// Generates a fresh KEM keypair as `(public, private)`.
    fn generate_kem_keypair(
        &self,
        algorithm: KemAlgorithm,
    ) -> Result<(PublicKeyBytes, SecretKeyBytes), CryptoError>;

    /// Encapsulates to `public_key`, returning the shared secret and the
    /// ciphertext for the key holder.
    fn encapsulate(
        &self,
        algorithm: KemAlgorithm,
        public_key: &PublicKeyBytes,
    ) -> Result<(SharedSecret, CiphertextBytes), CryptoError>;

    /// Decapsulates a KEM ciphertext to recover the shared secret.
    fn decapsulate(
        &self,
        algorithm: KemAlgorithm,
        secret_key: &SecretKeyBytes,
        ciphertext: &CiphertextBytes,
    ) -> Result<SharedSecret, CryptoError>;

    /// Generates a fresh signature keypair as `(public, private)`.
    fn generate_signature_keypair(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<(PublicKeyBytes, SecretKeyBytes), CryptoError>;

    /// Signs `message` with `secret_key`.
    fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        secret_key: &SecretKeyBytes,
        message: &[u8],
    ) -> Result<SignatureBytes, CryptoError>;

    /// Verifies a signature against a public key and message.
    ///
    /// Returns `Ok(VerificationResult::Valid)` if the signature is valid,
    /// `Ok(VerificationResult::Invalid)` if it is malformed or does not
    /// match, or `Err(CryptoError)` if the operation itself cannot run.
    fn verify_signature(
        &self,
        algorithm: SignatureAlgorithm,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<VerificationResult, CryptoError>;
}

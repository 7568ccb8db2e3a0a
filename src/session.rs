//! KEM-based session-key agreement.
//!
//! The initiator encapsulates to the peer's KEM public key and keeps the
//! derived key; the peer decapsulates the returned ciphertext and runs the
//! same derivation. Neither side ever holds the raw shared secret past
//! [`derive_session_key`].

use log::debug;

use crate::crypto::kdf::derive_session_key;
use crate::crypto::kem::KemProvider;
use crate::crypto::profile::DeviceProfile;
use crate::crypto::registry::AlgorithmRegistry;
use crate::crypto::{CiphertextBytes, CryptoError, SecretKeyBytes, SymmetricKey};

/// Session setup bound to one profile for its whole lifetime.
#[derive(Clone, Debug)]
pub struct SessionEstablisher {
    profile: DeviceProfile,
    kem: KemProvider,
}

impl SessionEstablisher {
    /// Binds the profile's KEM to its registered backend.
    pub fn new(profile: DeviceProfile, registry: &AlgorithmRegistry) -> Result<Self, CryptoError> {
        Ok(Self {
            profile,
            kem: KemProvider::new(profile.suite().kem, registry)?,
        })
    }

    /// The fixed profile.
    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// The KEM strategy in use.
    pub fn kem(&self) -> &KemProvider {
        &self.kem
    }

    /// Initiator side: returns `(session_key, ciphertext_for_peer)`.
    pub fn establish(&self, peer_public: &[u8]) -> Result<(SymmetricKey, CiphertextBytes), CryptoError> {
        let (shared, ciphertext) = self.kem.encapsulate(peer_public)?;
        let key = derive_session_key(shared)?;
        debug!(
            "session established with {} ({}-byte ciphertext)",
            self.kem.algorithm().id(),
            ciphertext.0.len()
        );
        Ok((key, ciphertext))
    }

    /// Peer side: recovers the session key from `ciphertext`.
    ///
    /// ML-KEM rejects implicitly, so a ciphertext for another key yields a
    /// different session key rather than an error. The mismatch surfaces at
    /// the first AEAD open.
    pub fn accept(&self, ciphertext: &[u8], private: &SecretKeyBytes) -> Result<SymmetricKey, CryptoError> {
        let shared = self.kem.decapsulate(ciphertext, private)?;
        derive_session_key(shared)
    }
}

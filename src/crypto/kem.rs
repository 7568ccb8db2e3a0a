//! Size-checked KEM strategy bound to one ML-KEM variant.
//!
//! `KemProvider` wraps whichever backend the registry routes its variant to
//! and enforces the variant's size table on every input and output, so a
//! wrong-length key or ciphertext is rejected with a typed error before the
//! backend ever sees it.

use std::sync::Arc;

use log::debug;

use super::algorithm::{AlgorithmVariant, KemAlgorithm};
use super::errors::CryptoError;
use super::registry::AlgorithmRegistry;
use super::{CiphertextBytes, CryptoProvider, KeyPair, PublicKeyBytes, SecretKeyBytes, SharedSecret};

/// KEM operations for a fixed variant.
#[derive(Clone)]
pub struct KemProvider {
    algorithm: KemAlgorithm,
    backend: Arc<dyn CryptoProvider>,
}

impl KemProvider {
    /// Binds `algorithm` to its registered backend.
    pub fn new(algorithm: KemAlgorithm, registry: &AlgorithmRegistry) -> Result<Self, CryptoError> {
        Ok(Self {
            algorithm,
            backend: registry.kem_provider(algorithm)?,
        })
    }

    /// The variant this provider is bound to.
    pub fn algorithm(&self) -> KemAlgorithm {
        self.algorithm
    }

    /// Identifier of the backend doing the work.
    pub fn backend_id(&self) -> &'static str {
        self.backend.provider_id()
    }

    /// Generates a fresh keypair of exactly the variant's sizes.
    pub fn generate_keypair(&self, owner_id: &str) -> Result<KeyPair, CryptoError> {
        let (public, private) = self.backend.generate_kem_keypair(self.algorithm)?;
        let keypair = KeyPair {
            public,
            private,
            variant: AlgorithmVariant::Kem(self.algorithm),
            owner_id: owner_id.to_string(),
        };
        keypair.validate()?;
        debug!("generated {} keypair for '{owner_id}'", self.algorithm.id());
        Ok(keypair)
    }

    /// Encapsulates to `peer_public`, returning `(shared_secret, ciphertext)`.
    pub fn encapsulate(&self, peer_public: &[u8]) -> Result<(SharedSecret, CiphertextBytes), CryptoError> {
        let sizes = self.algorithm.sizes();
        if peer_public.len() != sizes.public_key {
            return Err(CryptoError::invalid_size(
                format!("{} public key", self.algorithm.id()),
                sizes.public_key,
                peer_public.len(),
            ));
        }

        let (shared, ciphertext) = self
            .backend
            .encapsulate(self.algorithm, &PublicKeyBytes(peer_public.to_vec()))?;
        if shared.0.len() != sizes.shared_secret || ciphertext.0.len() != sizes.ciphertext {
            return Err(CryptoError::EncapsulationFailure(format!(
                "{} backend returned mis-sized output",
                self.algorithm.id()
            )));
        }
        Ok((shared, ciphertext))
    }

    /// Recovers the shared secret from `ciphertext` with `private`.
    ///
    /// ML-KEM uses implicit rejection: a well-formed ciphertext under the
    /// wrong key yields an unrelated secret rather than an error, and the
    /// mismatch surfaces later as an AEAD authentication failure.
    pub fn decapsulate(&self, ciphertext: &[u8], private: &SecretKeyBytes) -> Result<SharedSecret, CryptoError> {
        let sizes = self.algorithm.sizes();
        if ciphertext.len() != sizes.ciphertext {
            return Err(CryptoError::DecapsulationFailure(format!(
                "{} ciphertext must be {} bytes, got {}",
                self.algorithm.id(),
                sizes.ciphertext,
                ciphertext.len()
            )));
        }
        if private.0.len() != sizes.private_key {
            return Err(CryptoError::DecapsulationFailure(format!(
                "{} private key must be {} bytes, got {}",
                self.algorithm.id(),
                sizes.private_key,
                private.0.len()
            )));
        }

        let shared = self
            .backend
            .decapsulate(self.algorithm, private, &CiphertextBytes(ciphertext.to_vec()))?;
        if shared.0.len() != sizes.shared_secret {
            return Err(CryptoError::DecapsulationFailure(format!(
                "{} backend returned a {}-byte secret",
                self.algorithm.id(),
                shared.0.len()
            )));
        }
        Ok(shared)
    }
}

impl std::fmt::Debug for KemProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemProvider")
            .field("algorithm", &self.algorithm)
            .field("backend", &self.backend.provider_id())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crypto::registry::default_registry;

    fn provider(alg: KemAlgorithm) -> KemProvider {
        KemProvider::new(alg, &default_registry()).unwrap()
    }

    #[test]
    fn ml_kem_512_keypair_has_table_sizes() {
        let kp = provider(KemAlgorithm::MlKem512)
            .generate_keypair("sensor-1")
            .unwrap();
        assert_eq!(kp.public.0.len(), 800);
        assert_eq!(kp.private.0.len(), 1632);
        assert_eq!(kp.owner_id, "sensor-1");
        assert_eq!(kp.variant, AlgorithmVariant::Kem(KemAlgorithm::MlKem512));
    }

    #[test]
    fn roundtrip_for_every_variant() {
        for alg in KemAlgorithm::ALL {
            let kem = provider(alg);
            let kp = kem.generate_keypair("gw").unwrap();
            let (sent, ct) = kem.encapsulate(&kp.public.0).unwrap();
            let received = kem.decapsulate(&ct.0, &kp.private).unwrap();
            assert_eq!(sent.0, received.0, "{}", alg.id());
        }
    }

    #[test]
    fn encapsulate_rejects_wrong_public_length() {
        let kem = provider(KemAlgorithm::MlKem512);
        let err = kem.encapsulate(&[0u8; 799]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::invalid_size("ml-kem-512 public key", 800, 799)
        );
    }

    #[test]
    fn decapsulate_rejects_wrong_lengths() {
        let kem = provider(KemAlgorithm::MlKem512);
        let kp = kem.generate_keypair("gw").unwrap();
        let (_, ct) = kem.encapsulate(&kp.public.0).unwrap();

        let short_ct = kem.decapsulate(&ct.0[..767], &kp.private);
        assert!(matches!(short_ct, Err(CryptoError::DecapsulationFailure(_))));

        let short_sk = kem.decapsulate(&ct.0, &SecretKeyBytes(vec![0u8; 64]));
        assert!(matches!(short_sk, Err(CryptoError::DecapsulationFailure(_))));
    }

    #[test]
    fn unregistered_variant_is_backend_unavailable() {
        let empty = AlgorithmRegistry::new();
        let err = KemProvider::new(KemAlgorithm::MlKem768, &empty).unwrap_err();
        assert!(matches!(err, CryptoError::BackendUnavailable(_)));
    }
}

//! Size-checked signature strategy bound to one ML-DSA variant.

use std::sync::Arc;

use log::debug;

use super::algorithm::{AlgorithmVariant, SignatureAlgorithm};
use super::errors::CryptoError;
use super::registry::AlgorithmRegistry;
use super::{CryptoProvider, KeyPair, PublicKeyBytes, SecretKeyBytes, SignatureBytes};

/// Signature operations for a fixed variant.
#[derive(Clone)]
pub struct SignatureProvider {
    algorithm: SignatureAlgorithm,
    backend: Arc<dyn CryptoProvider>,
}

impl SignatureProvider {
    /// Binds `algorithm` to its registered backend.
    pub fn new(algorithm: SignatureAlgorithm, registry: &AlgorithmRegistry) -> Result<Self, CryptoError> {
        Ok(Self {
            algorithm,
            backend: registry.signature_provider(algorithm)?,
        })
    }

    /// The variant this provider is bound to.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Identifier of the backend doing the work.
    pub fn backend_id(&self) -> &'static str {
        self.backend.provider_id()
    }

    /// Generates a fresh signing keypair of exactly the variant's sizes.
    pub fn generate_keypair(&self, owner_id: &str) -> Result<KeyPair, CryptoError> {
        let (public, private) = self.backend.generate_signature_keypair(self.algorithm)?;
        let keypair = KeyPair {
            public,
            private,
            variant: AlgorithmVariant::Signature(self.algorithm),
            owner_id: owner_id.to_string(),
        };
        keypair.validate()?;
        debug!("generated {} keypair for '{owner_id}'", self.algorithm.id());
        Ok(keypair)
    }

    /// Signs `message`. The output always has the variant's signature length.
    pub fn sign(&self, message: &[u8], private: &SecretKeyBytes) -> Result<SignatureBytes, CryptoError> {
        let sizes = self.algorithm.sizes();
        if private.0.len() != sizes.private_key {
            return Err(CryptoError::invalid_size(
                format!("{} private key", self.algorithm.id()),
                sizes.private_key,
                private.0.len(),
            ));
        }
        let signature = self.backend.sign(self.algorithm, private, message)?;
        if signature.0.len() != sizes.signature {
            return Err(CryptoError::invalid_size(
                format!("{} signature", self.algorithm.id()),
                sizes.signature,
                signature.0.len(),
            ));
        }
        Ok(signature)
    }

    /// Returns `true` only for a valid signature. Malformed input of any
    /// kind yields `false`, never an error.
    pub fn verify(&self, message: &[u8], signature: &[u8], public: &[u8]) -> bool {
        let sizes = self.algorithm.sizes();
        if signature.len() != sizes.signature || public.len() != sizes.public_key {
            return false;
        }
        self.backend
            .verify_signature(
                self.algorithm,
                &PublicKeyBytes(public.to_vec()),
                message,
                &SignatureBytes(signature.to_vec()),
            )
            .map(|result| result.is_valid())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for SignatureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureProvider")
            .field("algorithm", &self.algorithm)
            .field("backend", &self.backend.provider_id())
            .finish()
    }
}

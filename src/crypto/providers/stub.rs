//! Non-secure stand-in backend for hosts without the real primitives.
//!
//! **This backend provides no security.** It exists so integration rigs and
//! very small test harnesses can exercise the session and telemetry paths
//! with correctly sized keys, ciphertexts and signatures. It is never
//! registered by [`default_registry`](crate::crypto::registry::default_registry)
//! and never reached by catching an error from the real backend; it must be
//! chosen by configuration (`backend = "insecure-stub"` together with
//! `allow_insecure_backend = true`).
//!
//! Construction:
//! - private keys are random bytes of the variant's private length;
//! - public keys are an HKDF-SHA-256 expansion of the private key;
//! - a KEM ciphertext is random, and the shared secret is
//!   `SHA-256(label || public || ciphertext)`, recomputable by the holder
//!   of the private key;
//! - a "signature" is an HKDF expansion keyed by the public key over the
//!   message, so anyone holding the public key can forge one.

use hkdf::Hkdf;
use log::warn;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::crypto::algorithm::{AlgorithmDescriptor, KemAlgorithm, SignatureAlgorithm};
use crate::crypto::errors::CryptoError;
use crate::crypto::{
    CiphertextBytes, CryptoProvider, PublicKeyBytes, SecretKeyBytes, SharedSecret,
    SignatureBytes, VerificationResult,
};

const KEM_PUBLIC_LABEL: &[u8] = b"qshield-insecure-stub/kem-public";
const KEM_SECRET_LABEL: &[u8] = b"qshield-insecure-stub/kem-secret";
const SIG_PUBLIC_LABEL: &[u8] = b"qshield-insecure-stub/sig-public";
const SIG_LABEL: &[u8] = b"qshield-insecure-stub/signature";

/// Visibly non-secure stand-in backend. See the module docs.
pub struct InsecureStubProvider;

impl InsecureStubProvider {
    /// Creates the stand-in and logs a warning so its use is never silent.
    pub fn new() -> Self {
        warn!("insecure stand-in crypto backend selected: keys, sessions and signatures offer NO protection");
        Self
    }
}

impl Default for InsecureStubProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn expand(label: &[u8], ikm: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(label), ikm);
    let mut out = vec![0u8; len];
    hk.expand(info, &mut out).map_err(|_| {
        CryptoError::UnsupportedAlgorithm(format!("stand-in expansion cannot produce {len} bytes"))
    })?;
    Ok(out)
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    OsRng.fill_bytes(&mut out);
    out
}

fn check_len(what: &str, expected: usize, actual: usize) -> Result<(), CryptoError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CryptoError::invalid_size(what, expected, actual))
    }
}

fn kem_secret(public: &[u8], ciphertext: &[u8]) -> SharedSecret {
    let mut hasher = Sha256::new();
    hasher.update(KEM_SECRET_LABEL);
    hasher.update(public);
    hasher.update(ciphertext);
    SharedSecret(hasher.finalize().to_vec())
}

fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl CryptoProvider for InsecureStubProvider {
    fn provider_id(&self) -> &'static str {
        "insecure-stub (NOT SECURE)"
    }

    fn is_secure(&self) -> bool {
        false
    }

    fn supported_algorithms(&self) -> Vec<AlgorithmDescriptor> {
        let kems = KemAlgorithm::ALL.into_iter().map(|kem| AlgorithmDescriptor {
            id: kem.id().into(),
            nist_level: kem.nist_level(),
            quantum_safe: false,
            standard: "none (stand-in)",
        });
        let sigs = SignatureAlgorithm::ALL
            .into_iter()
            .map(|sig| AlgorithmDescriptor {
                id: sig.id().into(),
                nist_level: sig.nist_level(),
                quantum_safe: false,
                standard: "none (stand-in)",
            });
        kems.chain(sigs).collect()
    }

    fn generate_kem_keypair(
        &self,
        algorithm: KemAlgorithm,
    ) -> Result<(PublicKeyBytes, SecretKeyBytes), CryptoError> {
        let sizes = algorithm.sizes();
        let private = SecretKeyBytes(random_bytes(sizes.private_key));
        let public = expand(KEM_PUBLIC_LABEL, &private.0, b"", sizes.public_key)?;
        Ok((PublicKeyBytes(public), private))
    }

    fn encapsulate(
        &self,
        algorithm: KemAlgorithm,
        public_key: &PublicKeyBytes,
    ) -> Result<(SharedSecret, CiphertextBytes), CryptoError> {
        let sizes = algorithm.sizes();
        if public_key.0.len() != sizes.public_key {
            return Err(CryptoError::EncapsulationFailure(format!(
                "stand-in public key has wrong length: got {}",
                public_key.0.len()
            )));
        }
        let ciphertext = random_bytes(sizes.ciphertext);
        let shared = kem_secret(&public_key.0, &ciphertext);
        Ok((shared, CiphertextBytes(ciphertext)))
    }

    fn decapsulate(
        &self,
        algorithm: KemAlgorithm,
        secret_key: &SecretKeyBytes,
        ciphertext: &CiphertextBytes,
    ) -> Result<SharedSecret, CryptoError> {
        let sizes = algorithm.sizes();
        if secret_key.0.len() != sizes.private_key || ciphertext.0.len() != sizes.ciphertext {
            return Err(CryptoError::DecapsulationFailure(
                "stand-in key or ciphertext has wrong length".into(),
            ));
        }
        let public = expand(KEM_PUBLIC_LABEL, &secret_key.0, b"", sizes.public_key)?;
        Ok(kem_secret(&public, &ciphertext.0))
    }

    fn generate_signature_keypair(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<(PublicKeyBytes, SecretKeyBytes), CryptoError> {
        let sizes = algorithm.sizes();
        let private = SecretKeyBytes(random_bytes(sizes.private_key));
        let public = expand(SIG_PUBLIC_LABEL, &private.0, b"", sizes.public_key)?;
        Ok((PublicKeyBytes(public), private))
    }

    fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        secret_key: &SecretKeyBytes,
        message: &[u8],
    ) -> Result<SignatureBytes, CryptoError> {
        let sizes = algorithm.sizes();
        check_len("stand-in signing key", sizes.private_key, secret_key.0.len())?;
        let public = expand(SIG_PUBLIC_LABEL, &secret_key.0, b"", sizes.public_key)?;
        let sig = expand(SIG_LABEL, &public, message, sizes.signature)?;
        Ok(SignatureBytes(sig))
    }

    fn verify_signature(
        &self,
        algorithm: SignatureAlgorithm,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<VerificationResult, CryptoError> {
        let sizes = algorithm.sizes();
        check_len("stand-in verifying key", sizes.public_key, public_key.0.len())?;
        let expected = expand(SIG_LABEL, &public_key.0, message, sizes.signature)?;
        if ct_eq(&expected, &signature.0) {
            Ok(VerificationResult::Valid)
        } else {
            Ok(VerificationResult::Invalid {
                reason: "stand-in signature mismatch".into(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn stub_identity_is_visibly_insecure() {
        let stub = InsecureStubProvider::new();
        assert!(stub.provider_id().contains("NOT SECURE"));
        assert!(!stub.is_secure());
        assert!(stub.supported_algorithms().iter().all(|d| !d.quantum_safe));
    }

    #[test]
    fn stub_kem_sizes_and_agreement() {
        let stub = InsecureStubProvider::new();
        let kem = KemAlgorithm::MlKem512;
        let (pk, sk) = stub.generate_kem_keypair(kem).unwrap();
        assert_eq!(pk.0.len(), 800);
        assert_eq!(sk.0.len(), 1632);

        let (sent, ct) = stub.encapsulate(kem, &pk).unwrap();
        assert_eq!(ct.0.len(), 768);
        let received = stub.decapsulate(kem, &sk, &ct).unwrap();
        assert_eq!(sent.0, received.0);
    }

    #[test]
    fn stub_signature_sizes_and_tamper() {
        let stub = InsecureStubProvider::new();
        let alg = SignatureAlgorithm::MlDsa44;
        let (pk, sk) = stub.generate_signature_keypair(alg).unwrap();
        let mut sig = stub.sign(alg, &sk, b"reading").unwrap();
        assert_eq!(sig.0.len(), 2420);
        assert!(stub
            .verify_signature(alg, &pk, b"reading", &sig)
            .unwrap()
            .is_valid());

        sig.0[10] ^= 0x01;
        assert!(!stub
            .verify_signature(alg, &pk, b"reading", &sig)
            .unwrap()
            .is_valid());
    }

    #[test]
    fn stub_rejects_wrong_lengths() {
        let stub = InsecureStubProvider::new();
        let result = stub.decapsulate(
            KemAlgorithm::MlKem768,
            &SecretKeyBytes(vec![0; 10]),
            &CiphertextBytes(vec![0; 1088]),
        );
        assert!(matches!(result, Err(CryptoError::DecapsulationFailure(_))));
    }
}

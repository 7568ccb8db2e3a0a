//! RustCrypto-backed provider for the post-quantum primitives.
//!
//! Implements:
//! - **ML-KEM** (FIPS 203): CRYSTALS-Kyber key encapsulation
//! - **ML-DSA** (FIPS 204): CRYSTALS-Dilithium lattice-based signatures
//!
//! All implementations are pure Rust with no C FFI, no `unsafe` code,
//! and NIST KAT-tested by the `RustCrypto` project. Keys use the standard
//! expanded encodings, so lengths match the tables in
//! [`crate::crypto::algorithm`] exactly.

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{EncodedSizeUser, KemCore};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::crypto::algorithm::{AlgorithmDescriptor, KemAlgorithm, SignatureAlgorithm};
use crate::crypto::errors::CryptoError;
use crate::crypto::{
    CiphertextBytes, CryptoProvider, PublicKeyBytes, SecretKeyBytes, SharedSecret,
    SignatureBytes, VerificationResult,
};

/// RustCrypto-backed provider for ML-KEM and ML-DSA.
pub struct RustCryptoProvider;

// ---------------------------------------------------------------------------
// ML-DSA signatures (FIPS 204)
// ---------------------------------------------------------------------------

fn generate_ml_dsa<P>() -> (PublicKeyBytes, SecretKeyBytes)
where
    P: ml_dsa::MlDsaParams,
{
    #[allow(unused_imports)]
    use ml_dsa::signature::Keypair;
    use ml_dsa::KeyGen;

    let kp = P::key_gen(&mut OsRng);
    let public = PublicKeyBytes(kp.verifying_key().encode().to_vec());
    let mut encoded = kp.signing_key().encode();
    let secret = SecretKeyBytes(encoded.to_vec());
    encoded[..].zeroize();
    (public, secret)
}

fn sign_ml_dsa<P>(secret_key: &[u8], message: &[u8]) -> Result<SignatureBytes, CryptoError>
where
    P: ml_dsa::MlDsaParams,
{
    use ml_dsa::signature::Signer;

    let mut encoded = ml_dsa::EncodedSigningKey::<P>::try_from(secret_key).map_err(|_| {
        CryptoError::invalid_size(
            "ML-DSA signing key",
            std::mem::size_of::<ml_dsa::EncodedSigningKey<P>>(),
            secret_key.len(),
        )
    })?;
    let sk = ml_dsa::SigningKey::<P>::decode(&encoded);
    encoded[..].zeroize();

    let sig: ml_dsa::Signature<P> = sk.sign(message);
    Ok(SignatureBytes(sig.encode().to_vec()))
}

/// Verifies an ML-DSA signature for a specific parameter set.
///
/// # Constant-time audit note
///
/// ML-DSA verification in the `ml-dsa` crate uses the algebraic verification
/// equation rather than byte comparison of signature data. No raw byte
/// comparison of signatures occurs in this path.
fn verify_ml_dsa<P>(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<VerificationResult, CryptoError>
where
    P: ml_dsa::MlDsaParams,
{
    use ml_dsa::signature::Verifier;

    let vk_encoded = ml_dsa::EncodedVerifyingKey::<P>::try_from(public_key).map_err(|_| {
        CryptoError::invalid_size(
            "ML-DSA verifying key",
            std::mem::size_of::<ml_dsa::EncodedVerifyingKey<P>>(),
            public_key.len(),
        )
    })?;
    let vk = ml_dsa::VerifyingKey::<P>::decode(&vk_encoded);

    let Ok(sig_encoded) = ml_dsa::EncodedSignature::<P>::try_from(signature) else {
        return Ok(VerificationResult::Invalid {
            reason: format!("ML-DSA signature has wrong length: {}", signature.len()),
        });
    };
    let Some(sig) = ml_dsa::Signature::<P>::decode(&sig_encoded) else {
        return Ok(VerificationResult::Invalid {
            reason: "malformed ML-DSA signature".into(),
        });
    };

    match vk.verify(message, &sig) {
        Ok(()) => Ok(VerificationResult::Valid),
        Err(_) => Ok(VerificationResult::Invalid {
            reason: "ML-DSA signature verification failed".into(),
        }),
    }
}

// ---------------------------------------------------------------------------
// ML-KEM (FIPS 203)
// ---------------------------------------------------------------------------

/// Implements keygen, encapsulation and decapsulation for one ML-KEM
/// parameter set. Concrete types avoid the nested associated-type bounds a
/// generic version would need.
macro_rules! impl_ml_kem {
    ($generate:ident, $encapsulate:ident, $decapsulate:ident, $kem:ty) => {
        fn $generate() -> (PublicKeyBytes, SecretKeyBytes) {
            let (dk, ek) = <$kem as KemCore>::generate(&mut OsRng);
            let mut encoded = dk.as_bytes();
            let secret = SecretKeyBytes(encoded.to_vec());
            encoded[..].zeroize();
            (PublicKeyBytes(ek.as_bytes().to_vec()), secret)
        }

        fn $encapsulate(
            public_key: &[u8],
        ) -> Result<(SharedSecret, CiphertextBytes), CryptoError> {
            type Ek = <$kem as KemCore>::EncapsulationKey;

            let encoded = public_key.try_into().map_err(|_| {
                CryptoError::EncapsulationFailure(format!(
                    "ML-KEM encapsulation key has wrong length: got {}",
                    public_key.len()
                ))
            })?;
            let ek = Ek::from_bytes(&encoded);
            let (ct, shared) = ek.encapsulate(&mut OsRng).map_err(|_| {
                CryptoError::EncapsulationFailure("ML-KEM encapsulation rejected the key".into())
            })?;
            Ok((SharedSecret(shared.to_vec()), CiphertextBytes(ct.to_vec())))
        }

        fn $decapsulate(secret_key: &[u8], ciphertext: &[u8]) -> Result<SharedSecret, CryptoError> {
            type Dk = <$kem as KemCore>::DecapsulationKey;

            let mut encoded = secret_key.try_into().map_err(|_| {
                CryptoError::DecapsulationFailure(format!(
                    "ML-KEM decapsulation key has wrong length: got {}",
                    secret_key.len()
                ))
            })?;
            let dk = Dk::from_bytes(&encoded);
            encoded[..].zeroize();

            let ct = ml_kem::Ciphertext::<$kem>::try_from(ciphertext).map_err(|_| {
                CryptoError::DecapsulationFailure(format!(
                    "ML-KEM ciphertext has wrong length: got {}",
                    ciphertext.len()
                ))
            })?;

            let shared = dk.decapsulate(&ct).map_err(|_| {
                CryptoError::DecapsulationFailure("ML-KEM decapsulation rejected".into())
            })?;
            Ok(SharedSecret(shared.to_vec()))
        }
    };
}

impl_ml_kem!(
    generate_ml_kem_512,
    encapsulate_ml_kem_512,
    decapsulate_ml_kem_512,
    ml_kem::MlKem512
);
impl_ml_kem!(
    generate_ml_kem_768,
    encapsulate_ml_kem_768,
    decapsulate_ml_kem_768,
    ml_kem::MlKem768
);
impl_ml_kem!(
    generate_ml_kem_1024,
    encapsulate_ml_kem_1024,
    decapsulate_ml_kem_1024,
    ml_kem::MlKem1024
);

// ---------------------------------------------------------------------------
// CryptoProvider implementation
// ---------------------------------------------------------------------------

impl CryptoProvider for RustCryptoProvider {
    fn provider_id(&self) -> &'static str {
        "rustcrypto"
    }

    fn is_secure(&self) -> bool {
        true
    }

    fn supported_algorithms(&self) -> Vec<AlgorithmDescriptor> {
        let kems = KemAlgorithm::ALL.into_iter().map(|kem| AlgorithmDescriptor {
            id: kem.id().into(),
            nist_level: kem.nist_level(),
            quantum_safe: true,
            standard: "FIPS 203",
        });
        let sigs = SignatureAlgorithm::ALL
            .into_iter()
            .map(|sig| AlgorithmDescriptor {
                id: sig.id().into(),
                nist_level: sig.nist_level(),
                quantum_safe: true,
                standard: "FIPS 204",
            });
        kems.chain(sigs).collect()
    }

    fn generate_kem_keypair(
        &self,
        algorithm: KemAlgorithm,
    ) -> Result<(PublicKeyBytes, SecretKeyBytes), CryptoError> {
        Ok(match algorithm {
            KemAlgorithm::MlKem512 => generate_ml_kem_512(),
            KemAlgorithm::MlKem768 => generate_ml_kem_768(),
            KemAlgorithm::MlKem1024 => generate_ml_kem_1024(),
        })
    }

    fn encapsulate(
        &self,
        algorithm: KemAlgorithm,
        public_key: &PublicKeyBytes,
    ) -> Result<(SharedSecret, CiphertextBytes), CryptoError> {
        match algorithm {
            KemAlgorithm::MlKem512 => encapsulate_ml_kem_512(&public_key.0),
            KemAlgorithm::MlKem768 => encapsulate_ml_kem_768(&public_key.0),
            KemAlgorithm::MlKem1024 => encapsulate_ml_kem_1024(&public_key.0),
        }
    }

    fn decapsulate(
        &self,
        algorithm: KemAlgorithm,
        secret_key: &SecretKeyBytes,
        ciphertext: &CiphertextBytes,
    ) -> Result<SharedSecret, CryptoError> {
        match algorithm {
            KemAlgorithm::MlKem512 => decapsulate_ml_kem_512(&secret_key.0, &ciphertext.0),
            KemAlgorithm::MlKem768 => decapsulate_ml_kem_768(&secret_key.0, &ciphertext.0),
            KemAlgorithm::MlKem1024 => decapsulate_ml_kem_1024(&secret_key.0, &ciphertext.0),
        }
    }

    fn generate_signature_keypair(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<(PublicKeyBytes, SecretKeyBytes), CryptoError> {
        Ok(match algorithm {
            SignatureAlgorithm::MlDsa44 => generate_ml_dsa::<ml_dsa::MlDsa44>(),
            SignatureAlgorithm::MlDsa65 => generate_ml_dsa::<ml_dsa::MlDsa65>(),
            SignatureAlgorithm::MlDsa87 => generate_ml_dsa::<ml_dsa::MlDsa87>(),
        })
    }

    fn sign(
        &self,
        algorithm: SignatureAlgorithm,
        secret_key: &SecretKeyBytes,
        message: &[u8],
    ) -> Result<SignatureBytes, CryptoError> {
        match algorithm {
            SignatureAlgorithm::MlDsa44 => sign_ml_dsa::<ml_dsa::MlDsa44>(&secret_key.0, message),
            SignatureAlgorithm::MlDsa65 => sign_ml_dsa::<ml_dsa::MlDsa65>(&secret_key.0, message),
            SignatureAlgorithm::MlDsa87 => sign_ml_dsa::<ml_dsa::MlDsa87>(&secret_key.0, message),
        }
    }

    fn verify_signature(
        &self,
        algorithm: SignatureAlgorithm,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<VerificationResult, CryptoError> {
        match algorithm {
            SignatureAlgorithm::MlDsa44 => {
                verify_ml_dsa::<ml_dsa::MlDsa44>(&public_key.0, message, &signature.0)
            }
            SignatureAlgorithm::MlDsa65 => {
                verify_ml_dsa::<ml_dsa::MlDsa65>(&public_key.0, message, &signature.0)
            }
            SignatureAlgorithm::MlDsa87 => {
                verify_ml_dsa::<ml_dsa::MlDsa87>(&public_key.0, message, &signature.0)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // ML-KEM tests
    // -----------------------------------------------------------------------

    #[test]
    fn ml_kem_keygen_matches_size_tables() {
        let provider = RustCryptoProvider;
        for kem in KemAlgorithm::ALL {
            let (pk, sk) = provider.generate_kem_keypair(kem).unwrap();
            assert_eq!(pk.0.len(), kem.sizes().public_key, "{}", kem.id());
            assert_eq!(sk.0.len(), kem.sizes().private_key, "{}", kem.id());
        }
    }

    #[test]
    fn ml_kem_encapsulate_decapsulate_roundtrip() {
        let provider = RustCryptoProvider;
        for kem in KemAlgorithm::ALL {
            let (pk, sk) = provider.generate_kem_keypair(kem).unwrap();
            let (sent, ct) = provider.encapsulate(kem, &pk).unwrap();
            assert_eq!(ct.0.len(), kem.sizes().ciphertext);
            let received = provider.decapsulate(kem, &sk, &ct).unwrap();
            assert_eq!(sent.0, received.0, "{} shared secrets must match", kem.id());
            assert_eq!(sent.0.len(), 32);
        }
    }

    #[test]
    fn ml_kem_wrong_key_yields_different_secret() {
        // Implicit rejection: a mismatched key decapsulates to garbage
        // instead of signalling an error.
        let provider = RustCryptoProvider;
        let kem = KemAlgorithm::MlKem512;
        let (pk, _) = provider.generate_kem_keypair(kem).unwrap();
        let (_, other_sk) = provider.generate_kem_keypair(kem).unwrap();
        let (sent, ct) = provider.encapsulate(kem, &pk).unwrap();
        let received = provider.decapsulate(kem, &other_sk, &ct).unwrap();
        assert_ne!(sent.0, received.0);
    }

    #[test]
    fn ml_kem_short_ciphertext_rejected() {
        let provider = RustCryptoProvider;
        let (_, sk) = provider.generate_kem_keypair(KemAlgorithm::MlKem768).unwrap();
        let result = provider.decapsulate(
            KemAlgorithm::MlKem768,
            &sk,
            &CiphertextBytes(vec![0u8; 100]),
        );
        assert!(matches!(result, Err(CryptoError::DecapsulationFailure(_))));
    }

    #[test]
    fn ml_kem_public_key_for_wrong_level_rejected() {
        let provider = RustCryptoProvider;
        let (pk512, _) = provider.generate_kem_keypair(KemAlgorithm::MlKem512).unwrap();
        let result = provider.encapsulate(KemAlgorithm::MlKem1024, &pk512);
        assert!(matches!(result, Err(CryptoError::EncapsulationFailure(_))));
    }

    // -----------------------------------------------------------------------
    // ML-DSA tests
    // -----------------------------------------------------------------------

    #[test]
    fn ml_dsa_keygen_matches_size_tables() {
        let provider = RustCryptoProvider;
        for sig in SignatureAlgorithm::ALL {
            let (pk, sk) = provider.generate_signature_keypair(sig).unwrap();
            assert_eq!(pk.0.len(), sig.sizes().public_key, "{}", sig.id());
            assert_eq!(sk.0.len(), sig.sizes().private_key, "{}", sig.id());
        }
    }

    #[test]
    fn ml_dsa_sign_verify_roundtrip() {
        let provider = RustCryptoProvider;
        for alg in SignatureAlgorithm::ALL {
            let (pk, sk) = provider.generate_signature_keypair(alg).unwrap();
            let message = b"qshield telemetry signature test";
            let sig = provider.sign(alg, &sk, message).unwrap();
            assert_eq!(sig.0.len(), alg.sizes().signature);
            let result = provider.verify_signature(alg, &pk, message, &sig).unwrap();
            assert!(result.is_valid(), "{} verification should pass", alg.id());
        }
    }

    #[test]
    fn ml_dsa_65_tampered_signature_rejected() {
        let provider = RustCryptoProvider;
        let alg = SignatureAlgorithm::MlDsa65;
        let (pk, sk) = provider.generate_signature_keypair(alg).unwrap();
        let mut sig = provider.sign(alg, &sk, b"tamper test").unwrap();
        sig.0[0] ^= 0xFF;

        let result = provider
            .verify_signature(alg, &pk, b"tamper test", &sig)
            .unwrap();
        assert!(!result.is_valid());
    }

    #[test]
    fn ml_dsa_wrong_message_rejected() {
        let provider = RustCryptoProvider;
        let alg = SignatureAlgorithm::MlDsa44;
        let (pk, sk) = provider.generate_signature_keypair(alg).unwrap();
        let sig = provider.sign(alg, &sk, b"temp=21.5").unwrap();
        let result = provider
            .verify_signature(alg, &pk, b"temp=99.9", &sig)
            .unwrap();
        assert!(!result.is_valid());
    }

    #[test]
    fn ml_dsa_wrong_algorithm_rejected() {
        let provider = RustCryptoProvider;
        let (pk, sk) = provider
            .generate_signature_keypair(SignatureAlgorithm::MlDsa44)
            .unwrap();
        let sig = provider
            .sign(SignatureAlgorithm::MlDsa44, &sk, b"test")
            .unwrap();

        // Key and signature sizes are wrong for ML-DSA-65
        let result = provider.verify_signature(SignatureAlgorithm::MlDsa65, &pk, b"test", &sig);
        assert!(result.is_err() || !result.unwrap().is_valid());
    }

    #[test]
    fn short_signing_key_rejected() {
        let provider = RustCryptoProvider;
        let result = provider.sign(
            SignatureAlgorithm::MlDsa44,
            &SecretKeyBytes(vec![0u8; 32]),
            b"msg",
        );
        assert!(matches!(result, Err(CryptoError::InvalidKeySize { .. })));
    }

    #[test]
    fn descriptors_cover_every_variant() {
        let ids: Vec<String> = RustCryptoProvider
            .supported_algorithms()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids.len(), 6);
        assert!(ids.contains(&"ml-kem-512".to_string()));
        assert!(ids.contains(&"ml-dsa-87".to_string()));
    }
}

//! Red team attack surface tests for qshield.
//!
//! These tests simulate adversarial inputs to verify that every layer
//! handles them gracefully: returning typed errors rather than panicking,
//! accepting invalid inputs, touching files outside the key store, or
//! leaking key material.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::fs;
use std::sync::Arc;

use qshield::config::QShieldConfig;
use qshield::crypto::errors::CryptoError;
use qshield::crypto::kem::KemProvider;
use qshield::crypto::profile::DeviceProfile;
use qshield::crypto::providers::stub::InsecureStubProvider;
use qshield::crypto::registry::{default_registry, AlgorithmRegistry};
use qshield::crypto::signature::SignatureProvider;
use qshield::crypto::{KemAlgorithm, SecretKeyBytes, SignatureAlgorithm, SymmetricKey};
use qshield::{KeyStore, TelemetryCodec, TelemetryFrame};

// -------------------------------------------------------------------------
// (a) Algorithm confusion
// -------------------------------------------------------------------------

#[test]
fn ml_dsa_44_signature_rejected_by_ml_dsa_65_verifier() {
    let registry = default_registry();
    let dsa44 = SignatureProvider::new(SignatureAlgorithm::MlDsa44, &registry).unwrap();
    let dsa65 = SignatureProvider::new(SignatureAlgorithm::MlDsa65, &registry).unwrap();

    let kp = dsa44.generate_keypair("attacker").unwrap();
    let sig = dsa44.sign(b"open the valve", &kp.private).unwrap();

    assert!(!dsa65.verify(b"open the valve", &sig.0, &kp.public.0));
    let other = dsa65.generate_keypair("victim").unwrap();
    assert!(!dsa65.verify(b"open the valve", &sig.0, &other.public.0));
}

#[test]
fn ml_kem_768_ciphertext_rejected_by_ml_kem_512() {
    let registry = default_registry();
    let kem512 = KemProvider::new(KemAlgorithm::MlKem512, &registry).unwrap();
    let kem768 = KemProvider::new(KemAlgorithm::MlKem768, &registry).unwrap();

    let target = kem768.generate_keypair("collector").unwrap();
    let (_, ct) = kem768.encapsulate(&target.public.0).unwrap();
    let victim = kem512.generate_keypair("collector").unwrap();

    assert!(matches!(
        kem512.decapsulate(&ct.0, &victim.private),
        Err(CryptoError::DecapsulationFailure(_))
    ));
}

#[test]
fn kem_keypair_cannot_sign_telemetry() {
    let registry = default_registry();
    let codec = TelemetryCodec::new(DeviceProfile::Standard, &registry).unwrap();
    let kem = KemProvider::new(KemAlgorithm::MlKem512, &registry)
        .unwrap()
        .generate_keypair("sensor-1")
        .unwrap();
    assert!(matches!(
        codec.seal(b"x", b"", &SymmetricKey::random(), &kem),
        Err(CryptoError::UnsupportedAlgorithm(_))
    ));
}

// -------------------------------------------------------------------------
// (b) Empty and truncated key material
// -------------------------------------------------------------------------

#[test]
fn empty_key_material_kem() {
    for alg in KemAlgorithm::ALL {
        let kem = KemProvider::new(alg, &default_registry()).unwrap();
        assert!(matches!(
            kem.encapsulate(&[]),
            Err(CryptoError::InvalidKeySize { actual: 0, .. })
        ));
        let kp = kem.generate_keypair("x").unwrap();
        let (_, ct) = kem.encapsulate(&kp.public.0).unwrap();
        assert!(kem.decapsulate(&ct.0, &SecretKeyBytes(Vec::new())).is_err());
        assert!(kem.decapsulate(&[], &kp.private).is_err());
    }
}

#[test]
fn empty_key_material_signature() {
    for alg in SignatureAlgorithm::ALL {
        let signer = SignatureProvider::new(alg, &default_registry()).unwrap();
        assert!(matches!(
            signer.sign(b"m", &SecretKeyBytes(Vec::new())),
            Err(CryptoError::InvalidKeySize { actual: 0, .. })
        ));
        let kp = signer.generate_keypair("x").unwrap();
        let sig = signer.sign(b"m", &kp.private).unwrap();
        assert!(!signer.verify(b"m", &sig.0, &[]));
        assert!(!signer.verify(b"m", &[], &kp.public.0));
        assert!(!signer.verify(b"m", &sig.0[..sig.0.len() - 1], &kp.public.0));
    }
}

#[test]
fn oversized_kem_ciphertext_rejected() {
    let kem = KemProvider::new(KemAlgorithm::MlKem512, &default_registry()).unwrap();
    let kp = kem.generate_keypair("x").unwrap();
    let (_, ct) = kem.encapsulate(&kp.public.0).unwrap();
    let mut padded = ct.0.clone();
    padded.push(0);
    assert!(matches!(
        kem.decapsulate(&padded, &kp.private),
        Err(CryptoError::DecapsulationFailure(_))
    ));
}

#[test]
fn short_session_key_rejected() {
    assert!(matches!(
        SymmetricKey::from_slice(&[0u8; 16]),
        Err(CryptoError::InvalidKeySize {
            expected: 32,
            actual: 16,
            ..
        })
    ));
}

// -------------------------------------------------------------------------
// (c) Frame manipulation
// -------------------------------------------------------------------------

fn sealed_pair() -> (TelemetryCodec, qshield::crypto::KeyPair, SymmetricKey, TelemetryFrame) {
    let codec = TelemetryCodec::new(DeviceProfile::Standard, &default_registry()).unwrap();
    let device = codec.signer().generate_keypair("sensor-1").unwrap();
    let key = SymmetricKey::random();
    let frame = codec.seal(b"temp=21.5", b"seq=1", &key, &device).unwrap();
    (codec, device, key, frame)
}

#[test]
fn frame_replayed_under_other_owner_fails_auth() {
    let (codec, device, key, mut frame) = sealed_pair();
    frame.owner_id = "sensor-2".into();
    assert_eq!(
        codec.open(&frame, &key, &device.public).unwrap_err(),
        CryptoError::DecryptionAuthFailure
    );
}

#[test]
fn truncated_nonce_is_indistinguishable_from_tag_failure() {
    let (codec, device, key, mut frame) = sealed_pair();
    frame.nonce.truncate(8);
    assert_eq!(
        codec.open(&frame, &key, &device.public).unwrap_err(),
        CryptoError::DecryptionAuthFailure
    );
}

#[test]
fn ciphertext_shorter_than_tag_fails_auth() {
    let (codec, device, key, mut frame) = sealed_pair();
    frame.ciphertext.truncate(4);
    assert_eq!(
        codec.open(&frame, &key, &device.public).unwrap_err(),
        CryptoError::DecryptionAuthFailure
    );
}

#[test]
fn signature_swapped_between_frames_is_mismatch() {
    let (codec, device, key, mut frame) = sealed_pair();
    let other = codec.seal(b"temp=99.9", b"seq=1", &key, &device).unwrap();
    frame.signature = other.signature;
    assert_eq!(
        codec.open(&frame, &key, &device.public).unwrap_err(),
        CryptoError::SignatureMismatch {
            owner_id: "sensor-1".into()
        }
    );
}

#[test]
fn malformed_wire_frames_are_format_errors() {
    for wire in [
        "",
        "null",
        "[]",
        r#"{"ciphertext":"00","nonce":"00","signature":"00","associated_data":"","owner_id":7}"#,
        r#"{"ciphertext":"0","nonce":"00","signature":"00","associated_data":"","owner_id":"a"}"#,
    ] {
        assert!(
            matches!(
                TelemetryFrame::from_json(wire),
                Err(CryptoError::InvalidFormat(_))
            ),
            "{wire}"
        );
    }
}

// -------------------------------------------------------------------------
// (d) Key store path and file attacks
// -------------------------------------------------------------------------

#[test]
fn path_traversal_owner_ids_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("keys");
    let store = KeyStore::new(&root, Arc::new(default_registry()));
    let variant = KemAlgorithm::MlKem512.into();

    for owner in ["../escape", "..", "a/../../b", "/etc", "nul\0byte", ""] {
        assert!(
            matches!(
                store.generate_keypair(owner, variant),
                Err(CryptoError::InvalidOwnerId(_))
            ),
            "{owner:?}"
        );
        assert!(matches!(
            store.delete(owner),
            Err(CryptoError::InvalidOwnerId(_))
        ));
        assert!(store.get_session_key(owner).is_none());
    }
    assert!(!dir.path().join("escape").exists());
    assert!(!root.exists());
}

#[cfg(unix)]
#[test]
fn planted_private_key_symlink_is_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("keys");
    let registry = Arc::new(default_registry());
    let variant = KemAlgorithm::MlKem512.into();

    KeyStore::new(&root, Arc::clone(&registry))
        .generate_keypair("dev", variant)
        .unwrap();

    let outside = dir.path().join("outside.key");
    fs::write(&outside, vec![0x5Au8; 1632]).unwrap();
    let private = root.join("dev").join("ml-kem-512_private.key");
    fs::remove_file(&private).unwrap();
    std::os::unix::fs::symlink(&outside, &private).unwrap();

    let store = KeyStore::new(&root, registry);
    assert!(matches!(
        store.load_keypair("dev", variant),
        Err(CryptoError::StorageIo(_))
    ));
    assert!(store.rotate("dev", variant).is_err());
    assert_eq!(fs::read(&outside).unwrap(), vec![0x5Au8; 1632]);
}

#[test]
fn corrupted_key_file_is_size_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(default_registry());
    let variant = SignatureAlgorithm::MlDsa44.into();
    KeyStore::new(dir.path(), Arc::clone(&registry))
        .generate_keypair("dev", variant)
        .unwrap();

    let public = dir.path().join("dev").join("ml-dsa-44_public.key");
    let mut bytes = fs::read(&public).unwrap();
    bytes.truncate(100);
    fs::write(&public, bytes).unwrap();

    let err = KeyStore::new(dir.path(), registry)
        .load_keypair("dev", variant)
        .unwrap_err();
    assert_eq!(
        err,
        CryptoError::invalid_size("ml-dsa-44 public key", 1312, 100)
    );
}

// -------------------------------------------------------------------------
// (e) Silent downgrade
// -------------------------------------------------------------------------

#[test]
fn secure_registry_refuses_stub_backend() {
    let mut registry = AlgorithmRegistry::new();
    let err = registry
        .register(Arc::new(InsecureStubProvider::new()))
        .unwrap_err();
    assert!(matches!(err, CryptoError::BackendUnavailable(_)));
    assert!(!registry.supports_kem(KemAlgorithm::MlKem512));
}

#[test]
fn config_cannot_select_stub_implicitly() {
    let config = QShieldConfig {
        backend: qshield::crypto::registry::Backend::InsecureStub,
        ..QShieldConfig::default()
    };
    assert!(config.validate().is_err());
    assert!(matches!(
        qshield::DeviceContext::from_config(&config),
        Err(CryptoError::BackendUnavailable(_))
    ));
}

// -------------------------------------------------------------------------
// (f) No key material in diagnostics
// -------------------------------------------------------------------------

#[test]
fn debug_and_errors_never_print_secrets() {
    let signer = SignatureProvider::new(SignatureAlgorithm::MlDsa44, &default_registry()).unwrap();
    let kp = signer.generate_keypair("sensor-1").unwrap();
    let debug = format!("{kp:?}");
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains(&hex::encode(&kp.private.0[..16])));

    let key = SymmetricKey::random();
    let debug = format!("{key:?}");
    assert!(!debug.contains(&hex::encode(&key.as_bytes()[..8])));

    let err = signer
        .sign(b"m", &SecretKeyBytes(kp.private.0[..100].to_vec()))
        .unwrap_err()
        .to_string();
    assert!(!err.contains(&hex::encode(&kp.private.0[..8])));
}

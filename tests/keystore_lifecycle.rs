//! Lifecycle tests for the key store: rotation, session expiry, concurrent
//! access and on-disk permissions.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use qshield::crypto::kem::KemProvider;
use qshield::crypto::registry::default_registry;
use qshield::crypto::{AlgorithmVariant, KemAlgorithm, SignatureAlgorithm, SymmetricKey};
use qshield::{KeyStore, OwnerState};

const KEM: AlgorithmVariant = AlgorithmVariant::Kem(KemAlgorithm::MlKem512);
const SIG: AlgorithmVariant = AlgorithmVariant::Signature(SignatureAlgorithm::MlDsa44);

fn store(dir: &tempfile::TempDir) -> KeyStore {
    KeyStore::new(dir.path().join("keys"), Arc::new(default_registry()))
}

#[test]
fn session_key_expires_after_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let ks = store(&dir);
    ks.generate_keypair("sensor-1", KEM).unwrap();

    let key = SymmetricKey::random();
    ks.put_session_key("sensor-1", key.clone(), Duration::from_secs(1))
        .unwrap();
    assert_eq!(ks.get_session_key("sensor-1").unwrap(), key);
    assert_eq!(ks.owner_state("sensor-1").unwrap(), OwnerState::Sessioned);

    thread::sleep(Duration::from_millis(1100));

    assert!(ks.get_session_key("sensor-1").is_none());
    let info = ks.key_info("sensor-1").unwrap();
    assert!(!info.has_session_key);
    assert_eq!(ks.owner_state("sensor-1").unwrap(), OwnerState::Keyed);
    assert_eq!(ks.purge_expired(), 0, "expired entry was already evicted");
}

#[test]
fn rotation_leaves_no_recoverable_old_private_key() {
    let dir = tempfile::tempdir().unwrap();
    let ks = store(&dir);
    let old = ks.generate_keypair("sensor-1", SIG).unwrap();
    let new = ks.rotate("sensor-1", SIG).unwrap();

    assert_ne!(old.public, new.public);
    assert_eq!(ks.load_keypair("sensor-1", SIG).unwrap().public, new.public);

    let owner_dir = dir.path().join("keys").join("sensor-1");
    for entry in fs::read_dir(&owner_dir).unwrap() {
        let bytes = fs::read(entry.unwrap().path()).unwrap();
        assert!(
            !bytes
                .windows(64)
                .any(|w| w == &old.private.0[..64]),
            "old private key bytes found on disk"
        );
    }
}

#[test]
fn repeated_rotation_archives_every_generation() {
    let dir = tempfile::tempdir().unwrap();
    let ks = store(&dir);
    ks.generate_keypair("gw", KEM).unwrap();
    let mut seen = vec![ks.load_keypair("gw", KEM).unwrap().public];
    for _ in 0..3 {
        let kp = ks.rotate("gw", KEM).unwrap();
        assert!(!seen.contains(&kp.public));
        seen.push(kp.public);
    }
    let info = ks.key_info("gw").unwrap();
    assert_eq!(info.algorithms, vec![KEM]);
    assert_eq!(info.archived_files, 6);
}

/// Readers racing a rotating writer always see one complete keypair: the
/// public and private halves belong together.
#[test]
fn concurrent_rotate_and_load_never_mix_generations() {
    let dir = tempfile::tempdir().unwrap();
    let ks = Arc::new(store(&dir));
    ks.generate_keypair("gw", KEM).unwrap();
    let kem = KemProvider::new(KemAlgorithm::MlKem512, &default_registry()).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ks = Arc::clone(&ks);
            let kem = kem.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut checks = 0;
                while !done.load(Ordering::Acquire) || checks == 0 {
                    let kp = ks.load_keypair("gw", KEM).expect("owner must never be keyless");
                    kp.validate().unwrap();
                    let (secret, ct) = kem.encapsulate(&kp.public.0).unwrap();
                    let recovered = kem.decapsulate(&ct.0, &kp.private).unwrap();
                    assert_eq!(secret.0, recovered.0, "public/private halves mismatched");
                    checks += 1;
                }
                checks
            })
        })
        .collect();

    for _ in 0..5 {
        ks.rotate("gw", KEM).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn concurrent_owners_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let ks = Arc::new(store(&dir));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let ks = Arc::clone(&ks);
            thread::spawn(move || {
                let owner = format!("sensor-{i}");
                let kp = ks.generate_keypair(&owner, SIG).unwrap();
                ks.put_session_key(&owner, SymmetricKey::random(), Duration::from_secs(60))
                    .unwrap();
                let rotated = ks.rotate(&owner, SIG).unwrap();
                assert_ne!(kp.public, rotated.public);
                (owner, rotated.public)
            })
        })
        .collect();

    for handle in handles {
        let (owner, public) = handle.join().unwrap();
        assert_eq!(ks.load_keypair(&owner, SIG).unwrap().public, public);
        assert!(ks.get_session_key(&owner).is_some());
    }
}

#[cfg(unix)]
#[test]
fn files_and_directories_are_restricted() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let ks = store(&dir);
    ks.generate_keypair("sensor-1", KEM).unwrap();
    ks.rotate("sensor-1", KEM).unwrap();

    let mode = |p: &std::path::Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    let owner_dir = dir.path().join("keys").join("sensor-1");
    assert_eq!(mode(&dir.path().join("keys")), 0o700);
    assert_eq!(mode(&owner_dir), 0o700);
    assert_eq!(mode(&owner_dir.join("ml-kem-512_public.key")), 0o644);
    assert_eq!(mode(&owner_dir.join("ml-kem-512_private.key")), 0o600);

    for entry in fs::read_dir(&owner_dir).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.ends_with(".pending"), "leftover staging file {name}");
        if name.contains("private") {
            assert_eq!(mode(&path), 0o600, "{name}");
        }
    }
}

#[test]
fn delete_revokes_owner() {
    let dir = tempfile::tempdir().unwrap();
    let ks = store(&dir);
    ks.generate_keypair("sensor-1", KEM).unwrap();
    ks.generate_keypair("sensor-2", KEM).unwrap();
    ks.put_session_key("sensor-1", SymmetricKey::random(), Duration::from_secs(60))
        .unwrap();

    ks.delete("sensor-1").unwrap();
    assert_eq!(ks.owner_state("sensor-1").unwrap(), OwnerState::Absent);
    assert!(ks.get_session_key("sensor-1").is_none());
    assert_eq!(ks.owner_state("sensor-2").unwrap(), OwnerState::Keyed);
}

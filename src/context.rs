//! One-shot initialization of a device's crypto stack.
//!
//! `DeviceContext` runs the whole selection chain once:
//! capabilities -> profile -> suite -> backend check -> providers. The
//! resulting profile is fixed for the context's lifetime; a profile change
//! means building a new context.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::capability::CapabilityProfiler;
use crate::config::QShieldConfig;
use crate::crypto::profile::{AlgorithmSuite, DeviceProfile, ProfileSelector};
use crate::crypto::registry::{registry_for, AlgorithmRegistry};
use crate::crypto::{AlgorithmVariant, CryptoError, KeyPair, PublicKeyBytes, SymmetricKey};
use crate::keystore::KeyStore;
use crate::session::SessionEstablisher;
use crate::telemetry::{TelemetryCodec, TelemetryFrame};

/// A device's bound profile, providers and key store.
#[derive(Debug)]
pub struct DeviceContext {
    profile: DeviceProfile,
    suite: AlgorithmSuite,
    registry: Arc<AlgorithmRegistry>,
    keystore: Arc<KeyStore>,
    session: SessionEstablisher,
    codec: TelemetryCodec,
    session_ttl: Duration,
}

impl DeviceContext {
    /// Builds a context from configuration, probing the host if the profile
    /// is `auto`.
    pub fn from_config(config: &QShieldConfig) -> Result<Self, CryptoError> {
        let registry = Arc::new(registry_for(config.backend, config.allow_insecure_backend)?);
        let keystore = Arc::new(KeyStore::new(&config.key_dir, Arc::clone(&registry)));
        let profile = ProfileSelector::with_memory_threshold(config.min_pqc_memory_bytes)
            .select(CapabilityProfiler::new().snapshot(), config.profile_override());
        Self::new(profile, registry, keystore, config.session_ttl())
    }

    /// Binds `profile` to providers from `registry`.
    ///
    /// Fails with `BackendUnavailable` if any algorithm of the suite has no
    /// registered backend.
    pub fn new(
        profile: DeviceProfile,
        registry: Arc<AlgorithmRegistry>,
        keystore: Arc<KeyStore>,
        session_ttl: Duration,
    ) -> Result<Self, CryptoError> {
        let suite = profile.suite();
        registry.validate_suite(&suite)?;
        let session = SessionEstablisher::new(profile, &registry)?;
        let codec = TelemetryCodec::new(profile, &registry)?;
        info!(
            "device context ready: profile={profile} kem={} sig={} aead={} backend={}",
            suite.kem.id(),
            suite.signature.id(),
            suite.aead.id(),
            session.kem().backend_id()
        );
        Ok(Self {
            profile,
            suite,
            registry,
            keystore,
            session,
            codec,
            session_ttl,
        })
    }

    /// Profile this context was built for; fixed for its lifetime.
    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// Algorithm suite bound to the profile.
    pub fn suite(&self) -> AlgorithmSuite {
        self.suite
    }

    /// Backend registry shared with the key store.
    pub fn registry(&self) -> &Arc<AlgorithmRegistry> {
        &self.registry
    }

    /// Key store holding this device's keypairs and session keys.
    pub fn keystore(&self) -> &Arc<KeyStore> {
        &self.keystore
    }

    /// Session establisher for the suite's KEM.
    pub fn session(&self) -> &SessionEstablisher {
        &self.session
    }

    /// Telemetry codec for the suite's AEAD and signature scheme.
    pub fn codec(&self) -> &TelemetryCodec {
        &self.codec
    }

    /// The suite's KEM and signature variants, in that order.
    pub fn variants(&self) -> [AlgorithmVariant; 2] {
        [self.suite.kem.into(), self.suite.signature.into()]
    }

    /// Generates and stores the suite's KEM and signature keypairs for
    /// `owner_id`, returning `(kem, signature)`.
    pub fn provision_owner(&self, owner_id: &str) -> Result<(KeyPair, KeyPair), CryptoError> {
        let [kem, sig] = self.variants();
        let kem = self.keystore.generate_keypair(owner_id, kem)?;
        let sig = self.keystore.generate_keypair(owner_id, sig)?;
        Ok((kem, sig))
    }

    /// Initiator side of session setup. The derived key is cached under
    /// `owner_id` for the configured TTL; the ciphertext goes to the peer.
    pub fn establish_session(&self, owner_id: &str, peer_public: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (key, ciphertext) = self.session.establish(peer_public)?;
        self.keystore.put_session_key(owner_id, key, self.session_ttl)?;
        Ok(ciphertext.0)
    }

    /// Peer side: decapsulates with `owner_id`'s stored KEM key and caches
    /// the resulting session key under `peer_id`.
    pub fn accept_session(&self, owner_id: &str, peer_id: &str, ciphertext: &[u8]) -> Result<(), CryptoError> {
        let keypair = self.keystore.load_keypair(owner_id, self.suite.kem.into())?;
        let key = self.session.accept(ciphertext, &keypair.private)?;
        self.keystore.put_session_key(peer_id, key, self.session_ttl)
    }

    /// Seals `plaintext` with the live session key and stored signing key
    /// of `owner_id`.
    pub fn seal_telemetry(
        &self,
        owner_id: &str,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<TelemetryFrame, CryptoError> {
        let key = self.live_session_key(owner_id)?;
        let signing = self.keystore.load_keypair(owner_id, self.suite.signature.into())?;
        self.codec.seal(plaintext, associated_data, &key, &signing)
    }

    /// Opens a frame from its sender using the session key cached under the
    /// sender's owner id.
    pub fn open_telemetry(
        &self,
        frame: &TelemetryFrame,
        verification_key: &PublicKeyBytes,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.live_session_key(&frame.owner_id)?;
        self.codec.open(frame, &key, verification_key)
    }

    fn live_session_key(&self, owner_id: &str) -> Result<SymmetricKey, CryptoError> {
        self.keystore
            .get_session_key(owner_id)
            .ok_or_else(|| CryptoError::KeyNotFound {
                owner_id: owner_id.to_string(),
                variant: "session".to_string(),
            })
    }
}

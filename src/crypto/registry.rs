//! Algorithm registry for the qshield session engine.
//!
//! The `AlgorithmRegistry` is the dispatch table that maps algorithm ids to
//! `CryptoProvider` backends. Profile selection names a suite by variant;
//! the registry routes each variant to exactly one backend, or fails with
//! `BackendUnavailable` when none is registered.
//!
//! ## No silent downgrade
//!
//! A registry refuses stand-in backends unless it was built with
//! [`AlgorithmRegistry::allowing_insecure`]. The only constructor that does
//! so is [`registry_for`] with [`Backend::InsecureStub`] *and* the explicit
//! allow flag. There is no fallback path from the real backend to the
//! stand-in: a failing real backend surfaces its error to the caller.
//!
//! ## Thread Safety
//!
//! The registry is `Send + Sync` and is created once at startup, then shared
//! immutably behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::algorithm::{AlgorithmDescriptor, KemAlgorithm, SignatureAlgorithm};
use super::errors::CryptoError;
use super::profile::AlgorithmSuite;
use super::providers::rustcrypto::RustCryptoProvider;
use super::providers::stub::InsecureStubProvider;
use super::CryptoProvider;

/// Which backend family a deployment is configured to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Pure-Rust ML-KEM / ML-DSA from the RustCrypto project.
    #[default]
    #[serde(rename = "rustcrypto")]
    RustCrypto,
    /// The non-secure stand-in. Requires `allow_insecure_backend`.
    #[serde(rename = "insecure-stub")]
    InsecureStub,
}

impl Backend {
    /// Returns the configuration string for this backend.
    pub fn id(self) -> &'static str {
        match self {
            Self::RustCrypto => "rustcrypto",
            Self::InsecureStub => "insecure-stub",
        }
    }
}

/// Registry mapping algorithm identifiers to backend implementations.
///
/// The registry does not own the backends; it holds `Arc` references so a
/// backend can be shared by the KEM and signature tables.
#[allow(clippy::struct_field_names)]
pub struct AlgorithmRegistry {
    /// Maps signature algorithm ID → provider.
    sig_providers: HashMap<&'static str, Arc<dyn CryptoProvider>>,
    /// Maps KEM algorithm ID → provider.
    kem_providers: HashMap<&'static str, Arc<dyn CryptoProvider>>,
    /// Whether non-secure backends may be registered.
    allow_insecure: bool,
}

impl AlgorithmRegistry {
    /// Creates an empty registry that accepts only secure backends.
    pub fn new() -> Self {
        Self {
            sig_providers: HashMap::new(),
            kem_providers: HashMap::new(),
            allow_insecure: false,
        }
    }

    /// Creates an empty registry that also accepts the non-secure stand-in.
    pub fn allowing_insecure() -> Self {
        Self {
            allow_insecure: true,
            ..Self::new()
        }
    }

    /// Registers a backend. All algorithms declared by
    /// `provider.supported_algorithms()` are indexed for dispatch.
    ///
    /// Fails with `BackendUnavailable` if the backend is not secure and the
    /// registry was not built to allow it.
    pub fn register(&mut self, provider: Arc<dyn CryptoProvider>) -> Result<(), CryptoError> {
        if !provider.is_secure() && !self.allow_insecure {
            return Err(CryptoError::BackendUnavailable(format!(
                "refusing to register non-secure backend '{}' without explicit opt-in",
                provider.provider_id()
            )));
        }
        self.insert(provider);
        Ok(())
    }

    fn insert(&mut self, provider: Arc<dyn CryptoProvider>) {
        for desc in provider.supported_algorithms() {
            if let Some(sig) = SignatureAlgorithm::from_id(&desc.id) {
                self.sig_providers.insert(sig.id(), Arc::clone(&provider));
            }
            if let Some(kem) = KemAlgorithm::from_id(&desc.id) {
                self.kem_providers.insert(kem.id(), Arc::clone(&provider));
            }
        }
        debug!("registered crypto backend '{}'", provider.provider_id());
    }

    /// Returns all registered algorithm descriptors, one per id.
    pub fn all_algorithms(&self) -> Vec<AlgorithmDescriptor> {
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();

        for provider in self.sig_providers.values().chain(self.kem_providers.values()) {
            for desc in provider.supported_algorithms() {
                if seen.insert(desc.id.clone()) {
                    result.push(desc);
                }
            }
        }
        result.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }

    /// Returns the backend for a KEM variant.
    pub fn kem_provider(&self, algorithm: KemAlgorithm) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.kem_providers
            .get(algorithm.id())
            .cloned()
            .ok_or_else(|| {
                CryptoError::BackendUnavailable(format!("no backend implements {}", algorithm.id()))
            })
    }

    /// Returns the backend for a signature variant.
    pub fn signature_provider(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> Result<Arc<dyn CryptoProvider>, CryptoError> {
        self.sig_providers
            .get(algorithm.id())
            .cloned()
            .ok_or_else(|| {
                CryptoError::BackendUnavailable(format!("no backend implements {}", algorithm.id()))
            })
    }

    /// Returns `true` if the given signature algorithm has a registered provider.
    pub fn supports_signature(&self, algorithm: SignatureAlgorithm) -> bool {
        self.sig_providers.contains_key(algorithm.id())
    }

    /// Returns `true` if the given KEM algorithm has a registered provider.
    pub fn supports_kem(&self, algorithm: KemAlgorithm) -> bool {
        self.kem_providers.contains_key(algorithm.id())
    }

    /// Returns `true` if any registered backend is a non-secure stand-in.
    pub fn has_insecure_backend(&self) -> bool {
        self.sig_providers
            .values()
            .chain(self.kem_providers.values())
            .any(|p| !p.is_secure())
    }

    /// Checks that every asymmetric variant of `suite` has a backend.
    /// Called once at initialization.
    pub fn validate_suite(&self, suite: &AlgorithmSuite) -> Result<(), CryptoError> {
        let mut missing = Vec::new();
        if !self.supports_kem(suite.kem) {
            missing.push(suite.kem.id());
        }
        if !self.supports_signature(suite.signature) {
            missing.push(suite.signature.id());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CryptoError::BackendUnavailable(format!(
                "no backend for {}",
                missing.join(", ")
            )))
        }
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kems: Vec<_> = self.kem_providers.keys().collect();
        let mut sigs: Vec<_> = self.sig_providers.keys().collect();
        kems.sort();
        sigs.sort();
        f.debug_struct("AlgorithmRegistry")
            .field("kem", &kems)
            .field("signature", &sigs)
            .field("allow_insecure", &self.allow_insecure)
            .finish()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the production registry: the `RustCrypto` backend only.
pub fn default_registry() -> AlgorithmRegistry {
    let mut registry = AlgorithmRegistry::new();
    registry.insert(Arc::new(RustCryptoProvider));
    registry
}

/// Builds the registry a configuration asks for.
///
/// `InsecureStub` is honored only together with `allow_insecure`; otherwise
/// initialization fails with `BackendUnavailable` rather than running with a
/// stand-in nobody chose.
pub fn registry_for(backend: Backend, allow_insecure: bool) -> Result<AlgorithmRegistry, CryptoError> {
    match backend {
        Backend::RustCrypto => Ok(default_registry()),
        Backend::InsecureStub if allow_insecure => {
            warn!("crypto registry built with the insecure stand-in backend");
            let mut registry = AlgorithmRegistry::allowing_insecure();
            registry.register(Arc::new(InsecureStubProvider::new()))?;
            Ok(registry)
        }
        Backend::InsecureStub => Err(CryptoError::BackendUnavailable(
            "backend 'insecure-stub' requires allow_insecure_backend = true".into(),
        )),
    }
}

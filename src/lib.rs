//! # qshield -- post-quantum sessions for IoT telemetry
//!
//! qshield probes what a device can do, binds it to one fixed post-quantum
//! algorithm suite, and runs the key lifecycle around it: ML-KEM session
//! agreement, ML-DSA signed and AEAD-encrypted telemetry frames, and
//! owner-scoped key storage with rotation and secure erase.
//!
//! ## Security Properties
//!
//! - **`#![forbid(unsafe_code)]`**: no `unsafe` blocks anywhere in qshield.
//! - **No silent downgrade**: a missing PQC backend fails initialization
//!   with `BackendUnavailable`. The non-secure stand-in backend must be
//!   selected in configuration and explicitly allowed.
//! - **Redacted secrets**: private keys, shared secrets and session keys
//!   zeroize on drop and print as `[REDACTED]`.
//! - **Defensive file handling**: every key file is symlink-checked,
//!   size-bounded and written with owner-only permissions via [`fs_guard`].
//!
//! ## Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`capability`] | Hardware capability probing |
//! | [`crypto`] | Algorithms, backends, profiles and suites |
//! | [`keystore`] | Durable keypairs, session-key cache, rotation |
//! | [`session`] | KEM session-key agreement |
//! | [`telemetry`] | Sealed and signed telemetry frames |
//! | [`context`] | One-shot device initialization |
//! | [`config`] | JSON configuration with secure defaults |
//! | [`fs_guard`] | Symlink-safe reads, restricted writes, secure erase |

#![forbid(unsafe_code)]

/// Hardware capability snapshot and the profiler that caches it.
pub mod capability;

/// Configuration model: loads `qshield.json` and provides secure defaults.
pub mod config;

/// Binds a profile to providers and a key store.
pub mod context;

/// Post-quantum primitives, backend registry and profile selection.
pub mod crypto;

/// Symlink-safe, size-bounded file I/O and secure erase. Single source of
/// truth for all key-file access.
pub mod fs_guard;

/// Owner-scoped key storage with rotation and session-key expiry.
pub mod keystore;

/// KEM-based session-key agreement.
pub mod session;

/// Encrypted, signed telemetry frames and their JSON transport form.
pub mod telemetry;

pub use capability::{CapabilityProfiler, CapabilitySnapshot};
pub use config::QShieldConfig;
pub use context::DeviceContext;
pub use crypto::profile::{AlgorithmSuite, DeviceProfile, ProfileSelector};
pub use crypto::CryptoError;
pub use keystore::{KeyInfo, KeyStore, OwnerState};
pub use session::SessionEstablisher;
pub use telemetry::{TelemetryCodec, TelemetryFrame};

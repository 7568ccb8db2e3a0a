//! Cryptographic error types for the qshield session engine.
//!
//! All errors from the crypto and key-store subsystems are represented by
//! [`CryptoError`], which is informative for operators without leaking
//! sensitive internal state (no key material in error messages).

use std::fmt;

/// Errors produced by qshield cryptographic and key-store operations.
///
/// These errors describe *what* failed (size mismatch, tag mismatch, missing
/// key) but never include raw key bytes, shared secrets or plaintext in their
/// `Display` output, so they are safe to log and to surface to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A key, ciphertext or signature does not match its variant's fixed size.
    InvalidKeySize {
        /// What was being checked (e.g. `"ml-kem-512 public key"`).
        what: String,
        /// Length required by the variant's size table.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// KEM encapsulation was rejected by the backend.
    EncapsulationFailure(String),

    /// KEM decapsulation failed (wrong lengths or backend rejection).
    DecapsulationFailure(String),

    /// A telemetry frame decrypted, but its signature did not verify.
    SignatureMismatch {
        /// Owner the frame claimed to come from.
        owner_id: String,
    },

    /// AEAD authentication failed. Deliberately carries no detail.
    DecryptionAuthFailure,

    /// An encoded blob or frame is structurally invalid.
    InvalidFormat(String),

    /// No keypair for `(owner_id, variant)` in cache or on disk.
    KeyNotFound {
        /// Owner that was looked up.
        owner_id: String,
        /// Variant id that was looked up.
        variant: String,
    },

    /// Durable storage failed. Fatal to the operation; never retried.
    StorageIo(String),

    /// No backend implements the requested suite.
    BackendUnavailable(String),

    /// A backend was asked for a variant it does not implement.
    UnsupportedAlgorithm(String),

    /// Owner id is empty, too long, or would escape the key directory.
    InvalidOwnerId(String),
}

impl CryptoError {
    /// Shorthand for a size-table violation.
    pub fn invalid_size(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::InvalidKeySize {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Wraps an I/O failure with the operation that caused it.
    pub(crate) fn storage(op: &str, err: &std::io::Error) -> Self {
        Self::StorageIo(format!("{op}: {err}"))
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeySize {
                what,
                expected,
                actual,
            } => {
                write!(f, "invalid size for {what}: expected {expected} bytes, got {actual}")
            }
            Self::EncapsulationFailure(msg) => {
                write!(f, "KEM encapsulation failed: {msg}")
            }
            Self::DecapsulationFailure(msg) => {
                write!(f, "KEM decapsulation failed: {msg}")
            }
            Self::SignatureMismatch { owner_id } => {
                write!(f, "signature mismatch for frame from '{owner_id}'")
            }
            Self::DecryptionAuthFailure => f.write_str("decryption failed"),
            Self::InvalidFormat(msg) => write!(f, "invalid format: {msg}"),
            Self::KeyNotFound { owner_id, variant } => {
                write!(f, "no {variant} keypair for owner '{owner_id}'")
            }
            Self::StorageIo(msg) => write!(f, "key storage error: {msg}"),
            Self::BackendUnavailable(msg) => {
                write!(f, "crypto backend unavailable: {msg}")
            }
            Self::UnsupportedAlgorithm(alg) => {
                write!(f, "unsupported algorithm: {alg}")
            }
            Self::InvalidOwnerId(msg) => write!(f, "invalid owner id: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

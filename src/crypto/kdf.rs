//! Session-key derivation from a KEM shared secret.
//!
//! The raw ML-KEM shared secret is never used as a key. It is passed once
//! through HKDF-SHA-256 (RFC 5869, no salt) with a fixed protocol context
//! string and the 32-byte output becomes the AEAD session key. Both sides
//! of a session run the identical derivation.
//!
//! ## Security Properties
//!
//! - The `info` string binds the output to this protocol, so the same
//!   shared secret fed into another protocol yields an unrelated key.
//! - The shared secret is taken by value and zeroized when it drops at the
//!   end of [`derive_session_key`]; the intermediate output buffer is
//!   zeroized as soon as it has been copied into the key.

use hmac::Hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::algorithm::AEAD_KEY_LEN;
use super::errors::CryptoError;
use super::{SharedSecret, SymmetricKey};

type HkdfSha256 = hkdf::Hkdf<Sha256, Hmac<Sha256>>;

/// Context string for session-key derivation.
pub const SESSION_KDF_INFO: &[u8] = b"qshield session";

/// Derives the 32-byte session key from a KEM shared secret and discards
/// the shared secret.
pub fn derive_session_key(shared: SharedSecret) -> Result<SymmetricKey, CryptoError> {
    if shared.0.is_empty() {
        return Err(CryptoError::DecapsulationFailure(
            "empty shared secret cannot seed a session key".into(),
        ));
    }

    let hk = HkdfSha256::new(None, &shared.0);
    let mut okm = [0u8; AEAD_KEY_LEN];
    hk.expand(SESSION_KDF_INFO, &mut okm)
        .map_err(|_| CryptoError::InvalidFormat("HKDF-SHA-256 expand failed".into()))?;

    let key = SymmetricKey::new(okm);
    okm.zeroize();
    Ok(key)
}

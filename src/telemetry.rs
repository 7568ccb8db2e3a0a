//! Encrypted, signed telemetry frames.
//!
//! ## Frame construction
//!
//! | Step | Input | Output |
//! |------|-------|--------|
//! | encrypt | plaintext, session key, bound AAD | `ciphertext`, `nonce` |
//! | sign | plaintext, device signing key | `signature` |
//!
//! The bound AAD is `len(owner_id) || owner_id || associated_data` with a
//! 4-byte big-endian length, so a frame replayed under another owner id
//! fails authentication.
//!
//! Opening decrypts first and verifies second. A tampered frame therefore
//! reports [`CryptoError::DecryptionAuthFailure`]; an intact frame signed by
//! the wrong key reports [`CryptoError::SignatureMismatch`].

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::crypto::aead::SymmetricCipherProvider;
use crate::crypto::profile::DeviceProfile;
use crate::crypto::registry::AlgorithmRegistry;
use crate::crypto::signature::SignatureProvider;
use crate::crypto::{AlgorithmVariant, CryptoError, KeyPair, PublicKeyBytes, SymmetricKey};
use crate::keystore::validate_owner_id;

/// The unit exchanged between device and collector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// AEAD ciphertext with tag.
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    /// 12-byte AEAD nonce.
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,
    /// Signature over the plaintext.
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    /// Caller-supplied associated data, authenticated but not encrypted.
    #[serde(with = "hex_bytes")]
    pub associated_data: Vec<u8>,
    /// Sending device.
    pub owner_id: String,
}

impl TelemetryFrame {
    /// Encodes the frame as JSON with hex byte fields.
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self)
            .map_err(|e| CryptoError::InvalidFormat(format!("frame encoding: {e}")))
    }

    /// Decodes a frame produced by [`Self::to_json`].
    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(json).map_err(|e| CryptoError::InvalidFormat(format!("frame decoding: {e}")))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

fn bound_aad(owner_id: &str, associated_data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let len = u32::try_from(owner_id.len())
        .map_err(|_| CryptoError::InvalidOwnerId("owner id too long".into()))?;
    let mut aad = Vec::with_capacity(4 + owner_id.len() + associated_data.len());
    aad.extend_from_slice(&len.to_be_bytes());
    aad.extend_from_slice(owner_id.as_bytes());
    aad.extend_from_slice(associated_data);
    Ok(aad)
}

/// Seals and opens frames under one profile's suite.
#[derive(Clone, Debug)]
pub struct TelemetryCodec {
    profile: DeviceProfile,
    cipher: SymmetricCipherProvider,
    signer: SignatureProvider,
}

impl TelemetryCodec {
    /// Binds the profile's AEAD and signature scheme.
    pub fn new(profile: DeviceProfile, registry: &AlgorithmRegistry) -> Result<Self, CryptoError> {
        let suite = profile.suite();
        Ok(Self {
            profile,
            cipher: SymmetricCipherProvider::new(suite.aead),
            signer: SignatureProvider::new(suite.signature, registry)?,
        })
    }

    /// The fixed profile.
    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// The AEAD strategy in use.
    pub fn cipher(&self) -> &SymmetricCipherProvider {
        &self.cipher
    }

    /// The signature strategy in use.
    pub fn signer(&self) -> &SignatureProvider {
        &self.signer
    }

    /// Encrypts `plaintext` and signs it with `signing_key`.
    pub fn seal(
        &self,
        plaintext: &[u8],
        associated_data: &[u8],
        session_key: &SymmetricKey,
        signing_key: &KeyPair,
    ) -> Result<TelemetryFrame, CryptoError> {
        let expected = AlgorithmVariant::Signature(self.signer.algorithm());
        if signing_key.variant != expected {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "{} signing key for a {expected} codec",
                signing_key.variant
            )));
        }
        let owner_id = signing_key.owner_id.as_str();
        validate_owner_id(owner_id)?;

        let aad = bound_aad(owner_id, associated_data)?;
        let (ciphertext, nonce) = self.cipher.encrypt(plaintext, session_key, Some(&aad))?;
        let signature = self.signer.sign(plaintext, &signing_key.private)?;

        debug!(
            "sealed {}-byte frame for '{owner_id}' ({})",
            ciphertext.len(),
            self.cipher.cipher().id()
        );
        Ok(TelemetryFrame {
            ciphertext,
            nonce: nonce.to_vec(),
            signature: signature.0,
            associated_data: associated_data.to_vec(),
            owner_id: owner_id.to_string(),
        })
    }

    /// Decrypts `frame`, then verifies its signature over the plaintext.
    ///
    /// Every decryption failure, a malformed nonce included, surfaces as
    /// `DecryptionAuthFailure`.
    pub fn open(
        &self,
        frame: &TelemetryFrame,
        session_key: &SymmetricKey,
        verification_key: &PublicKeyBytes,
    ) -> Result<Vec<u8>, CryptoError> {
        let aad = bound_aad(&frame.owner_id, &frame.associated_data)?;
        let plaintext = self
            .cipher
            .decrypt(&frame.ciphertext, session_key, &frame.nonce, Some(&aad))
            .map_err(|err| {
                warn!("frame from '{}' failed authentication: {err}", frame.owner_id);
                CryptoError::DecryptionAuthFailure
            })?;

        if !self.signer.verify(&plaintext, &frame.signature, &verification_key.0) {
            warn!("frame from '{}' has an invalid signature", frame.owner_id);
            return Err(CryptoError::SignatureMismatch {
                owner_id: frame.owner_id.clone(),
            });
        }
        Ok(plaintext)
    }
}

//! Algorithm taxonomy for the qshield session engine.
//!
//! Every primitive the engine can bind is a closed enum with a fixed size
//! table. Sizes are constants of the variant, never of the key: a key whose
//! length disagrees with its variant's table is rejected before use, never
//! truncated or padded.
//!
//! ## Design Rationale
//!
//! - **Enums over strings**: the set of variants is closed for a given
//!   release, so exhaustive matches catch a missing size table or backend
//!   binding at compile time.
//! - **Canonical ids**: each variant has one kebab-case id (`ml-kem-512`,
//!   `ml-dsa-44`, `aes-256-gcm`). Ids name on-disk key files and registry
//!   dispatch entries, so they must stay stable across releases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// NIST security levels (1-5) as defined in the PQC standardization process.
///
/// - Level 1: At least as hard to break as AES-128 (NIST category 1)
/// - Level 2: At least as hard to break as SHA-256 collision (NIST category 2)
/// - Level 3: At least as hard to break as AES-192 (NIST category 3)
/// - Level 5: At least as hard to break as AES-256 (NIST category 5)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NistLevel(u8);

impl NistLevel {
    /// NIST Level 1 (~AES-128 equivalent).
    pub const L1: Self = Self(1);
    /// NIST Level 2 (~SHA-256 collision equivalent).
    pub const L2: Self = Self(2);
    /// NIST Level 3 (~AES-192 equivalent).
    pub const L3: Self = Self(3);
    /// NIST Level 5 (~AES-256 equivalent).
    pub const L5: Self = Self(5);

    /// Returns the raw numeric level (1-5).
    pub fn value(self) -> u8 {
        self.0
    }
}

/// Descriptor a backend publishes for each algorithm it implements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlgorithmDescriptor {
    /// Canonical string identifier (e.g., `"ml-kem-512"`).
    pub id: String,
    /// NIST security level.
    pub nist_level: NistLevel,
    /// Whether the backend's implementation is a real quantum-safe primitive.
    /// The non-secure stand-in backend reports `false` here.
    pub quantum_safe: bool,
    /// FIPS standard the variant is specified by.
    pub standard: &'static str,
}

// ---------------------------------------------------------------------------
// KEM algorithms
// ---------------------------------------------------------------------------

/// Fixed byte sizes of one KEM variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct KemSizes {
    /// Encapsulation (public) key length.
    pub public_key: usize,
    /// Decapsulation (private) key length.
    pub private_key: usize,
    /// Ciphertext length.
    pub ciphertext: usize,
    /// Shared-secret length.
    pub shared_secret: usize,
}

/// Key Encapsulation Mechanism variants (FIPS 203, ML-KEM).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KemAlgorithm {
    /// ML-KEM-512 (NIST Level 1).
    #[serde(rename = "ml-kem-512")]
    MlKem512,
    /// ML-KEM-768 (NIST Level 3).
    #[serde(rename = "ml-kem-768")]
    MlKem768,
    /// ML-KEM-1024 (NIST Level 5).
    #[serde(rename = "ml-kem-1024")]
    MlKem1024,
}

impl KemAlgorithm {
    /// All KEM variants, weakest first.
    pub const ALL: [Self; 3] = [Self::MlKem512, Self::MlKem768, Self::MlKem1024];

    /// Returns the NIST security level for this KEM.
    pub fn nist_level(self) -> NistLevel {
        match self {
            Self::MlKem512 => NistLevel::L1,
            Self::MlKem768 => NistLevel::L3,
            Self::MlKem1024 => NistLevel::L5,
        }
    }

    /// Returns the fixed size table for this variant.
    pub const fn sizes(self) -> KemSizes {
        match self {
            Self::MlKem512 => KemSizes {
                public_key: 800,
                private_key: 1632,
                ciphertext: 768,
                shared_secret: 32,
            },
            Self::MlKem768 => KemSizes {
                public_key: 1184,
                private_key: 2400,
                ciphertext: 1088,
                shared_secret: 32,
            },
            Self::MlKem1024 => KemSizes {
                public_key: 1568,
                private_key: 3168,
                ciphertext: 1568,
                shared_secret: 32,
            },
        }
    }

    /// Returns the canonical string identifier.
    pub fn id(self) -> &'static str {
        match self {
            Self::MlKem512 => "ml-kem-512",
            Self::MlKem768 => "ml-kem-768",
            Self::MlKem1024 => "ml-kem-1024",
        }
    }

    /// Parses a canonical KEM algorithm string.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "ml-kem-512" => Some(Self::MlKem512),
            "ml-kem-768" => Some(Self::MlKem768),
            "ml-kem-1024" => Some(Self::MlKem1024),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Signature algorithms
// ---------------------------------------------------------------------------

/// Fixed byte sizes of one signature variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SignatureSizes {
    /// Verifying (public) key length.
    pub public_key: usize,
    /// Signing (private) key length.
    pub private_key: usize,
    /// Signature length.
    pub signature: usize,
}

/// Signature variants (FIPS 204, ML-DSA).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// ML-DSA-44 (NIST Level 2).
    #[serde(rename = "ml-dsa-44")]
    MlDsa44,
    /// ML-DSA-65 (NIST Level 3).
    #[serde(rename = "ml-dsa-65")]
    MlDsa65,
    /// ML-DSA-87 (NIST Level 5).
    #[serde(rename = "ml-dsa-87")]
    MlDsa87,
}

impl SignatureAlgorithm {
    /// All signature variants, weakest first.
    pub const ALL: [Self; 3] = [Self::MlDsa44, Self::MlDsa65, Self::MlDsa87];

    /// Returns the NIST security level for this algorithm.
    pub fn nist_level(self) -> NistLevel {
        match self {
            Self::MlDsa44 => NistLevel::L2,
            Self::MlDsa65 => NistLevel::L3,
            Self::MlDsa87 => NistLevel::L5,
        }
    }

    /// Returns the fixed size table for this variant.
    pub const fn sizes(self) -> SignatureSizes {
        match self {
            Self::MlDsa44 => SignatureSizes {
                public_key: 1312,
                private_key: 2560,
                signature: 2420,
            },
            Self::MlDsa65 => SignatureSizes {
                public_key: 1952,
                private_key: 4032,
                signature: 3309,
            },
            Self::MlDsa87 => SignatureSizes {
                public_key: 2592,
                private_key: 4896,
                signature: 4627,
            },
        }
    }

    /// Returns the canonical string identifier.
    pub fn id(self) -> &'static str {
        match self {
            Self::MlDsa44 => "ml-dsa-44",
            Self::MlDsa65 => "ml-dsa-65",
            Self::MlDsa87 => "ml-dsa-87",
        }
    }

    /// Parses a canonical signature algorithm string.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "ml-dsa-44" => Some(Self::MlDsa44),
            "ml-dsa-65" => Some(Self::MlDsa65),
            "ml-dsa-87" => Some(Self::MlDsa87),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AEAD ciphers
// ---------------------------------------------------------------------------

/// Symmetric key length shared by every supported AEAD cipher.
pub const AEAD_KEY_LEN: usize = 32;
/// Nonce length shared by every supported AEAD cipher.
pub const AEAD_NONCE_LEN: usize = 12;
/// Authentication tag length shared by every supported AEAD cipher.
pub const AEAD_TAG_LEN: usize = 16;

/// Authenticated encryption ciphers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AeadCipher {
    /// AES-256-GCM. Preferred when the CPU has AES instructions.
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    /// ChaCha20-Poly1305. Constant-time in software on any CPU.
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl AeadCipher {
    /// Returns the canonical string identifier.
    pub fn id(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    /// Parses a canonical cipher string.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "aes-256-gcm" => Some(Self::Aes256Gcm),
            "chacha20-poly1305" => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Key-bearing variants
// ---------------------------------------------------------------------------

/// Variant tag carried by every keypair: which primitive the key belongs to.
///
/// The id doubles as the on-disk file prefix (`{id}_public.key`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlgorithmVariant {
    /// A KEM keypair.
    Kem(KemAlgorithm),
    /// A signature keypair.
    Signature(SignatureAlgorithm),
}

impl AlgorithmVariant {
    /// Returns the canonical string identifier.
    pub fn id(self) -> &'static str {
        match self {
            Self::Kem(kem) => kem.id(),
            Self::Signature(sig) => sig.id(),
        }
    }

    /// Parses any KEM or signature id.
    pub fn from_id(id: &str) -> Option<Self> {
        KemAlgorithm::from_id(id)
            .map(Self::Kem)
            .or_else(|| SignatureAlgorithm::from_id(id).map(Self::Signature))
    }

    /// Expected public-key length for this variant.
    pub fn public_key_len(self) -> usize {
        match self {
            Self::Kem(kem) => kem.sizes().public_key,
            Self::Signature(sig) => sig.sizes().public_key,
        }
    }

    /// Expected private-key length for this variant.
    pub fn private_key_len(self) -> usize {
        match self {
            Self::Kem(kem) => kem.sizes().private_key,
            Self::Signature(sig) => sig.sizes().private_key,
        }
    }
}

impl From<KemAlgorithm> for AlgorithmVariant {
    fn from(kem: KemAlgorithm) -> Self {
        Self::Kem(kem)
    }
}

impl From<SignatureAlgorithm> for AlgorithmVariant {
    fn from(sig: SignatureAlgorithm) -> Self {
        Self::Signature(sig)
    }
}

impl fmt::Display for AlgorithmVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

//! Device profiles and the suite table they select.
//!
//! Profiles form a closed set ordered by capability. Each maps to exactly
//! one [`AlgorithmSuite`] through [`DeviceProfile::suite`], an exhaustive
//! match, so adding a profile without a suite entry does not compile.

use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::algorithm::{AeadCipher, KemAlgorithm, KemSizes, SignatureAlgorithm, SignatureSizes};
use crate::capability::CapabilitySnapshot;

/// Available memory at or above which a device without crypto acceleration
/// still runs the `standard` profile (32 MiB).
pub const STANDARD_MEMORY_THRESHOLD: u64 = 32 * 1024 * 1024;

/// Device profile, in ascending order of capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    /// Low-memory devices.
    Constrained,
    /// Devices with enough memory for PQC but no crypto acceleration.
    Standard,
    /// Devices with hardware AES or ARM crypto extensions.
    HighPerformance,
}

impl DeviceProfile {
    /// Every profile, least capable first.
    pub const ALL: [Self; 3] = [Self::Constrained, Self::Standard, Self::HighPerformance];

    /// Returns the canonical profile name.
    pub fn id(self) -> &'static str {
        match self {
            Self::Constrained => "constrained",
            Self::Standard => "standard",
            Self::HighPerformance => "high_performance",
        }
    }

    /// Parses a profile name (snake_case or kebab-case).
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "constrained" => Some(Self::Constrained),
            "standard" => Some(Self::Standard),
            "high_performance" => Some(Self::HighPerformance),
            _ => None,
        }
    }

    /// Parses a profile name, treating anything unrecognized as `standard`.
    pub fn parse_or_default(id: &str) -> Self {
        Self::from_id(id).unwrap_or_else(|| {
            warn!("unknown device profile '{id}', using standard");
            Self::Standard
        })
    }

    /// The fixed algorithm suite for this profile.
    ///
    /// Every profile shares ML-KEM-512 and ML-DSA-44 so any two devices can
    /// key a session; only the AEAD follows hardware acceleration.
    pub const fn suite(self) -> AlgorithmSuite {
        let aead = match self {
            Self::HighPerformance => AeadCipher::Aes256Gcm,
            Self::Standard | Self::Constrained => AeadCipher::ChaCha20Poly1305,
        };
        AlgorithmSuite {
            kem: KemAlgorithm::MlKem512,
            signature: SignatureAlgorithm::MlDsa44,
            aead,
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::Standard
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The KEM, signature and AEAD bound to a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AlgorithmSuite {
    /// Key encapsulation variant.
    pub kem: KemAlgorithm,
    /// Signature variant.
    pub signature: SignatureAlgorithm,
    /// Authenticated encryption cipher.
    pub aead: AeadCipher,
}

impl AlgorithmSuite {
    /// Size table of the suite's KEM.
    pub fn kem_sizes(&self) -> KemSizes {
        self.kem.sizes()
    }

    /// Size table of the suite's signature scheme.
    pub fn signature_sizes(&self) -> SignatureSizes {
        self.signature.sizes()
    }
}

/// Maps a capability snapshot (or an override) to a device profile.
#[derive(Clone, Copy, Debug)]
pub struct ProfileSelector {
    memory_threshold: u64,
}

impl ProfileSelector {
    /// Selector using the 32 MiB `standard` threshold.
    pub fn new() -> Self {
        Self {
            memory_threshold: STANDARD_MEMORY_THRESHOLD,
        }
    }

    /// Selector with a custom `standard` memory threshold.
    pub fn with_memory_threshold(memory_threshold: u64) -> Self {
        Self { memory_threshold }
    }

    /// Picks a profile. An override always wins; otherwise acceleration
    /// dominates memory.
    pub fn select(&self, snapshot: &CapabilitySnapshot, override_profile: Option<DeviceProfile>) -> DeviceProfile {
        let profile = match override_profile {
            Some(profile) => profile,
            None if snapshot.has_crypto_acceleration() => DeviceProfile::HighPerformance,
            None if snapshot.available_memory_bytes >= self.memory_threshold => {
                DeviceProfile::Standard
            }
            None => DeviceProfile::Constrained,
        };
        info!(
            "device profile {profile} selected ({})",
            if override_profile.is_some() {
                "override"
            } else {
                "probed"
            }
        );
        profile
    }

    /// [`Self::select`] followed by the suite lookup.
    pub fn select_suite(
        &self,
        snapshot: &CapabilitySnapshot,
        override_profile: Option<DeviceProfile>,
    ) -> (DeviceProfile, AlgorithmSuite) {
        let profile = self.select(snapshot, override_profile);
        (profile, profile.suite())
    }
}

impl Default for ProfileSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn snapshot(aes_ni: bool, arm_crypto: bool, available_mib: u64) -> CapabilitySnapshot {
        CapabilitySnapshot {
            aes_ni,
            arm_crypto,
            available_memory_bytes: available_mib * MIB,
            total_memory_bytes: available_mib * MIB,
            ..CapabilitySnapshot::default()
        }
    }

    #[test]
    fn acceleration_selects_high_performance() {
        let sel = ProfileSelector::new();
        assert_eq!(sel.select(&snapshot(true, false, 1), None), DeviceProfile::HighPerformance);
        assert_eq!(sel.select(&snapshot(false, true, 1), None), DeviceProfile::HighPerformance);
    }

    #[test]
    fn memory_selects_standard_or_constrained() {
        let sel = ProfileSelector::new();
        assert_eq!(sel.select(&snapshot(false, false, 32), None), DeviceProfile::Standard);
        assert_eq!(sel.select(&snapshot(false, false, 31), None), DeviceProfile::Constrained);
    }

    #[test]
    fn override_always_wins() {
        let sel = ProfileSelector::new();
        for profile in DeviceProfile::ALL {
            assert_eq!(sel.select(&snapshot(true, true, 4096), Some(profile)), profile);
            assert_eq!(sel.select(&snapshot(false, false, 0), Some(profile)), profile);
        }
    }

    #[test]
    fn threshold_is_configurable() {
        let sel = ProfileSelector::with_memory_threshold(8 * MIB);
        assert_eq!(sel.select(&snapshot(false, false, 8), None), DeviceProfile::Standard);
    }

    #[test]
    fn suite_table_is_total() {
        let hp = DeviceProfile::HighPerformance.suite();
        assert_eq!(hp.kem, KemAlgorithm::MlKem512);
        assert_eq!(hp.signature, SignatureAlgorithm::MlDsa44);
        assert_eq!(hp.aead, AeadCipher::Aes256Gcm);

        let std = DeviceProfile::Standard.suite();
        assert_eq!(std.kem_sizes().public_key, 800);
        assert_eq!(std.kem_sizes().private_key, 1632);
        assert_eq!(std.aead, AeadCipher::ChaCha20Poly1305);
        assert_eq!(DeviceProfile::Constrained.suite(), std);
    }

    #[test]
    fn unknown_profile_name_defaults_to_standard() {
        assert_eq!(DeviceProfile::parse_or_default("turbo"), DeviceProfile::Standard);
        assert_eq!(
            DeviceProfile::parse_or_default("high-performance"),
            DeviceProfile::HighPerformance
        );
        assert_eq!(DeviceProfile::from_id("CONSTRAINED"), Some(DeviceProfile::Constrained));
    }

    #[test]
    fn profiles_are_ordered_by_capability() {
        assert!(DeviceProfile::Constrained < DeviceProfile::Standard);
        assert!(DeviceProfile::Standard < DeviceProfile::HighPerformance);
    }

    #[test]
    fn profile_serde_uses_snake_case() {
        let json = serde_json::to_string(&DeviceProfile::HighPerformance).unwrap();
        assert_eq!(json, "\"high_performance\"");
    }
}

//! Hardware capability probing.
//!
//! Probing is advisory: every source that cannot be read (no
//! `/proc/cpuinfo`, an unsupported `sysinfo` platform, a foreign
//! architecture) reports the feature as absent instead of failing. The
//! [`CapabilityProfiler`] caches a single snapshot per run and only
//! refreshes it on an explicit [`CapabilityProfiler::reprobe`].

use std::collections::HashSet;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sysinfo::System;

const CPUINFO_PATH: &str = "/proc/cpuinfo";
const SECURE_ELEMENT_PATHS: [&str; 3] = ["/dev/tpm0", "/dev/tpmrm0", "/sys/bus/tee"];

/// Where the best available randomness comes from, best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomSource {
    /// x86 `RDSEED` (raw entropy).
    Rdseed,
    /// x86 `RDRAND` (DRBG output).
    Rdrand,
    /// The kernel CSPRNG.
    Urandom,
    /// Software-only generator.
    Software,
}

/// What the executing hardware offers. Immutable once captured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    /// x86 AES-NI.
    pub aes_ni: bool,
    /// x86 AVX2.
    pub avx2: bool,
    /// x86 AVX-512 foundation.
    pub avx512: bool,
    /// ARM NEON / ASIMD.
    pub neon: bool,
    /// ARMv8 crypto extensions (AES/PMULL).
    pub arm_crypto: bool,
    /// x86 `RDRAND`.
    pub rdrand: bool,
    /// x86 `RDSEED`.
    pub rdseed: bool,
    /// TPM device node or TEE bus present.
    pub secure_element: bool,
    /// Total physical memory in bytes (0 when unknown).
    pub total_memory_bytes: u64,
    /// Available memory in bytes (0 when unknown).
    pub available_memory_bytes: u64,
    /// CPU architecture name, e.g. `x86_64` or `aarch64`.
    pub cpu_arch: String,
}

impl CapabilitySnapshot {
    /// Hardware AES support on either architecture.
    pub fn has_crypto_acceleration(&self) -> bool {
        self.aes_ni || self.arm_crypto
    }

    /// Wide-vector instruction support (AVX2, AVX-512 or NEON).
    pub fn has_wide_vectors(&self) -> bool {
        self.avx2 || self.avx512 || self.neon
    }

    /// Any hardware RNG instruction.
    pub fn has_hardware_rng(&self) -> bool {
        self.rdrand || self.rdseed
    }

    /// The strongest randomness source on this host.
    pub fn random_source(&self) -> RandomSource {
        if self.rdseed {
            RandomSource::Rdseed
        } else if self.rdrand {
            RandomSource::Rdrand
        } else if Path::new("/dev/urandom").exists() {
            RandomSource::Urandom
        } else {
            RandomSource::Software
        }
    }

    /// Whether available memory meets `threshold` bytes.
    pub fn pqc_capable(&self, threshold: u64) -> bool {
        self.available_memory_bytes >= threshold
    }
}

/// Caches one capability snapshot for the lifetime of a run.
#[derive(Clone, Debug)]
pub struct CapabilityProfiler {
    snapshot: CapabilitySnapshot,
}

impl CapabilityProfiler {
    /// Probes the host once.
    pub fn new() -> Self {
        Self { snapshot: probe() }
    }

    /// Uses a pre-built snapshot instead of probing. Useful for tests and
    /// for devices whose capabilities are provisioned rather than probed.
    pub fn from_snapshot(snapshot: CapabilitySnapshot) -> Self {
        Self { snapshot }
    }

    /// The cached snapshot.
    pub fn snapshot(&self) -> &CapabilitySnapshot {
        &self.snapshot
    }

    /// Replaces the cached snapshot with a fresh probe.
    pub fn reprobe(&mut self) -> &CapabilitySnapshot {
        self.snapshot = probe();
        &self.snapshot
    }
}

impl Default for CapabilityProfiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Probes the executing host. Never fails.
pub fn probe() -> CapabilitySnapshot {
    let flags = std::fs::read_to_string(CPUINFO_PATH)
        .map(|text| cpuinfo_flags(&text))
        .unwrap_or_else(|err| {
            debug!("{CPUINFO_PATH} unreadable ({err}); relying on runtime detection");
            HashSet::new()
        });

    let mut snapshot = snapshot_from_flags(&flags, std::env::consts::ARCH);
    detect_runtime_features(&mut snapshot);

    snapshot.secure_element = SECURE_ELEMENT_PATHS.iter().any(|p| Path::new(p).exists());

    if sysinfo::IS_SUPPORTED_SYSTEM {
        let mut sys = System::new();
        sys.refresh_memory();
        snapshot.total_memory_bytes = sys.total_memory();
        snapshot.available_memory_bytes = sys.available_memory();
    } else {
        warn!("memory size unavailable on this platform; treating as 0");
    }

    debug!(
        "capabilities: arch={} accel={} vectors={} hw_rng={} secure_element={} available={}B",
        snapshot.cpu_arch,
        snapshot.has_crypto_acceleration(),
        snapshot.has_wide_vectors(),
        snapshot.has_hardware_rng(),
        snapshot.secure_element,
        snapshot.available_memory_bytes
    );
    snapshot
}

/// Collects the feature words from the `flags` (x86) or `Features` (ARM)
/// lines of a `/proc/cpuinfo` dump.
pub fn cpuinfo_flags(cpuinfo: &str) -> HashSet<String> {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| {
            let key = key.trim();
            key.eq_ignore_ascii_case("flags") || key.eq_ignore_ascii_case("features")
        })
        .flat_map(|(_, value)| value.split_whitespace().map(str::to_ascii_lowercase))
        .collect()
}

/// Builds a snapshot from cpuinfo feature words alone.
pub fn snapshot_from_flags(flags: &HashSet<String>, arch: &str) -> CapabilitySnapshot {
    let has = |name: &str| flags.contains(name);
    CapabilitySnapshot {
        aes_ni: has("aes") && !arch.starts_with("aarch") && !arch.starts_with("arm"),
        avx2: has("avx2"),
        avx512: has("avx512f"),
        neon: has("neon") || has("asimd"),
        arm_crypto: (arch.starts_with("aarch") || arch.starts_with("arm"))
            && (has("aes") || has("pmull")),
        rdrand: has("rdrand"),
        rdseed: has("rdseed"),
        cpu_arch: arch.to_string(),
        ..CapabilitySnapshot::default()
    }
}

#[cfg(target_arch = "x86_64")]
fn detect_runtime_features(snapshot: &mut CapabilitySnapshot) {
    snapshot.aes_ni |= std::arch::is_x86_feature_detected!("aes");
    snapshot.avx2 |= std::arch::is_x86_feature_detected!("avx2");
    snapshot.avx512 |= std::arch::is_x86_feature_detected!("avx512f");
    snapshot.rdrand |= std::arch::is_x86_feature_detected!("rdrand");
    snapshot.rdseed |= std::arch::is_x86_feature_detected!("rdseed");
}

#[cfg(target_arch = "aarch64")]
fn detect_runtime_features(snapshot: &mut CapabilitySnapshot) {
    snapshot.neon |= std::arch::is_aarch64_feature_detected!("neon");
    snapshot.arm_crypto |= std::arch::is_aarch64_feature_detected!("aes");
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_runtime_features(_snapshot: &mut CapabilitySnapshot) {}

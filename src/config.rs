use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crypto::profile::{DeviceProfile, STANDARD_MEMORY_THRESHOLD};
use crate::crypto::registry::Backend;
use crate::crypto::CryptoError;

/// Maximum config file size (1 MB).
const MAX_CONFIG_BYTES: u64 = 1024 * 1024;

/// `profile` value that means "probe and select".
pub const AUTO_PROFILE: &str = "auto";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QShieldConfig {
    pub key_dir: PathBuf,
    pub profile: String,
    pub backend: Backend,
    pub allow_insecure_backend: bool,
    pub session_key_ttl_secs: u64,
    pub key_rotation_interval_secs: u64,
    pub min_pqc_memory_bytes: u64,
}

impl Default for QShieldConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("keys"),
            profile: AUTO_PROFILE.to_string(),
            backend: Backend::RustCrypto,
            allow_insecure_backend: false,
            session_key_ttl_secs: 30 * 60,
            key_rotation_interval_secs: 60 * 60,
            min_pqc_memory_bytes: STANDARD_MEMORY_THRESHOLD,
        }
    }
}

impl QShieldConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = match path {
            Some(p) => {
                let bytes = crate::fs_guard::read_validated(p, MAX_CONFIG_BYTES)
                    .with_context(|| format!("reading config {}", p.display()))?;
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("parsing config {}", p.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_key_ttl_secs == 0 {
            bail!("session_key_ttl_secs must be greater than zero");
        }
        if self.backend == Backend::InsecureStub && !self.allow_insecure_backend {
            return Err(CryptoError::BackendUnavailable(
                "backend 'insecure-stub' requires allow_insecure_backend = true".into(),
            )
            .into());
        }
        Ok(())
    }

    /// `None` for `auto`, otherwise the named profile (unknown names mean
    /// `standard`).
    pub fn profile_override(&self) -> Option<DeviceProfile> {
        if self.profile.trim().eq_ignore_ascii_case(AUTO_PROFILE) {
            None
        } else {
            Some(DeviceProfile::parse_or_default(&self.profile))
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_key_ttl_secs)
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.key_rotation_interval_secs)
    }
}

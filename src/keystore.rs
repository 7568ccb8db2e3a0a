//! Owner-scoped key storage, rotation and session-key caching.
//!
//! `KeyStore` is the only component with durable state. Every keypair lives
//! under `{root}/{owner_id}/` as two files:
//!
//! | File | Mode | Content |
//! |------|------|---------|
//! | `{variant}_public.key` | `0o644` | raw public key |
//! | `{variant}_private.key` | `0o600` | raw private key |
//! | `{variant}_{public,private}_{nanos}.key.archived` | unchanged | random bytes |
//!
//! The owner directory itself is `0o700`.
//!
//! ## Rotation
//!
//! Rotation runs under the owner's write lock:
//!
//! 1. evict the cached keypair, keeping the old one in memory
//! 2. check that both current files are regular files (or absent)
//! 3. generate the new keypair and write it to `*.key.pending`
//! 4. overwrite each current file in place with random bytes, then rename
//!    it to its `.key.archived` name, private half first
//! 5. rename the pending files to current and cache the new keypair
//!
//! A failure in 2 or 3 touches nothing current. A failure in 4 or 5 erases
//! the pending files, rewrites each half of the old keypair independently
//! and re-caches it, so the owner is never left without a usable key on
//! disk or in memory.
//!
//! Owner slots are dropped once they cache nothing, so lookups of unknown
//! owners do not grow the slot map.
//!
//! ## Locking
//!
//! A short-lived global mutex hands out one `RwLock` per owner. Mutations
//! hold the owner's write guard for their whole duration; reads share the
//! read guard. Guards drop on every exit path.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use log::{debug, error, info, warn};
use serde::Serialize;
use time::OffsetDateTime;

use crate::crypto::kem::KemProvider;
use crate::crypto::registry::AlgorithmRegistry;
use crate::crypto::signature::SignatureProvider;
use crate::crypto::{
    AlgorithmVariant, CryptoError, KeyPair, PublicKeyBytes, SecretKeyBytes, SymmetricKey,
};
use crate::fs_guard::{self, PRIVATE_MODE, PUBLIC_MODE};

/// Longest accepted owner id.
pub const MAX_OWNER_ID_LEN: usize = 128;

/// Upper bound on a key file read; larger than any variant's key.
const MAX_KEY_FILE_BYTES: u64 = 64 * 1024;

const PUBLIC_SUFFIX: &str = "_public.key";
const PENDING_EXT: &str = ".pending";
const ARCHIVED_EXT: &str = ".archived";

/// Rejects owner ids that could escape the key directory.
///
/// Accepted: 1 to 128 characters from `[A-Za-z0-9._-]`, excluding `.` and `..`.
pub fn validate_owner_id(owner_id: &str) -> Result<(), CryptoError> {
    let reason = if owner_id.is_empty() {
        Some("empty")
    } else if owner_id.len() > MAX_OWNER_ID_LEN {
        Some("longer than 128 characters")
    } else if owner_id == "." || owner_id == ".." {
        Some("reserved path component")
    } else if !owner_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
    {
        Some("contains characters outside [A-Za-z0-9._-]")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(CryptoError::InvalidOwnerId(format!(
            "{:?}: {reason}",
            owner_id.chars().take(MAX_OWNER_ID_LEN).collect::<String>()
        ))),
        None => Ok(()),
    }
}

/// A cached, time-bounded AEAD key. Never written to disk.
#[derive(Clone, Debug)]
pub struct SessionKey {
    /// The 32-byte key.
    pub key: SymmetricKey,
    /// Owner the key belongs to.
    pub owner_id: String,
    /// When the key was cached.
    pub created_at: OffsetDateTime,
    /// First instant at which the key is no longer usable.
    pub expires_at: OffsetDateTime,
}

impl SessionKey {
    /// `true` while `now < expires_at`.
    pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Lifecycle state of one owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerState {
    /// No keypair and no live session key.
    Absent,
    /// At least one active keypair.
    Keyed,
    /// A live session key is cached.
    Sessioned,
}

/// Summary of an owner's stored material. Contains no key bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    /// Owner id.
    pub owner_id: String,
    /// Variants with an active (non-archived) keypair on disk.
    pub algorithms: Vec<AlgorithmVariant>,
    /// Number of archived key files awaiting cleanup.
    pub archived_files: usize,
    /// Whether a live session key is cached.
    pub has_session_key: bool,
    /// Number of keypairs held in the memory cache.
    pub cached_keys: usize,
}

#[derive(Default)]
struct OwnerSlot {
    keypairs: HashMap<AlgorithmVariant, KeyPair>,
    session: Option<SessionKey>,
}

impl OwnerSlot {
    fn live_session(&self, now: OffsetDateTime) -> Option<&SessionKey> {
        self.session.as_ref().filter(|s| s.is_live_at(now))
    }
}

/// Durable keypair store plus volatile session-key cache.
pub struct KeyStore {
    root: PathBuf,
    registry: Arc<AlgorithmRegistry>,
    owners: Mutex<HashMap<String, Arc<RwLock<OwnerSlot>>>>,
}

impl KeyStore {
    /// Creates a store rooted at `root`. Nothing is touched on disk until
    /// the first keypair is stored.
    pub fn new(root: impl Into<PathBuf>, registry: Arc<AlgorithmRegistry>) -> Self {
        Self {
            root: root.into(),
            registry,
            owners: Mutex::new(HashMap::new()),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registry used to generate keypairs on rotation.
    pub fn registry(&self) -> &Arc<AlgorithmRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Keypairs
    // ------------------------------------------------------------------

    /// Writes `keypair` under `owner_id` and caches it.
    ///
    /// An existing keypair of the same variant is archived, never silently
    /// overwritten.
    pub fn store_keypair(&self, owner_id: &str, keypair: &KeyPair) -> Result<(), CryptoError> {
        validate_owner_id(owner_id)?;
        if keypair.owner_id != owner_id {
            return Err(CryptoError::InvalidOwnerId(format!(
                "keypair belongs to '{}', not '{owner_id}'",
                keypair.owner_id
            )));
        }
        keypair.validate()?;

        let slot = self.slot(owner_id);
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);

        let dir = self.prepare_owner_dir(owner_id)?;
        let previous = match guard.keypairs.remove(&keypair.variant) {
            Some(cached) => Some(cached),
            None => match read_keypair(&dir, owner_id, keypair.variant) {
                Ok(kp) => Some(kp),
                Err(CryptoError::KeyNotFound { .. }) => None,
                Err(err) => {
                    warn!("existing {} keypair for '{owner_id}' unreadable: {err}", keypair.variant);
                    None
                }
            },
        };

        if let Err(err) = install(&dir, keypair, previous.as_ref()) {
            if let Some(previous) = previous {
                guard.keypairs.insert(previous.variant, previous);
            }
            return Err(err);
        }
        guard.keypairs.insert(keypair.variant, keypair.clone());
        info!("stored {} keypair for '{owner_id}'", keypair.variant);
        Ok(())
    }

    /// Generates a keypair of `variant` through the registry and stores it.
    pub fn generate_keypair(&self, owner_id: &str, variant: AlgorithmVariant) -> Result<KeyPair, CryptoError> {
        validate_owner_id(owner_id)?;
        let keypair = self.fresh_keypair(owner_id, variant)?;
        self.store_keypair(owner_id, &keypair)?;
        Ok(keypair)
    }

    /// Returns a copy of the keypair, from cache or else from disk.
    pub fn load_keypair(&self, owner_id: &str, variant: AlgorithmVariant) -> Result<KeyPair, CryptoError> {
        validate_owner_id(owner_id)?;
        if let Some(slot) = self.existing_slot(owner_id) {
            let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(kp) = guard.keypairs.get(&variant) {
                return Ok(kp.clone());
            }
        }

        let slot = self.slot(owner_id);
        let loaded = self.fill_from_disk(&slot, owner_id, variant);
        drop(slot);
        if loaded.is_err() {
            self.release_if_idle(owner_id);
        }
        loaded
    }

    // Cache miss: fill under the write guard so a concurrent rotation
    // cannot interleave between the disk read and the cache insert.
    fn fill_from_disk(
        &self,
        slot: &RwLock<OwnerSlot>,
        owner_id: &str,
        variant: AlgorithmVariant,
    ) -> Result<KeyPair, CryptoError> {
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(kp) = guard.keypairs.get(&variant) {
            return Ok(kp.clone());
        }
        let keypair = read_keypair(&self.owner_dir(owner_id), owner_id, variant)?;
        debug!("loaded {variant} keypair for '{owner_id}' from disk");
        guard.keypairs.insert(variant, keypair.clone());
        Ok(keypair)
    }

    /// Replaces the current `variant` keypair with a freshly generated one.
    ///
    /// Fails with `KeyNotFound` if the owner has no such keypair. On a
    /// storage error the previous keypair stays current and usable.
    pub fn rotate(&self, owner_id: &str, variant: AlgorithmVariant) -> Result<KeyPair, CryptoError> {
        validate_owner_id(owner_id)?;
        let slot = self.slot(owner_id);
        let rotated = self.rotate_locked(&slot, owner_id, variant);
        drop(slot);
        if rotated.is_err() {
            self.release_if_idle(owner_id);
        }
        rotated
    }

    fn rotate_locked(
        &self,
        slot: &RwLock<OwnerSlot>,
        owner_id: &str,
        variant: AlgorithmVariant,
    ) -> Result<KeyPair, CryptoError> {
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);

        let dir = self.owner_dir(owner_id);
        let old = match guard.keypairs.remove(&variant) {
            Some(kp) => kp,
            None => read_keypair(&dir, owner_id, variant)?,
        };

        let new = match self.fresh_keypair(owner_id, variant) {
            Ok(kp) => kp,
            Err(err) => {
                guard.keypairs.insert(variant, old);
                return Err(err);
            }
        };

        if let Err(err) = install(&dir, &new, Some(&old)) {
            error!("rotation of {variant} for '{owner_id}' failed, previous key kept: {err}");
            guard.keypairs.insert(variant, old);
            return Err(err);
        }

        guard.keypairs.insert(variant, new.clone());
        info!("rotated {variant} keypair for '{owner_id}'");
        Ok(new)
    }

    /// Rotates only when the current public-key file is at least `interval` old.
    pub fn rotate_if_due(
        &self,
        owner_id: &str,
        variant: AlgorithmVariant,
        interval: Duration,
    ) -> Result<bool, CryptoError> {
        validate_owner_id(owner_id)?;
        let public_path = self.owner_dir(owner_id).join(public_name(variant));
        let modified = match fs::metadata(&public_path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(key_not_found(owner_id, variant))
            }
            Err(err) => return Err(CryptoError::storage("read key age", &err)),
        };

        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age < interval {
            debug!("{variant} key for '{owner_id}' is {}s old, not due", age.as_secs());
            return Ok(false);
        }
        self.rotate(owner_id, variant)?;
        Ok(true)
    }

    /// Securely erases every file of `owner_id` and drops all cached material.
    pub fn delete(&self, owner_id: &str) -> Result<(), CryptoError> {
        validate_owner_id(owner_id)?;
        let slot = self.slot(owner_id);
        let deleted = self.delete_locked(&slot, owner_id);
        drop(slot);
        self.release_if_idle(owner_id);
        deleted
    }

    fn delete_locked(&self, slot: &RwLock<OwnerSlot>, owner_id: &str) -> Result<(), CryptoError> {
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);

        let dir = self.owner_dir(owner_id);
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.is_dir() => {
                erase_dir(&dir).map_err(|err| {
                    error!("secure delete for '{owner_id}' failed: {err}");
                    CryptoError::storage("secure delete", &err)
                })?;
            }
            Ok(_) => {
                return Err(CryptoError::StorageIo(format!(
                    "key path for '{owner_id}' is not a directory"
                )))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(CryptoError::storage("secure delete", &err)),
        }

        guard.keypairs.clear();
        guard.session = None;
        info!("deleted all key material for '{owner_id}'");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Session keys
    // ------------------------------------------------------------------

    /// Caches `key` for `owner_id` until `now + ttl`, replacing any previous one.
    pub fn put_session_key(&self, owner_id: &str, key: SymmetricKey, ttl: Duration) -> Result<(), CryptoError> {
        validate_owner_id(owner_id)?;
        let created_at = OffsetDateTime::now_utc();
        let expires_at = time::Duration::try_from(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add(ttl))
            .ok_or_else(|| CryptoError::InvalidFormat(format!("session ttl {ttl:?} out of range")))?;

        let slot = self.slot(owner_id);
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        guard.session = Some(SessionKey {
            key,
            owner_id: owner_id.to_string(),
            created_at,
            expires_at,
        });
        debug!("cached session key for '{owner_id}' ({}s)", ttl.as_secs());
        Ok(())
    }

    /// Returns the live session key, evicting it if it has expired.
    pub fn get_session_key(&self, owner_id: &str) -> Option<SymmetricKey> {
        let slot = self.existing_slot(owner_id)?;

        {
            let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
            match &guard.session {
                None => return None,
                Some(s) if s.is_live_at(OffsetDateTime::now_utc()) => return Some(s.key.clone()),
                Some(_) => {}
            }
        }

        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        let now = OffsetDateTime::now_utc();
        if let Some(s) = guard.live_session(now) {
            // Replaced by a fresh key between the two guards.
            return Some(s.key.clone());
        }
        if guard.session.take().is_some() {
            debug!("evicted expired session key for '{owner_id}'");
        }
        None
    }

    /// Evicts every expired session key. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let slots: Vec<Arc<RwLock<OwnerSlot>>> = self
            .owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let now = OffsetDateTime::now_utc();
        let mut purged = 0;
        for slot in slots {
            let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
            if guard.session.as_ref().is_some_and(|s| !s.is_live_at(now)) {
                guard.session = None;
                purged += 1;
            }
        }
        if purged > 0 {
            debug!("purged {purged} expired session key(s)");
        }
        self.owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, slot| !is_idle(slot));
        purged
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Reports what is stored for `owner_id` without exposing key bytes.
    pub fn key_info(&self, owner_id: &str) -> Result<KeyInfo, CryptoError> {
        validate_owner_id(owner_id)?;
        let slot = self.existing_slot(owner_id);
        let guard = slot
            .as_ref()
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner));

        let (algorithms, archived_files) = scan_owner_dir(&self.owner_dir(owner_id))
            .map_err(|err| CryptoError::storage("list keys", &err))?;

        let now = OffsetDateTime::now_utc();
        Ok(KeyInfo {
            owner_id: owner_id.to_string(),
            algorithms,
            archived_files,
            has_session_key: guard.as_ref().is_some_and(|g| g.live_session(now).is_some()),
            cached_keys: guard.as_ref().map_or(0, |g| g.keypairs.len()),
        })
    }

    /// Lifecycle state of `owner_id`.
    pub fn owner_state(&self, owner_id: &str) -> Result<OwnerState, CryptoError> {
        let info = self.key_info(owner_id)?;
        Ok(if info.has_session_key {
            OwnerState::Sessioned
        } else if !info.algorithms.is_empty() || info.cached_keys > 0 {
            OwnerState::Keyed
        } else {
            OwnerState::Absent
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn slot(&self, owner_id: &str) -> Arc<RwLock<OwnerSlot>> {
        let mut owners = self.owners.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(owners.entry(owner_id.to_string()).or_default())
    }

    fn existing_slot(&self, owner_id: &str) -> Option<Arc<RwLock<OwnerSlot>>> {
        self.owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner_id)
            .cloned()
    }

    /// Drops the owner's slot if it caches nothing and no caller holds it.
    fn release_if_idle(&self, owner_id: &str) {
        let mut owners = self.owners.lock().unwrap_or_else(PoisonError::into_inner);
        if owners.get(owner_id).is_some_and(is_idle) {
            owners.remove(owner_id);
        }
    }

    fn owner_dir(&self, owner_id: &str) -> PathBuf {
        self.root.join(owner_id)
    }

    fn prepare_owner_dir(&self, owner_id: &str) -> Result<PathBuf, CryptoError> {
        let dir = self.owner_dir(owner_id);
        fs_guard::create_private_dir(&self.root)
            .and_then(|()| fs_guard::create_private_dir(&dir))
            .map_err(|err| {
                error!("cannot prepare key directory for '{owner_id}': {err}");
                CryptoError::storage("create key directory", &err)
            })?;
        Ok(dir)
    }

    fn fresh_keypair(&self, owner_id: &str, variant: AlgorithmVariant) -> Result<KeyPair, CryptoError> {
        match variant {
            AlgorithmVariant::Kem(kem) => KemProvider::new(kem, &self.registry)?.generate_keypair(owner_id),
            AlgorithmVariant::Signature(sig) => {
                SignatureProvider::new(sig, &self.registry)?.generate_keypair(owner_id)
            }
        }
    }
}

/// Only meaningful under the `owners` mutex: a count of one means the map
/// holds the sole reference and no guard can be outstanding.
fn is_idle(slot: &Arc<RwLock<OwnerSlot>>) -> bool {
    Arc::strong_count(slot) == 1
        && slot
            .try_read()
            .is_ok_and(|guard| guard.keypairs.is_empty() && guard.session.is_none())
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------
// File layout helpers
// ----------------------------------------------------------------------

fn public_name(variant: AlgorithmVariant) -> String {
    format!("{}{PUBLIC_SUFFIX}", variant.id())
}

fn private_name(variant: AlgorithmVariant) -> String {
    format!("{}_private.key", variant.id())
}

fn archived_name(variant: AlgorithmVariant, half: &str, stamp: i128) -> String {
    format!("{}_{half}_{stamp}.key{ARCHIVED_EXT}", variant.id())
}

fn key_not_found(owner_id: &str, variant: AlgorithmVariant) -> CryptoError {
    CryptoError::KeyNotFound {
        owner_id: owner_id.to_string(),
        variant: variant.id().to_string(),
    }
}

fn read_keypair(dir: &Path, owner_id: &str, variant: AlgorithmVariant) -> Result<KeyPair, CryptoError> {
    let read = |name: String| {
        fs_guard::read_validated(&dir.join(name), MAX_KEY_FILE_BYTES).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                key_not_found(owner_id, variant)
            } else {
                CryptoError::storage("read key file", &err)
            }
        })
    };

    let public = PublicKeyBytes(read(public_name(variant))?);
    let private = SecretKeyBytes(read(private_name(variant))?);
    let keypair = KeyPair {
        public,
        private,
        variant,
        owner_id: owner_id.to_string(),
    };
    keypair.validate()?;
    Ok(keypair)
}

/// Makes `new` the current keypair of its variant in `dir`, archiving the
/// current files if present. On failure, `previous` is written back.
fn install(dir: &Path, new: &KeyPair, previous: Option<&KeyPair>) -> Result<(), CryptoError> {
    let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
    install_stamped(dir, new, previous, stamp)
}

fn install_stamped(
    dir: &Path,
    new: &KeyPair,
    previous: Option<&KeyPair>,
    stamp: i128,
) -> Result<(), CryptoError> {
    let variant = new.variant;
    let public = dir.join(public_name(variant));
    let private = dir.join(private_name(variant));
    let public_pending = dir.join(format!("{}{PENDING_EXT}", public_name(variant)));
    let private_pending = dir.join(format!("{}{PENDING_EXT}", private_name(variant)));

    // Both halves must be archivable before either is overwritten.
    for current in [&private, &public] {
        fs_guard::ensure_regular_or_absent(current)
            .map_err(|err| CryptoError::storage("check current key files", &err))?;
    }

    let staged = fs_guard::write_with_mode(&public_pending, &new.public.0, PUBLIC_MODE)
        .and_then(|()| fs_guard::write_with_mode(&private_pending, &new.private.0, PRIVATE_MODE));
    if let Err(err) = staged {
        discard(&[&public_pending, &private_pending]);
        return Err(CryptoError::storage("stage new keypair", &err));
    }

    let swapped = archive_current(&private, &dir.join(archived_name(variant, "private", stamp)))
        .and_then(|()| archive_current(&public, &dir.join(archived_name(variant, "public", stamp))))
        .and_then(|()| fs::rename(&public_pending, &public))
        .and_then(|()| fs::rename(&private_pending, &private))
        .and_then(|()| fs_guard::sync_dir(dir));

    if let Err(err) = swapped {
        discard(&[&public_pending, &private_pending]);
        let Some(previous) = previous else {
            return Err(CryptoError::storage("install new keypair", &err));
        };
        if let Err(restore_err) = restore(dir, &private, &public, previous) {
            error!("could not restore previous {variant} keypair: {restore_err}");
            return Err(CryptoError::StorageIo(format!(
                "install new keypair: {err}; restore previous keypair: {restore_err}"
            )));
        }
        return Err(CryptoError::storage("install new keypair", &err));
    }
    Ok(())
}

/// Rewrites both halves of `previous`, private first. Each half is attempted
/// even if the other fails.
fn restore(dir: &Path, private: &Path, public: &Path, previous: &KeyPair) -> Result<(), String> {
    let mut failures = Vec::new();
    if let Err(err) = fs_guard::write_with_mode(private, &previous.private.0, PRIVATE_MODE) {
        failures.push(format!("private half: {err}"));
    }
    if let Err(err) = fs_guard::write_with_mode(public, &previous.public.0, PUBLIC_MODE) {
        failures.push(format!("public half: {err}"));
    }
    if let Err(err) = fs_guard::sync_dir(dir) {
        warn!("could not sync {}: {err}", dir.display());
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("; "))
    }
}

/// Overwrites `current` in place, then moves it aside. A missing file is
/// not an error.
fn archive_current(current: &Path, archived: &Path) -> io::Result<()> {
    match fs_guard::overwrite_with_random(current) {
        Ok(()) => fs::rename(current, archived),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn discard(paths: &[&Path]) {
    for path in paths {
        if let Err(err) = fs_guard::secure_remove(path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("could not erase {}: {err}", path.display());
            }
        }
    }
}

fn erase_dir(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            erase_dir(&path)?;
        } else if file_type.is_symlink() {
            fs::remove_file(&path)?;
        } else {
            fs_guard::secure_remove(&path)?;
        }
    }
    fs::remove_dir(dir)
}

/// Active variants and archived file count. A missing directory is empty.
fn scan_owner_dir(dir: &Path) -> io::Result<(Vec<AlgorithmVariant>, usize)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(err) => return Err(err),
    };

    let mut algorithms = Vec::new();
    let mut archived = 0;
    for entry in entries {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.ends_with(ARCHIVED_EXT) {
            archived += 1;
        } else if let Some(id) = name.strip_suffix(PUBLIC_SUFFIX) {
            if let Some(variant) = AlgorithmVariant::from_id(id) {
                algorithms.push(variant);
            }
        }
    }
    algorithms.sort();
    Ok((algorithms, archived))
}

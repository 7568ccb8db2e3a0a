//! Filesystem guards for key material.
//!
//! Every helper refuses to follow a symlink at the target path, so a
//! planted link cannot redirect a key read, a key write or a secure erase
//! to another file.
//!
//! NOTE: narrow TOCTOU window between `symlink_metadata()` and the open.
//! Closing it fully requires `O_NOFOLLOW` on the open itself. The check
//! still catches planted links in the key directory, which is `0o700`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;

/// Permission bits of an owner key directory.
pub const DIR_MODE: u32 = 0o700;
/// Permission bits of a public key file.
pub const PUBLIC_MODE: u32 = 0o644;
/// Permission bits of a private key file.
pub const PRIVATE_MODE: u32 = 0o600;

const ERASE_CHUNK: usize = 4096;

fn refuse_symlink(path: &Path) -> io::Result<Option<fs::Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to follow symlink: {}", path.display()),
        )),
        Ok(meta) => Ok(Some(meta)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Succeeds if `path` is absent or a regular file; fails on a symlink, a
/// directory or any other file type.
pub fn ensure_regular_or_absent(path: &Path) -> io::Result<()> {
    match refuse_symlink(path)? {
        Some(meta) if !meta.is_file() => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a regular file: {}", path.display()),
        )),
        _ => Ok(()),
    }
}

/// Reads a file after verifying it is not a symlink and is within `max_bytes`.
///
/// A missing file surfaces as `io::ErrorKind::NotFound`.
pub fn read_validated(path: &Path, max_bytes: u64) -> io::Result<Vec<u8>> {
    let Some(meta) = refuse_symlink(path)? else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ));
    };
    if meta.len() > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "file too large: {} ({} bytes, max {max_bytes} bytes)",
                path.display(),
                meta.len()
            ),
        ));
    }

    let mut buf = Vec::with_capacity(usize::try_from(meta.len()).unwrap_or(0));
    File::open(path)?
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut buf)?;
    if buf.len() as u64 > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("file grew past {max_bytes} bytes while reading: {}", path.display()),
        ));
    }
    Ok(buf)
}

/// Creates `path` (and parents) and restricts it to the owning user.
pub fn create_private_dir(path: &Path) -> io::Result<()> {
    if refuse_symlink(path)?.is_none() {
        fs::create_dir_all(path)?;
    }
    set_mode(path, DIR_MODE)
}

/// Writes `bytes` to `path` with permission bits `mode`, then fsyncs.
///
/// The mode is applied at creation and again afterwards, so neither the
/// umask nor a pre-existing file's looser bits survive.
pub fn write_with_mode(path: &Path, bytes: &[u8], mode: u32) -> io::Result<()> {
    refuse_symlink(path)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path)?;
    set_mode(path, mode)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Overwrites the current contents of `path` in place with random bytes
/// and fsyncs, so the original bytes are gone from that inode.
pub fn overwrite_with_random(path: &Path) -> io::Result<()> {
    let Some(meta) = refuse_symlink(path)? else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ));
    };

    let mut file = OpenOptions::new().write(true).open(path)?;
    let mut remaining = usize::try_from(meta.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "file too large to erase")
    })?;
    let mut chunk = [0u8; ERASE_CHUNK];
    while remaining > 0 {
        let n = remaining.min(ERASE_CHUNK);
        OsRng.fill_bytes(&mut chunk[..n]);
        file.write_all(&chunk[..n])?;
        remaining -= n;
    }
    file.sync_all()
}

/// Overwrites `path` with random bytes, then unlinks it.
pub fn secure_remove(path: &Path) -> io::Result<()> {
    overwrite_with_random(path)?;
    fs::remove_file(path)
}

/// Flushes directory entries (renames, unlinks) to disk where supported.
pub fn sync_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        File::open(path)?.sync_all()
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn read_validated_enforces_size_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k");
        fs::write(&path, [1u8; 64]).unwrap();
        assert_eq!(read_validated(&path, 64).unwrap().len(), 64);
        let err = read_validated(&path, 63).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_validated_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_validated(&dir.path().join("absent"), 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn regular_file_check() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("k");
        fs::write(&file, b"x").unwrap();
        assert!(ensure_regular_or_absent(&file).is_ok());
        assert!(ensure_regular_or_absent(&dir.path().join("absent")).is_ok());
        assert!(ensure_regular_or_absent(dir.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        fs::write(&target, b"secret").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(read_validated(&link, 100).is_err());
        assert!(write_with_mode(&link, b"x", PRIVATE_MODE).is_err());
        assert!(secure_remove(&link).is_err());
        assert!(ensure_regular_or_absent(&link).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"secret");
    }

    #[cfg(unix)]
    #[test]
    fn write_with_mode_sets_exact_bits() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("private.key");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).unwrap();

        write_with_mode(&path, b"new", PRIVATE_MODE).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn private_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        create_private_dir(&nested).unwrap();
        let mode = fs::metadata(&nested).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn overwrite_keeps_length_and_changes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k");
        let original = vec![0u8; 5000];
        fs::write(&path, &original).unwrap();
        overwrite_with_random(&path).unwrap();
        let after = fs::read(&path).unwrap();
        assert_eq!(after.len(), original.len());
        assert_ne!(after, original);
    }

    #[test]
    fn secure_remove_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k");
        fs::write(&path, b"secret").unwrap();
        secure_remove(&path).unwrap();
        assert!(!path.exists());
    }
}

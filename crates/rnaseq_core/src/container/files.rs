//! Host-side handling of extracted artifacts.

use std::fs;
use std::io;
use std::path::Path;

/// Give the owner read/write on every file and traverse on every
/// directory under `path` (inclusive).
pub fn normalize_permissions(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return Ok(());
    }

    set_owner_access(path, meta.is_dir())?;

    if meta.is_dir() {
        for entry in fs::read_dir(path)? {
            normalize_permissions(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_owner_access(path: &Path, is_dir: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let extra = if is_dir { 0o700 } else { 0o600 };
    perms.set_mode(perms.mode() | extra);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_owner_access(path: &Path, _is_dir: bool) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
}

/// Move `from` to `to`, replacing whatever is at `to`.
///
/// Falls back to copy + remove when rename fails (e.g. across devices).
pub fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    remove_existing(to)?;
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(
                "rename {} -> {} failed ({}), copying instead",
                from.display(),
                to.display(),
                e
            );
            copy_recursively(from, to)?;
            remove_existing(from)
        }
    }
}

fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn copy_recursively(from: &Path, to: &Path) -> io::Result<()> {
    if fs::metadata(from)?.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &to.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

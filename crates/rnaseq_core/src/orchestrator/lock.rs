//! Advisory lock on an output layout.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

/// Held for the duration of a run; removes its file on drop.
///
/// The lock file is created with `create_new`, so a second run on the same
/// layout fails instead of overwriting shared intermediates. A lock left by
/// a crashed run must be removed by hand; its contents name the owner.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    /// Take the lock. `ErrorKind::AlreadyExists` means another run holds it.
    pub fn acquire(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(
            file,
            "pid={} started={}",
            std::process::id(),
            Local::now().format("%Y-%m-%dT%H:%M:%S")
        )?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_until_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".S1.lock");

        let lock = OutputLock::acquire(&path).unwrap();
        let err = OutputLock::acquire(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        drop(lock);
        assert!(!path.exists());
        assert!(OutputLock::acquire(&path).is_ok());
    }

    #[test]
    fn lock_file_names_owner() {
        let dir = tempdir().unwrap();
        let lock = OutputLock::acquire(dir.path().join("nested").join(".S1.lock")).unwrap();
        let content = fs::read_to_string(lock.path()).unwrap();
        assert!(content.starts_with(&format!("pid={}", std::process::id())));
    }
}

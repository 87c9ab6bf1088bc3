//! Temporary file management module
//!
//! This module provides RAII-based staging files: a document is written to a
//! hidden sibling of its destination and renamed into place once complete.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Guard for a staging file that is removed on drop unless persisted
#[derive(Debug)]
pub(crate) enum TempGuard {
    /// Staging file that will be deleted when dropped
    File(PathBuf),
    /// The file was renamed into place; nothing left to clean up
    Persisted,
}

impl TempGuard {
    /// Get the path to the staging file, if it still exists
    #[cfg(test)]
    pub(crate) fn path(&self) -> Option<&Path> {
        match self {
            TempGuard::File(path) => Some(path),
            TempGuard::Persisted => None,
        }
    }

    /// Atomically moves the staging file to `target`, replacing it.
    ///
    /// On failure the staging file is removed.
    pub(crate) fn persist(mut self, target: &Path) -> io::Result<()> {
        if let TempGuard::File(path) = &mut self {
            let staged = std::mem::take(path);
            self = TempGuard::Persisted;
            if let Err(e) = fs::rename(&staged, target) {
                let _ = fs::remove_file(&staged);
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let TempGuard::File(path) = self {
            // Silently ignore errors during cleanup
            let _ = fs::remove_file(path);
        }
    }
}

/// Prefix of every staging file name
const STAGING_PREFIX: &str = ".showtree";

/// Creates a staging file next to `target` and returns it with its guard
///
/// The file lives in the same directory as `target` so the final rename never
/// crosses filesystems. Its name is hidden, unique through a ULID and of fixed
/// length, so any target name the filesystem accepts can be staged. The
/// directory is not created; a missing parent is reported as an error.
pub(crate) fn create_staging_file(target: &Path) -> io::Result<(TempGuard, File)> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let ulid = ulid::Ulid::new();
    let path = dir.join(format!("{}.{}.tmp", STAGING_PREFIX, ulid));

    let file = File::create_new(&path)?;

    Ok((TempGuard::File(path), file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_staging_file_is_hidden_sibling() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("seasons.json");

        let (guard, _file) = create_staging_file(&target).unwrap();
        let path = guard.path().unwrap().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.parent(), Some(temp.path()));
        let filename = path.file_name().unwrap().to_str().unwrap();
        assert!(filename.starts_with(".showtree."));
        assert!(filename.ends_with(".tmp"));
    }

    #[test]
    fn test_staging_name_length_is_independent_of_target() {
        let temp = tempfile::tempdir().unwrap();
        let short = create_staging_file(&temp.path().join("1.json")).unwrap().0;
        let long_target = temp.path().join(format!("{}.json", "a".repeat(225)));
        let long = create_staging_file(&long_target).unwrap().0;

        let len = |guard: &TempGuard| guard.path().unwrap().file_name().unwrap().len();
        assert_eq!(len(&short), len(&long));
    }

    #[test]
    fn test_persist_long_target_name() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join(format!("{}.json", "a".repeat(225)));

        let (guard, mut file) = create_staging_file(&target).unwrap();
        file.write_all(b"{}").unwrap();
        drop(file);
        guard.persist(&target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
    }

    #[test]
    fn test_failed_persist_removes_staging_file() {
        let temp = tempfile::tempdir().unwrap();
        let (guard, _file) = create_staging_file(&temp.path().join("a.json")).unwrap();
        let staged = guard.path().unwrap().to_path_buf();

        let result = guard.persist(&temp.path().join("missing").join("a.json"));
        assert!(result.is_err());
        assert!(!staged.exists());
    }

    #[test]
    fn test_cleanup_on_drop() {
        let temp = tempfile::tempdir().unwrap();
        let path = {
            let (guard, _file) = create_staging_file(&temp.path().join("a.json")).unwrap();
            guard.path().unwrap().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_persist_replaces_target() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("1.json");
        fs::write(&target, "old").unwrap();

        let (guard, mut file) = create_staging_file(&target).unwrap();
        let staged = guard.path().unwrap().to_path_buf();
        file.write_all(b"new").unwrap();
        drop(file);
        guard.persist(&target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert!(!staged.exists());
    }

    #[test]
    fn test_missing_parent_is_not_created() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("missing").join("episodes.json");

        assert!(create_staging_file(&target).is_err());
        assert!(!temp.path().join("missing").exists());
    }

    #[test]
    fn test_staging_files_unique() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("shows.json");
        let (first, _a) = create_staging_file(&target).unwrap();
        let (second, _b) = create_staging_file(&target).unwrap();

        assert_ne!(first.path(), second.path());
    }
}

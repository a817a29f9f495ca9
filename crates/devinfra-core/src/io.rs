use crate::error::{DevinfraError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A fully written and synced temp file waiting to replace `target`.
///
/// Dropping it without calling [`StagedWrite::commit`] deletes the temp file
/// and leaves `target` untouched.
#[derive(Debug)]
pub struct StagedWrite {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Rename the temp file over the target.
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.tmp.persist(&target).map_err(|e| DevinfraError::Persistence {
            path: target.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

/// Write `data` to a temp file next to `path` and fsync it. Nothing is
/// visible at `path` until the returned handle is committed.
pub fn stage_write(path: &Path, data: &[u8]) -> Result<StagedWrite> {
    let persistence = |source: std::io::Error| DevinfraError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(persistence)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(persistence)?;
    tmp.write_all(data).map_err(persistence)?;
    tmp.as_file().sync_all().map_err(persistence)?;
    Ok(StagedWrite {
        tmp,
        target: path.to_path_buf(),
    })
}

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting state files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    stage_write(path, data)?.commit()
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// True when `path` is a directory with at least one entry.
pub fn dir_has_entries(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.yaml");
        atomic_write(&path, b"hello: world").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello: world");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/test.yaml");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn abandoned_stage_leaves_target_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("projects.yaml");
        std::fs::write(&path, b"before").unwrap();

        let staged = stage_write(&path, b"after").unwrap();
        let tmp = staged.temp_path().to_path_buf();
        assert!(tmp.exists());
        assert_eq!(tmp.parent(), path.parent());
        assert_eq!(std::fs::read(&path).unwrap(), b"before");

        drop(staged);
        assert!(!tmp.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"before");
    }

    #[test]
    fn committed_stage_replaces_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("projects.yaml");
        std::fs::write(&path, b"before").unwrap();

        stage_write(&path, b"after").unwrap().commit().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"after");
        // Only the target remains in the directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.txt");
        std::fs::write(&path, b"original").unwrap();
        let written = write_if_missing(&path, b"new").unwrap();
        assert!(!written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        remove_file_if_exists(&dir.path().join("nope")).unwrap();
    }

    #[test]
    fn dir_has_entries_detects_content() {
        let dir = TempDir::new().unwrap();
        assert!(!dir_has_entries(dir.path()));
        assert!(!dir_has_entries(&dir.path().join("missing")));
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        assert!(dir_has_entries(dir.path()));
    }
}

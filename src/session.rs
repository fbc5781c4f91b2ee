use anyhow::{anyhow, Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Storage backend for the session token. A trait seam so tests can run
/// against a scratch directory instead of the real data dir.
pub trait TokenStorage {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// The one piece of durable client state: a single bearer token in a file
/// under the platform data directory. Survives restarts; removed on logout.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "jobsync")
            .ok_or_else(|| anyhow!("Could not determine a data directory"))?;
        Ok(Self::new(dirs.data_dir().join("token")))
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim().to_string();
                Ok(if token.is_empty() { None } else { Some(token) })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, token)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Session gate: presence check only, no validation or expiry handling.
/// Every protected command calls this before touching the network.
pub fn require_token(storage: &dyn TokenStorage) -> Result<String> {
    storage
        .load()?
        .ok_or_else(|| anyhow!("Not logged in. Run 'jobsync login' first."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch_storage() -> (TempDir, FileTokenStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("token"));
        (dir, storage)
    }

    #[test]
    fn test_load_missing_token() {
        let (_dir, storage) = scratch_storage();
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (_dir, storage) = scratch_storage();
        storage.save("eyJhbGciOiJIUzI1NiJ9.abc.def").unwrap();
        assert_eq!(
            storage.load().unwrap().as_deref(),
            Some("eyJhbGciOiJIUzI1NiJ9.abc.def")
        );
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("nested/deeper/token"));
        storage.save("tok").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn test_logout_clears_token_and_gate_fails() {
        let (_dir, storage) = scratch_storage();
        storage.save("tok").unwrap();
        assert_eq!(require_token(&storage).unwrap(), "tok");

        storage.clear().unwrap();
        let err = require_token(&storage).unwrap_err();
        assert_eq!(err.to_string(), "Not logged in. Run 'jobsync login' first.");

        // Clearing an already-absent token is not an error
        storage.clear().unwrap();
    }

    #[test]
    fn test_blank_token_file_counts_as_absent() {
        let (_dir, storage) = scratch_storage();
        storage.save("  \n").unwrap();
        assert_eq!(storage.load().unwrap(), None);
        assert!(require_token(&storage).is_err());
    }
}

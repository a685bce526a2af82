//! JSON file key-value store.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tracing::{debug, instrument};

use courier_core::error::{Error, StorageError};
use courier_core::{Result, SecureStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

type Entries = BTreeMap<String, String>;

fn map_io(err: std::io::Error) -> Error {
    Error::Storage(StorageError::from(err))
}

/// [`SecureStore`] persisted as a single JSON object file.
///
/// Writes take an exclusive lock on a sibling `.lock` file, go to a
/// temporary file and are renamed into place, so readers never observe a
/// partial write. On Unix the file is readable by its owner only.
///
/// Credentials are stored in plain text; protecting the file is left to the
/// platform.
#[derive(Debug, Clone)]
pub struct FileVault {
    path: PathBuf,
}

impl FileVault {
    /// Create a vault at `path`. Nothing touches the disk until first use.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read_entries(path: &Path) -> Result<Entries> {
        if !path.exists() {
            return Ok(Entries::new());
        }

        let content = fs::read_to_string(path).map_err(map_io)?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            Error::Storage(StorageError::Corrupt {
                message: format!("{}: {}", path.display(), e),
            })
        })
    }

    fn write_entries(path: &Path, entries: &Entries) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content).map_err(map_io)?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&temp_path).map_err(map_io)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms).map_err(map_io)?;
        }

        fs::rename(&temp_path, path).map_err(map_io)
    }

    /// Apply `change` to the stored entries under the vault lock.
    fn update(&self, change: impl FnOnce(&mut Entries) -> bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(map_io)?;
        lock_file.lock_exclusive().map_err(map_io)?;

        let mut entries = Self::read_entries(&self.path)?;
        let result = if change(&mut entries) {
            Self::write_entries(&self.path, &entries)
        } else {
            Ok(())
        };

        lock_file.unlock().map_err(map_io)?;
        result
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(FileVault) -> Result<T> + Send + 'static,
    {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || f(vault))
            .await
            .map_err(|e| {
                Error::Storage(StorageError::Io {
                    message: format!("vault task failed: {}", e),
                })
            })?
    }
}

#[async_trait]
impl SecureStore for FileVault {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.blocking(move |vault| Ok(Self::read_entries(&vault.path)?.remove(&key)))
            .await
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.blocking(move |vault| {
            vault.update(|entries| {
                entries.insert(key, value);
                true
            })
        })
        .await?;
        debug!("Vault entry written");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |vault| vault.update(|entries| entries.remove(&key).is_some()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let vault = FileVault::new(dir.path().join("session.json"));

        assert_eq!(vault.get("anything").await.unwrap(), None);
        vault.remove("anything").await.unwrap();
        assert!(!vault.path().exists());
    }

    #[tokio::test]
    async fn set_get_and_remove() {
        let dir = TempDir::new().unwrap();
        let vault = FileVault::new(dir.path().join("nested").join("session.json"));

        vault.set("courier.access_token", "T1").await.unwrap();
        vault.set("courier.refresh_token", "R1").await.unwrap();
        vault.set("courier.access_token", "T2").await.unwrap();

        assert_eq!(
            vault.get("courier.access_token").await.unwrap().as_deref(),
            Some("T2")
        );

        vault.remove("courier.access_token").await.unwrap();
        assert_eq!(vault.get("courier.access_token").await.unwrap(), None);
        assert_eq!(
            vault.get("courier.refresh_token").await.unwrap().as_deref(),
            Some("R1")
        );
    }

    #[tokio::test]
    async fn values_survive_a_new_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        FileVault::new(&path).set("k", "v").await.unwrap();

        assert_eq!(FileVault::new(&path).get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let err = FileVault::new(&path).get("k").await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn vault_file_is_owner_only() {
        let dir = TempDir::new().unwrap();
        let vault = FileVault::new(dir.path().join("session.json"));

        vault.set("k", "v").await.unwrap();

        let mode = fs::metadata(vault.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

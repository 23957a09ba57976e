// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! File-per-account key storage

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{AccountRecord, AccountStore};
use crate::errors::StoreError;
use crate::types::AccountId;

/// Stores each account as `<dir>/<account_id>.json`.
///
/// The directory is created on first save. Writes go to a temporary file
/// that is renamed into place, so a crash never leaves a truncated record.
/// On Unix, record files are created readable by the owner only.
///
/// Account ids are validated to `[a-z0-9._-]`, so they cannot escape the
/// directory.
#[derive(Debug, Clone)]
pub struct DiskAccountStore {
    dir: PathBuf,
}

impl DiskAccountStore {
    /// Creates a store rooted at `dir`. No I/O happens until first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the record file for `account_id`.
    pub fn record_path(&self, account_id: &AccountId) -> PathBuf {
        self.dir.join(format!("{account_id}.json"))
    }
}

#[async_trait]
impl AccountStore for DiskAccountStore {
    async fn load(&self, account_id: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        let path = self.record_path(account_id);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(account_id = %account_id, path = %path.display(), "No stored account record");
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let record: AccountRecord =
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;

        debug!(account_id = %account_id, "Loaded account record from disk");
        Ok(Some(record))
    }

    async fn save(&self, record: &AccountRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let json =
            serde_json::to_vec_pretty(record).map_err(|source| StoreError::Encode {
                account_id: record.account_id.to_string(),
                source,
            })?;

        let path = self.record_path(&record.account_id);
        let tmp = path.with_extension("json.tmp");

        match tokio::fs::remove_file(&tmp).await {
            Ok(()) => debug!(path = %tmp.display(), "Removed stale temporary record"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&tmp, e)),
        }

        if let Err(e) = write_private(&tmp, &json).await {
            discard(&tmp).await;
            return Err(StoreError::io(&tmp, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            discard(&tmp).await;
            return Err(StoreError::io(&path, e));
        }

        info!(account_id = %record.account_id, path = %path.display(), "Saved account record");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

/// Writes `bytes` to a new file at `path` that only the owner can read.
///
/// The file must not exist yet. On Unix it is created with mode 0600.
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn discard(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %tmp.display(), error = %e, "Failed to remove temporary record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn account(id: &str) -> AccountId {
        id.parse().unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = DiskAccountStore::new(dir.path());

        let loaded = store.load(&account("nobody.testnet")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = DiskAccountStore::new(dir.path().join("nested"));
        let record = AccountRecord::generate(account("alice.testnet"));

        store.save(&record).await.unwrap();
        let loaded = store.load(&record.account_id).await.unwrap();

        assert_eq!(loaded, Some(record.clone()));
        assert!(store.record_path(&record.account_id).exists());
        assert!(!store
            .record_path(&record.account_id)
            .with_extension("json.tmp")
            .exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = DiskAccountStore::new(dir.path());
        let first = AccountRecord::generate(account("alice.testnet"));
        let second = AccountRecord::generate(account("alice.testnet"));

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let loaded = store.load(&first.account_id).await.unwrap().unwrap();
        assert_eq!(loaded.public_key, second.public_key);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = DiskAccountStore::new(dir.path());
        let id = account("broken.testnet");
        std::fs::write(store.record_path(&id), "{not json").unwrap();

        let err = store.load(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_reads_legacy_record_format() {
        let dir = TempDir::new().unwrap();
        let store = DiskAccountStore::new(dir.path());
        let record = AccountRecord::generate(account("legacy.testnet"));
        let legacy = format!(
            r#"{{"account_id":"legacy.testnet","public_key":"{}","private_key":"{}"}}"#,
            record.public_key, record.private_key
        );
        std::fs::write(store.record_path(&record.account_id), legacy).unwrap();

        let loaded = store.load(&record.account_id).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = DiskAccountStore::new(dir.path());
        let record = AccountRecord::generate(account("alice.testnet"));
        let path = store.record_path(&record.account_id);

        // A leftover temp file from an interrupted save, readable by all
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, "partial").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&record).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());
        assert_eq!(store.load(&record.account_id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = DiskAccountStore::new(dir.path());
        let record = AccountRecord::generate(account("blocked.testnet"));
        let path = store.record_path(&record.account_id);

        // A non-empty directory where the record should go makes the rename fail
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = store.save(&record).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Io { path: ref failed, .. } if failed == &path
        ));
        assert!(!path.with_extension("json.tmp").exists());
    }
}

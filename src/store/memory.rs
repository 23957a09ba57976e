//! In-memory account storage

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AccountRecord, AccountStore};
use crate::errors::StoreError;
use crate::types::AccountId;

/// Process-local account store. Records are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    records: RwLock<HashMap<AccountId, AccountRecord>>,
}

impl MemoryAccountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = AccountRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.account_id.clone(), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn load(&self, account_id: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.records.read().await.get(account_id).cloned())
    }

    async fn save(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.account_id.clone(), record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryAccountStore::new();
        let record = AccountRecord::generate("bob.testnet".parse().unwrap());

        assert!(store.is_empty().await);
        assert!(store.load(&record.account_id).await.unwrap().is_none());

        store.save(&record).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.load(&record.account_id).await.unwrap(), Some(record));
    }
}

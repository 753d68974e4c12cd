//! Ledger Entry Factory
//!
//! Builds and persists chained, signed entries for domain events. The
//! read-count-then-insert sequence runs under a single-writer lock so
//! concurrent appends cannot compute the same index; the INTEGER PRIMARY
//! KEY on the index column is the storage-level backstop.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::crypto::SignatureService;
use crate::database::Database;
use crate::error::LedgerError;
use crate::ledger::entry::{LedgerEntry, GENESIS};

pub struct LedgerEntryFactory {
    database: Database,
    signer: Arc<SignatureService>,
    append_lock: Mutex<()>,
}

impl LedgerEntryFactory {
    pub fn new(database: Database, signer: Arc<SignatureService>) -> Self {
        Self {
            database,
            signer,
            append_lock: Mutex::new(()),
        }
    }

    /// Record one domain event as the next entry of the chain.
    ///
    /// Links to the current head entry (or `GENESIS` for an empty ledger),
    /// hashes and signs the content, and persists in a single insert: an
    /// entry is either fully written or not written at all. A storage
    /// failure means the event was not recorded; retry is the caller's
    /// decision.
    pub async fn append(
        &self,
        event_type: &str,
        event_id: &str,
        collection_name: &str,
        payload: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        let _guard = self.append_lock.lock().await;

        let previous_hash = match self.database.head_entry().await? {
            Some(head) => head.hash,
            None => GENESIS.to_string(),
        };
        let index = self.database.count_entries().await? + 1;

        let entry = LedgerEntry::new(
            index,
            event_type,
            event_id,
            collection_name,
            payload,
            user_id,
            previous_hash,
            &self.signer,
        )?;

        self.database.insert_entry(&entry).await?;
        debug!("appended ledger entry {}", entry.summary());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn factory() -> LedgerEntryFactory {
        let database = Database::new_in_memory().await.unwrap();
        let signer = Arc::new(SignatureService::new("factory-test-secret"));
        LedgerEntryFactory::new(database, signer)
    }

    #[tokio::test]
    async fn first_entry_links_to_genesis() {
        let factory = factory().await;
        let entry = factory
            .append("stock_movement", "mov-1", "stock_movements", json!({}), None)
            .await
            .unwrap();

        assert_eq!(entry.index, 1);
        assert_eq!(entry.previous_hash, GENESIS);
        assert!(entry.is_verified);
    }

    #[tokio::test]
    async fn entries_chain_in_order() {
        let factory = factory().await;
        let mut previous: Option<LedgerEntry> = None;

        for i in 1..=5 {
            let entry = factory
                .append(
                    "stock_movement",
                    &format!("mov-{}", i),
                    "stock_movements",
                    json!({ "sequence": i }),
                    Some("user-1"),
                )
                .await
                .unwrap();

            assert_eq!(entry.index, i);
            match &previous {
                Some(prev) => assert_eq!(entry.previous_hash, prev.hash),
                None => assert_eq!(entry.previous_hash, GENESIS),
            }
            previous = Some(entry);
        }
    }

    #[tokio::test]
    async fn concurrent_appends_assign_unique_indices() {
        let factory = Arc::new(factory().await);

        let mut handles = Vec::new();
        for i in 0..10 {
            let factory = Arc::clone(&factory);
            handles.push(tokio::spawn(async move {
                factory
                    .append(
                        "approval",
                        &format!("apr-{}", i),
                        "approvals",
                        json!({ "task": i }),
                        None,
                    )
                    .await
            }));
        }

        let mut indices = Vec::new();
        for handle in handles {
            indices.push(handle.await.unwrap().unwrap().index);
        }
        indices.sort_unstable();
        assert_eq!(indices, (1..=10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_storage_error() {
        let factory = factory().await;
        factory.database.pool().close().await;

        let result = factory
            .append("approval", "apr-1", "approvals", json!({}), None)
            .await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));
    }
}

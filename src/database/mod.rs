//! Ledger Persistence
//!
//! SQLite-backed append-only store for ledger entries. Entries are
//! immutable once written; `is_verified` is the only column ever updated.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::LedgerError;
use crate::ledger::LedgerEntry;

/// Aggregate counters over the ledger, for the status surface and ops CLI.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerStats {
    pub total_entries: i64,
    pub verified_entries: i64,
    pub flagged_entries: i64,
    pub head_hash: Option<String>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the ledger database, creating the file if missing.
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Database { pool })
    }

    /// In-memory database for tests. Capped to a single pooled connection
    /// so every query sees the same in-memory store.
    pub async fn new_in_memory() -> Result<Self, LedgerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(include_str!("../../migrations/001_create_ledger.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn count_entries(&self) -> Result<i64, LedgerError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The entry with the highest index, or `None` when the ledger is empty.
    pub async fn head_entry(&self) -> Result<Option<LedgerEntry>, LedgerError> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            "SELECT idx, timestamp, event_type, event_id, collection_name, payload,
                    user_id, previous_hash, hash, hmac_signature, is_verified
             FROM ledger_entries ORDER BY idx DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    pub async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO ledger_entries (idx, timestamp, event_type, event_id, collection_name,
                                         payload, user_id, previous_hash, hash, hmac_signature,
                                         is_verified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(entry.index)
        .bind(entry.timestamp)
        .bind(&entry.event_type)
        .bind(&entry.event_id)
        .bind(&entry.collection_name)
        .bind(&entry.payload)
        .bind(&entry.user_id)
        .bind(&entry.previous_hash)
        .bind(&entry.hash)
        .bind(&entry.hmac_signature)
        .bind(entry.is_verified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All entries ordered by ascending index (full chain walk order).
    pub async fn all_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT idx, timestamp, event_type, event_id, collection_name, payload,
                    user_id, previous_hash, hash, hmac_signature, is_verified
             FROM ledger_entries ORDER BY idx ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Most recent entries first, capped at `limit`.
    pub async fn recent_entries(&self, limit: i64) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT idx, timestamp, event_type, event_id, collection_name, payload,
                    user_id, previous_hash, hash, hmac_signature, is_verified
             FROM ledger_entries ORDER BY idx DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn entry_by_index(&self, index: i64) -> Result<Option<LedgerEntry>, LedgerError> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            "SELECT idx, timestamp, event_type, event_id, collection_name, payload,
                    user_id, previous_hash, hash, hmac_signature, is_verified
             FROM ledger_entries WHERE idx = ?1",
        )
        .bind(index)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    /// Flip `is_verified` to false for one entry. Idempotent.
    pub async fn mark_unverified(&self, index: i64) -> Result<(), LedgerError> {
        sqlx::query("UPDATE ledger_entries SET is_verified = 0 WHERE idx = ?1")
            .bind(index)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Audit trail for a single domain event.
    pub async fn entries_by_event(&self, event_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.entries_where("event_id", event_id).await
    }

    pub async fn entries_by_type(&self, event_type: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.entries_where("event_type", event_type).await
    }

    pub async fn entries_by_collection(
        &self,
        collection_name: &str,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.entries_where("collection_name", collection_name).await
    }

    pub async fn entries_by_user(&self, user_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.entries_where("user_id", user_id).await
    }

    async fn entries_where(&self, column: &str, value: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        // `column` is always one of the fixed names above, never caller input.
        let sql = format!(
            "SELECT idx, timestamp, event_type, event_id, collection_name, payload,
                    user_id, previous_hash, hash, hmac_signature, is_verified
             FROM ledger_entries WHERE {} = ?1 ORDER BY idx ASC",
            column
        );
        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    pub async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let total_entries = self.count_entries().await?;
        let verified_entries: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE is_verified = 1")
                .fetch_one(&self.pool)
                .await?;
        let head = self.head_entry().await?;

        Ok(LedgerStats {
            total_entries,
            verified_entries,
            flagged_entries: total_entries - verified_entries,
            head_hash: head.as_ref().map(|e| e.hash.clone()),
            last_timestamp: head.map(|e| e.timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SignatureService;
    use crate::ledger::GENESIS;
    use serde_json::json;

    fn sample_entry(index: i64, previous_hash: &str) -> LedgerEntry {
        let signer = SignatureService::new("db-test-secret");
        LedgerEntry::new(
            index,
            "stock_movement",
            &format!("mov-{}", index),
            "stock_movements",
            json!({"quantity": index}),
            Some("user-1"),
            previous_hash.to_string(),
            &signer,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let db = Database::new_in_memory().await.unwrap();
        let entry = sample_entry(1, GENESIS);
        db.insert_entry(&entry).await.unwrap();

        let stored = db.entry_by_index(1).await.unwrap().unwrap();
        assert_eq!(stored, entry);
        assert_eq!(db.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn head_entry_is_highest_index() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(db.head_entry().await.unwrap().is_none());

        let first = sample_entry(1, GENESIS);
        db.insert_entry(&first).await.unwrap();
        let second = sample_entry(2, &first.hash);
        db.insert_entry(&second).await.unwrap();

        let head = db.head_entry().await.unwrap().unwrap();
        assert_eq!(head.index, 2);
    }

    #[tokio::test]
    async fn duplicate_index_is_rejected() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_entry(&sample_entry(1, GENESIS)).await.unwrap();

        let result = db.insert_entry(&sample_entry(1, GENESIS)).await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));
    }

    #[tokio::test]
    async fn mark_unverified_flips_flag_only() {
        let db = Database::new_in_memory().await.unwrap();
        let entry = sample_entry(1, GENESIS);
        db.insert_entry(&entry).await.unwrap();

        db.mark_unverified(1).await.unwrap();
        db.mark_unverified(1).await.unwrap(); // idempotent

        let stored = db.entry_by_index(1).await.unwrap().unwrap();
        assert!(!stored.is_verified);
        assert_eq!(stored.hash, entry.hash);
        assert_eq!(stored.payload, entry.payload);
    }

    #[tokio::test]
    async fn query_surface_filters() {
        let db = Database::new_in_memory().await.unwrap();
        let first = sample_entry(1, GENESIS);
        db.insert_entry(&first).await.unwrap();
        db.insert_entry(&sample_entry(2, &first.hash)).await.unwrap();

        assert_eq!(db.entries_by_event("mov-1").await.unwrap().len(), 1);
        assert_eq!(
            db.entries_by_type("stock_movement").await.unwrap().len(),
            2
        );
        assert_eq!(
            db.entries_by_collection("stock_movements")
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(db.entries_by_user("user-1").await.unwrap().len(), 2);
        assert!(db.entries_by_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_reflect_flags() {
        let db = Database::new_in_memory().await.unwrap();
        let first = sample_entry(1, GENESIS);
        db.insert_entry(&first).await.unwrap();
        db.insert_entry(&sample_entry(2, &first.hash)).await.unwrap();
        db.mark_unverified(2).await.unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.verified_entries, 1);
        assert_eq!(stats.flagged_entries, 1);
        assert!(stats.head_hash.is_some());
        assert!(stats.last_timestamp.is_some());
    }
}

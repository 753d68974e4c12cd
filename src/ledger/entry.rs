//! Ledger Entry
//!
//! The unit of the audit chain: one immutable, signed record of an
//! inventory event, linked to its predecessor by hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::SignatureService;
use crate::error::LedgerError;

/// Sentinel `previous_hash` value used only by the first entry.
pub const GENESIS: &str = "GENESIS";

/// One immutable, chained, signed record of a domain event.
///
/// Content fields are set exactly once at creation and never recomputed
/// or mutated afterwards. `is_verified` is the only mutable field; the
/// chain verifier flips it to false when an entry fails a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    #[sqlx(rename = "idx")]
    pub index: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub event_id: String,
    pub collection_name: String,
    pub payload: serde_json::Value,
    pub user_id: Option<String>,
    pub previous_hash: String,
    pub hash: String,
    pub hmac_signature: String,
    pub is_verified: bool,
}

impl LedgerEntry {
    /// Build a new signed entry for a domain event.
    ///
    /// Computes the content digest over the canonical serialization, then
    /// signs the digest with the process-wide key.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: i64,
        event_type: &str,
        event_id: &str,
        collection_name: &str,
        payload: serde_json::Value,
        user_id: Option<&str>,
        previous_hash: String,
        signer: &SignatureService,
    ) -> Result<Self, LedgerError> {
        let mut entry = Self {
            index,
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            event_id: event_id.to_string(),
            collection_name: collection_name.to_string(),
            payload,
            user_id: user_id.map(str::to_string),
            previous_hash,
            hash: String::new(), // computed below
            hmac_signature: String::new(),
            is_verified: true,
        };

        entry.hash = entry.compute_hash()?;
        entry.hmac_signature = signer.sign(&entry.hash);
        Ok(entry)
    }

    /// Canonical serialization of the content fields.
    ///
    /// Field order is fixed and the payload is rendered as compact JSON
    /// with object keys in sorted order (serde_json's default map), so
    /// hashing identical content always reproduces the same digest.
    /// `user_id` is not part of the digest input.
    pub fn canonical_content(&self) -> Result<String, LedgerError> {
        let payload_json = serde_json::to_string(&self.payload)?;
        Ok(format!(
            "index:{}|timestamp:{}|event_type:{}|event_id:{}|collection:{}|payload:{}|previous_hash:{}",
            self.index,
            self.timestamp.to_rfc3339(),
            self.event_type,
            self.event_id,
            self.collection_name,
            payload_json,
            self.previous_hash,
        ))
    }

    /// SHA-256 digest of the canonical serialization, hex-encoded.
    pub fn compute_hash(&self) -> Result<String, LedgerError> {
        let canonical = self.canonical_content()?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Short human-readable description for logs.
    pub fn summary(&self) -> String {
        format!(
            "#{} {} ({}/{})",
            self.index, self.event_type, self.collection_name, self.event_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signer() -> SignatureService {
        SignatureService::new("entry-test-secret")
    }

    #[test]
    fn new_entry_computes_hash_and_signature() {
        let entry = LedgerEntry::new(
            1,
            "stock_movement",
            "mov-42",
            "stock_movements",
            json!({"item": "widget", "quantity": 5}),
            Some("user-7"),
            GENESIS.to_string(),
            &signer(),
        )
        .unwrap();

        assert_eq!(entry.index, 1);
        assert_eq!(entry.previous_hash, GENESIS);
        assert_eq!(entry.hash.len(), 64);
        assert_eq!(entry.hash, entry.compute_hash().unwrap());
        assert!(signer().verify(&entry.hash, &entry.hmac_signature));
        assert!(entry.is_verified);
    }

    #[test]
    fn canonical_content_is_stable() {
        let entry = LedgerEntry::new(
            3,
            "dead_stock_report",
            "rep-9",
            "reports",
            json!({"items": 12}),
            None,
            "aabbcc".to_string(),
            &signer(),
        )
        .unwrap();

        assert_eq!(
            entry.canonical_content().unwrap(),
            entry.canonical_content().unwrap()
        );
        assert!(entry.canonical_content().unwrap().starts_with("index:3|"));
    }

    #[test]
    fn payload_key_order_does_not_affect_hash() {
        // serde_json's default map sorts keys, so two payloads built in
        // different insertion orders serialize identically.
        let a: serde_json::Value =
            serde_json::from_str(r#"{"quantity": 5, "item": "widget"}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"item": "widget", "quantity": 5}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn hash_differs_when_content_differs() {
        let signer = signer();
        let a = LedgerEntry::new(
            1,
            "approval",
            "apr-1",
            "approvals",
            json!({}),
            None,
            GENESIS.to_string(),
            &signer,
        )
        .unwrap();
        let b = LedgerEntry::new(
            1,
            "approval",
            "apr-2",
            "approvals",
            json!({}),
            None,
            GENESIS.to_string(),
            &signer,
        )
        .unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn user_id_is_not_part_of_digest_input() {
        let entry = LedgerEntry::new(
            1,
            "approval",
            "apr-1",
            "approvals",
            json!({}),
            Some("user-1"),
            GENESIS.to_string(),
            &signer(),
        )
        .unwrap();
        assert!(!entry.canonical_content().unwrap().contains("user-1"));
    }
}

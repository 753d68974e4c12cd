//! Chain Verification
//!
//! Walks the full ordered ledger, validating each entry's signature and
//! its linkage to the predecessor. Mismatches are data findings recorded
//! in the report and persisted as `is_verified = false`; the run itself
//! only fails on storage errors.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::crypto::SignatureService;
use crate::database::Database;
use crate::error::LedgerError;

/// Finding reason for an entry whose HMAC no longer authenticates its hash.
pub const REASON_INVALID_SIGNATURE: &str = "Invalid HMAC signature";

/// Finding reason for an entry whose `previous_hash` does not match the
/// stored hash of its predecessor.
pub const REASON_CHAIN_BROKEN: &str = "Previous hash mismatch — chain broken";

/// One integrity violation found during a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TamperRecord {
    pub index: i64,
    pub reason: String,
}

/// Outcome of one full pass over the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Correlates this run across logs and alerts.
    pub run_id: Uuid,
    pub is_valid: bool,
    pub total_entries: usize,
    pub tampered_entries: Vec<TamperRecord>,
}

#[derive(Clone)]
pub struct ChainVerifier {
    database: Database,
    signer: Arc<SignatureService>,
}

impl ChainVerifier {
    pub fn new(database: Database, signer: Arc<SignatureService>) -> Self {
        Self { database, signer }
    }

    /// Re-verify the entire chain in ascending index order.
    ///
    /// Per entry: the HMAC must authenticate the stored `hash`, and (for
    /// every entry but the first) `previous_hash` must equal the stored
    /// hash of the preceding entry. Content digests are not recomputed;
    /// the signature over the stored hash is the tamper barrier. Every
    /// flagged entry has `is_verified = false` persisted, whether or not
    /// the report is later alerted on. An empty ledger is trivially valid.
    pub async fn verify(&self) -> Result<VerificationReport, LedgerError> {
        let run_id = Uuid::new_v4();
        let entries = self.database.all_entries().await?;
        let total_entries = entries.len();

        let mut tampered_entries = Vec::new();
        let mut predecessor_hash: Option<&str> = None;

        for entry in &entries {
            let mut flagged = false;

            if !self.signer.verify(&entry.hash, &entry.hmac_signature) {
                tampered_entries.push(TamperRecord {
                    index: entry.index,
                    reason: REASON_INVALID_SIGNATURE.to_string(),
                });
                flagged = true;
            }

            if let Some(expected) = predecessor_hash {
                if entry.previous_hash != expected {
                    tampered_entries.push(TamperRecord {
                        index: entry.index,
                        reason: REASON_CHAIN_BROKEN.to_string(),
                    });
                    flagged = true;
                }
            }

            if flagged {
                self.database.mark_unverified(entry.index).await?;
            }
            predecessor_hash = Some(&entry.hash);
        }

        let is_valid = tampered_entries.is_empty();
        if is_valid {
            info!(%run_id, total_entries, "ledger verification passed");
        } else {
            warn!(
                %run_id,
                total_entries,
                findings = tampered_entries.len(),
                "ledger verification found tampered entries"
            );
        }

        Ok(VerificationReport {
            run_id,
            is_valid,
            total_entries,
            tampered_entries,
        })
    }
}

//! Audit Ledger Core
//!
//! Tamper-evident recording of inventory events: hash-chained, signed
//! entries in an append-only store, with full-chain verification.

pub mod entry;
pub mod factory;
pub mod verifier;

pub use entry::{LedgerEntry, GENESIS};
pub use factory::LedgerEntryFactory;
pub use verifier::{ChainVerifier, TamperRecord, VerificationReport};

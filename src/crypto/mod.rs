//! Ledger Cryptography
//!
//! Keyed authentication of ledger entry hashes. The signing key is
//! process-wide immutable state established at startup.

pub mod signer;

pub use signer::SignatureService;

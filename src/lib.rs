pub mod alert;
pub mod api;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod ledger;
pub mod scheduler;

pub use error::LedgerError;

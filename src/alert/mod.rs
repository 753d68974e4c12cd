//! Tamper Alerting
//!
//! Best-effort operator notification when a verification run finds
//! tampered entries. Delivery failures never affect the verification
//! result already computed.

pub mod dispatcher;
pub mod mailer;
pub mod notifier;

pub use dispatcher::AlertDispatcher;
pub use mailer::HttpMailer;
pub use notifier::{AlertError, Notifier};

//! Alert Dispatcher
//!
//! Turns a failed verification report into a human-readable summary and
//! hands it to the configured notification channel. Alerting is
//! best-effort: a missing channel is a silent no-op and delivery errors
//! are logged and swallowed.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::alert::notifier::Notifier;
use crate::ledger::VerificationReport;

#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Option<Arc<dyn Notifier>>,
}

impl AlertDispatcher {
    pub fn new(notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self { notifier }
    }

    /// Dispatcher without a channel; `dispatch` becomes a no-op.
    pub fn disabled() -> Self {
        Self { notifier: None }
    }

    pub fn is_configured(&self) -> bool {
        self.notifier.is_some()
    }

    /// Notify the operator channel about a tampered ledger.
    ///
    /// Never fails the caller: the verification result stands regardless
    /// of what happens to the alert.
    pub async fn dispatch(&self, report: &VerificationReport) {
        let Some(notifier) = &self.notifier else {
            debug!("no alert channel configured, skipping tamper alert");
            return;
        };

        let subject = format!(
            "Ledger tamper alert: {} finding(s)",
            report.tampered_entries.len()
        );
        let body = compose_summary(report);

        match notifier.notify(&subject, &body).await {
            Ok(()) => info!(
                run_id = %report.run_id,
                channel = notifier.name(),
                "tamper alert delivered"
            ),
            Err(e) => error!(
                run_id = %report.run_id,
                channel = notifier.name(),
                "tamper alert delivery failed: {}",
                e
            ),
        }
    }
}

/// One line per tamper record, preceded by the run context.
fn compose_summary(report: &VerificationReport) -> String {
    let mut body = format!(
        "Tampering detected in the inventory audit ledger.\n\n\
         Verification run: {}\n\
         Entries checked: {}\n\
         Findings:\n",
        report.run_id, report.total_entries
    );
    for record in &report.tampered_entries {
        body.push_str(&format!("  entry {}: {}\n", record.index, record.reason));
    }
    body
}

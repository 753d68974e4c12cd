//! Verification Scheduler
//!
//! Owns the lifecycle of periodic and startup verification runs. One
//! periodic task re-verifies the chain every interval; a one-shot task
//! runs shortly after activation to catch tampering that happened while
//! the process was down. Runs are not mutually excluded: a slow run can
//! overlap the next tick. The only write either run performs is the
//! idempotent `is_verified` flip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::alert::AlertDispatcher;
use crate::ledger::ChainVerifier;

const DEFAULT_PERIOD: Duration = Duration::from_secs(3600);
const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(5);

pub struct VerificationScheduler {
    verifier: ChainVerifier,
    dispatcher: AlertDispatcher,
    active: AtomicBool,
    period: Duration,
    startup_delay: Duration,
}

impl VerificationScheduler {
    /// Scheduler with production timing: hourly runs plus a one-shot run
    /// five seconds after activation.
    pub fn new(verifier: ChainVerifier, dispatcher: AlertDispatcher) -> Self {
        Self::with_schedule(verifier, dispatcher, DEFAULT_PERIOD, DEFAULT_STARTUP_DELAY)
    }

    pub fn with_schedule(
        verifier: ChainVerifier,
        dispatcher: AlertDispatcher,
        period: Duration,
        startup_delay: Duration,
    ) -> Self {
        Self {
            verifier,
            dispatcher,
            active: AtomicBool::new(false),
            period,
            startup_delay,
        }
    }

    /// Activate scheduled verification. Idempotent: a second call while
    /// already active is a logged no-op and returns false.
    pub fn start(&self) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("scheduled verification already active, ignoring start");
            return false;
        }

        let verifier = self.verifier.clone();
        let dispatcher = self.dispatcher.clone();
        let delay = self.startup_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run_verification(&verifier, &dispatcher, "startup").await;
        });

        let verifier = self.verifier.clone();
        let dispatcher = self.dispatcher.clone();
        let period = self.period;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; the startup task
            // already covers that window.
            interval.tick().await;
            loop {
                interval.tick().await;
                run_verification(&verifier, &dispatcher, "periodic").await;
            }
        });

        info!(
            period_secs = self.period.as_secs(),
            startup_delay_secs = self.startup_delay.as_secs(),
            "scheduled verification activated"
        );
        true
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// One scheduled run. Errors are logged and dropped here so a failed run
/// never tears down the schedule; the next tick proceeds.
async fn run_verification(verifier: &ChainVerifier, dispatcher: &AlertDispatcher, trigger: &str) {
    match verifier.verify().await {
        Ok(report) if report.is_valid => {
            info!(
                trigger,
                total_entries = report.total_entries,
                "scheduled verification passed"
            );
        }
        Ok(report) => {
            warn!(
                trigger,
                findings = report.tampered_entries.len(),
                "scheduled verification detected tampering, dispatching alert"
            );
            dispatcher.dispatch(&report).await;
        }
        Err(e) => {
            error!(trigger, "scheduled verification run failed: {}", e);
        }
    }
}

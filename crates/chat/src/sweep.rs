use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use kiosk_core::session::SessionStore;

use crate::messages;
use crate::notify::Notifier;
use crate::orchestrator::CustomerLocks;

/// Background reaper for abandoned negotiations. Customers whose pending
/// order sat past the timeout get a note and a clean slate.
pub struct NegotiationSweeper {
    sessions: Arc<dyn SessionStore>,
    notifier: Notifier,
    locks: Arc<CustomerLocks>,
    timeout: Duration,
    interval: StdDuration,
}

impl NegotiationSweeper {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        notifier: Notifier,
        locks: Arc<CustomerLocks>,
        timeout_secs: u64,
        sweep_interval_secs: u64,
    ) -> Self {
        Self {
            sessions,
            notifier,
            locks,
            timeout: Duration::seconds(timeout_secs.min(i64::MAX as u64) as i64),
            interval: StdDuration::from_secs(sweep_interval_secs.max(1)),
        }
    }

    /// One sweep pass; returns how many negotiations were expired.
    ///
    /// Each candidate is expired under its customer's turn lock: a turn in
    /// flight finishes first, and the re-check then sees whatever that turn
    /// stored, so a customer mid-conversation is never told their order
    /// expired while the orchestrator is still advancing it.
    pub async fn run_once(&self, now: DateTime<Utc>) -> usize {
        let mut reaped = 0;
        for customer_id in self.sessions.stale_negotiations(now, self.timeout).await {
            let _turn_guard = self.locks.acquire(&customer_id).await;
            if !self.sessions.expire_negotiation(&customer_id, now, self.timeout).await {
                continue;
            }
            tracing::info!(
                event_name = "negotiation_expired",
                customer_id = %customer_id.0,
                "expired an abandoned negotiation",
            );
            self.notifier.send(&customer_id.0, &messages::negotiation_expired()).await;
            reaped += 1;
        }
        reaped
    }

    /// Runs sweeps forever on the configured interval.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_once(Utc::now()).await;
            }
        })
    }
}

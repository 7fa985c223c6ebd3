//! Background expiry sweeper
//!
//! One sweep is two passes over open debates: warn the owners of
//! debates entering the alert window, then release the ones past the
//! expiry threshold. A short-lived lease in the debate store keeps
//! concurrent replicas from double-sweeping; losing the lease skips the
//! whole sweep.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use ateneo_core::CaseOracle;

use crate::engine::DebateEngine;
use crate::error::ApiError;
use crate::notify::Notifier;
use crate::store::{CaseStore, CreditLedger, DebateStore, ProfileStore};

/// Timing knobs for the sweeper, all in seconds
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Age at which an open debate is released
    pub expiry_threshold_secs: u64,
    /// How long before release the owner is warned
    pub alert_window_secs: u64,
    /// Pause between background sweeps (also the lease TTL)
    pub sweep_interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            expiry_threshold_secs: 24 * 60 * 60,
            alert_window_secs: 2 * 60 * 60,
            sweep_interval_secs: 60 * 60,
        }
    }
}

/// What a single sweep did
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepReport {
    /// Expiry warnings delivered this pass
    pub alerts: usize,
    /// Debates released this pass
    pub released: usize,
}

/// Periodic expiry sweeper over the debate engine
pub struct Sweeper<P, C, D, O> {
    engine: DebateEngine<P, C, D, O>,
    debates: D,
    notifier: Box<dyn Notifier>,
    config: SweepConfig,
    /// Identifies this process in lease contention
    holder: String,
    /// Debate ids already warned, pruned as they leave the alert window
    alerted: Mutex<HashSet<i64>>,
}

impl<P, C, D, O> Sweeper<P, C, D, O>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    pub fn new(
        engine: DebateEngine<P, C, D, O>,
        debates: D,
        notifier: Box<dyn Notifier>,
        config: SweepConfig,
    ) -> Self {
        Self {
            engine,
            debates,
            notifier,
            config,
            holder: uuid::Uuid::new_v4().to_string(),
            alerted: Mutex::new(HashSet::new()),
        }
    }

    /// Run a single sweep at the given instant.
    ///
    /// Returns an all-zero report without touching anything when another
    /// holder owns the lease.
    pub fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport, ApiError> {
        // The TTL only matters if this process dies mid-sweep; a clean
        // pass releases the lease at the end.
        let lease_ttl = Duration::seconds(self.config.sweep_interval_secs as i64);
        if !self.debates.try_sweep_lease(&self.holder, now, now + lease_ttl)? {
            tracing::debug!(holder = %self.holder, "Sweep lease held elsewhere, skipping");
            return Ok(SweepReport::default());
        }

        let result = self.sweep(now);

        if let Err(e) = self.debates.release_sweep_lease(&self.holder) {
            tracing::warn!(holder = %self.holder, error = %e, "Failed to release sweep lease");
        }

        result
    }

    fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, ApiError> {
        let threshold = Duration::seconds(self.config.expiry_threshold_secs as i64);
        let window = Duration::seconds(self.config.alert_window_secs as i64);

        let soon = self.engine.expiring_soon(now, threshold, window)?;
        let current: HashSet<i64> = soon.iter().map(|d| d.id.0).collect();

        let mut alerts = 0;
        {
            let mut alerted = self.alerted.lock().unwrap();
            // Ids that expired or settled since the last pass drop out,
            // so a released-then-reclaimed case can be warned again.
            alerted.retain(|id| current.contains(id));

            for debate in &soon {
                if alerted.contains(&debate.id.0) {
                    continue;
                }
                let deadline = debate.started_at + threshold;
                let hours_left = (deadline - now).num_hours().max(1);
                match self.notifier.send_expiry_warning(
                    &debate.professional_email,
                    &debate.case_id.0,
                    hours_left,
                ) {
                    Ok(()) => {
                        alerted.insert(debate.id.0);
                        alerts += 1;
                    }
                    // A failed warning stays unrecorded and is retried
                    // on the next sweep.
                    Err(e) => tracing::warn!(
                        debate_id = debate.id.0,
                        professional = %debate.professional_email,
                        error = %e,
                        "Expiry warning failed"
                    ),
                }
            }
        }

        let released = self.engine.release_expired(now, threshold)?.len();

        Ok(SweepReport { alerts, released })
    }

    /// Sweep forever at the configured interval. Never returns; run it
    /// on its own task.
    pub async fn run(self: Arc<Self>) {
        let period = std::time::Duration::from_secs(self.config.sweep_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.sweep_interval_secs,
            threshold_secs = self.config.expiry_threshold_secs,
            "Expiry sweeper started"
        );

        loop {
            ticker.tick().await;
            match self.run_once(Utc::now()) {
                Ok(report) => {
                    if report.alerts > 0 || report.released > 0 {
                        tracing::info!(
                            alerts = report.alerts,
                            released = report.released,
                            "Sweep finished"
                        );
                    }
                }
                Err(e) => tracing::error!(error = %e, "Sweep failed"),
            }
        }
    }
}

//! Periodic redelivery of pending receipts.
//!
//! The worker sweeps `pending/` on a fixed interval. For each entry that
//! is due it regenerates a missing artifact from the database and retries
//! the upload; exhausted entries move to `failed/`. A sweep that is still
//! running when the next tick fires is not doubled up — the tick is
//! skipped.

use order_database::Database;
use receipt_delivery::{render_receipt, ReceiptTransport};
use receipt_outbox::{next_attempt_at, OutboxDir, ReceiptMeta, ReceiptOutbox};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, info_span, warn};

/// Retry worker tuning.
#[derive(Debug, Clone)]
pub struct RetryWorkerConfig {
    /// Time between sweeps.
    pub sweep_interval: Duration,
    /// Attempts before an entry moves to `failed/`.
    pub max_attempts: u32,
}

impl Default for RetryWorkerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            max_attempts: 10,
        }
    }
}

/// Outcome counters for one sweep, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub skipped: usize,
    pub delivered: usize,
    pub rescheduled: usize,
    pub failed: usize,
}

/// Background worker that redelivers pending receipts.
pub struct RetryWorker {
    config: RetryWorkerConfig,
    outbox: Arc<ReceiptOutbox>,
    db: Arc<Database>,
    transport: Arc<dyn ReceiptTransport>,
    // Held for the duration of a sweep; a tick that cannot take it is
    // dropped rather than queued.
    sweep_guard: Mutex<()>,
}

impl RetryWorker {
    pub fn new(
        config: RetryWorkerConfig,
        outbox: Arc<ReceiptOutbox>,
        db: Arc<Database>,
        transport: Arc<dyn ReceiptTransport>,
    ) -> Self {
        Self {
            config,
            outbox,
            db,
            transport,
            sweep_guard: Mutex::new(()),
        }
    }

    /// Spawn the periodic sweep loop.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let sweep_interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            loop {
                ticker.tick().await;
                let worker = self.clone();
                // The sweep does blocking file and database IO.
                let _ = tokio::task::spawn_blocking(move || worker.sweep()).await;
            }
        })
    }

    /// Run one sweep over `pending/`. Returns `None` when another sweep is
    /// already in progress.
    pub fn sweep(&self) -> Option<SweepStats> {
        let _guard = match self.sweep_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Previous sweep still running, skipping tick");
                return None;
            }
        };

        let metas = match self.outbox.list_pending_metas() {
            Ok(metas) => metas,
            Err(err) => {
                error!(error = %err, "Failed to list pending receipts");
                return Some(SweepStats::default());
            }
        };

        let now = chrono::Utc::now().timestamp_millis();
        let mut stats = SweepStats {
            scanned: metas.len(),
            ..SweepStats::default()
        };

        for meta in metas {
            let span = info_span!("receipt_retry", trace_id = %meta.trace_id, file_name = %meta.file_name);
            let _entered = span.enter();

            // Entries with no bookkeeping still belong to the intake path;
            // touching them here would race its first attempt.
            if meta.is_fresh() {
                stats.skipped += 1;
                continue;
            }
            if !meta.is_due(now) {
                stats.skipped += 1;
                continue;
            }

            // One entry's failure never aborts the sweep.
            match self.process_entry(meta) {
                EntryOutcome::Delivered => stats.delivered += 1,
                EntryOutcome::Rescheduled => stats.rescheduled += 1,
                EntryOutcome::Failed => stats.failed += 1,
            }
        }

        if stats.delivered + stats.rescheduled + stats.failed > 0 {
            info!(
                scanned = stats.scanned,
                delivered = stats.delivered,
                rescheduled = stats.rescheduled,
                failed = stats.failed,
                "Receipt retry sweep finished"
            );
        }
        Some(stats)
    }

    fn process_entry(&self, mut meta: ReceiptMeta) -> EntryOutcome {
        let artifact = self
            .outbox
            .artifact_path(OutboxDir::Pending, &meta.file_name);

        if !artifact.exists() {
            match self.regenerate_artifact(&meta) {
                Ok(true) => {}
                Ok(false) => {
                    // The rows are gone; nothing can ever be delivered.
                    error!("Order rows missing, cannot regenerate receipt");
                    if let Err(err) = self.outbox.mark_failed(&meta.file_name) {
                        error!(error = %err, "Failed to move unrecoverable entry to failed");
                    }
                    return EntryOutcome::Failed;
                }
                Err(err) => {
                    warn!(error = %err, "Artifact regeneration failed, will retry next sweep");
                    return EntryOutcome::Rescheduled;
                }
            }
        }

        match self.transport.upload(&artifact, &meta.file_name) {
            Ok(()) => {
                if let Err(err) = self.outbox.mark_sent(&meta.file_name) {
                    error!(error = %err, "Delivered but could not move entry to sent");
                    return EntryOutcome::Rescheduled;
                }
                info!(attempts = meta.attempts, "Receipt redelivered");
                EntryOutcome::Delivered
            }
            Err(err) => {
                let next = next_attempt_at(meta.attempts + 1);
                meta.record_failure(err.to_string(), next);
                if let Err(err) = self.outbox.update_meta(OutboxDir::Pending, &meta) {
                    error!(error = %err, "Failed to persist retry bookkeeping");
                    return EntryOutcome::Rescheduled;
                }

                if meta.attempts >= self.config.max_attempts {
                    warn!(attempts = meta.attempts, "Attempt ceiling reached, marking failed");
                    if let Err(err) = self.outbox.mark_failed(&meta.file_name) {
                        error!(error = %err, "Failed to move exhausted entry to failed");
                        return EntryOutcome::Rescheduled;
                    }
                    EntryOutcome::Failed
                } else {
                    debug!(
                        attempts = meta.attempts,
                        next_attempt_at_epoch_ms = meta.next_attempt_at_epoch_ms,
                        "Redelivery failed, rescheduled"
                    );
                    EntryOutcome::Rescheduled
                }
            }
        }
    }

    /// Rebuild a missing artifact from the rows named in the sidecar.
    /// Returns `Ok(false)` when the rows no longer exist.
    fn regenerate_artifact(&self, meta: &ReceiptMeta) -> Result<bool, String> {
        let orders = self
            .db
            .find_orders_by_ids(&meta.applicant_key, &meta.order_ids)
            .map_err(|e| e.to_string())?;
        if orders.len() != meta.order_ids.len() {
            return Ok(false);
        }

        let content = render_receipt(&orders);
        self.outbox
            .write_receipt_to_pending(&meta.file_name, &content)
            .map_err(|e| e.to_string())?;
        info!(rows = orders.len(), "Regenerated receipt artifact from database");
        Ok(true)
    }
}

enum EntryOutcome {
    Delivered,
    Rescheduled,
    Failed,
}

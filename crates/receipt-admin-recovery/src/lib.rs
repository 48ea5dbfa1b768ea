//! Operator-triggered receipt recovery.
//!
//! An operator hands in a trace id (and optionally a corrected participant
//! name) for a receipt that is stuck in `pending/` or `failed/`. Recovery
//! renames the entry if asked, regenerates a missing artifact, and uploads
//! out of band — without touching the retry bookkeeping, so a concurrent
//! sweep sees a consistent entry. Every path produces a structured outcome
//! rather than an error; the operator reads the message, not a stack.

use order_database::Database;
use receipt_delivery::{renamed_file_name, render_receipt, ReceiptTransport};
use receipt_outbox::{OutboxDir, ReceiptMeta, ReceiptOutbox};
use std::sync::Arc;
use tracing::{error, info, info_span, warn};

/// What the operator asked for.
#[derive(Debug, Clone)]
pub struct RecoveryRequest {
    pub trace_id: String,
    /// Replace the participant segment of the file name, keeping the
    /// timestamp group.
    pub new_participant_name: Option<String>,
}

/// Structured report of a recovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub trace_id: String,
    pub success: bool,
    pub message: String,
    pub old_file_name: Option<String>,
    pub new_file_name: Option<String>,
    /// Directory the entry was found in, as reported to the operator.
    pub found_in: Option<&'static str>,
}

impl RecoveryOutcome {
    fn not_found(trace_id: &str) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            success: false,
            message: "no pending or failed receipt with this trace id".to_string(),
            old_file_name: None,
            new_file_name: None,
            found_in: None,
        }
    }

    fn failure(trace_id: &str, dir: OutboxDir, file_name: &str, message: String) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            success: false,
            message,
            old_file_name: Some(file_name.to_string()),
            new_file_name: None,
            found_in: Some(dir.as_str()),
        }
    }
}

/// Manual recovery service.
pub struct AdminRecoveryService {
    outbox: Arc<ReceiptOutbox>,
    db: Arc<Database>,
    transport: Arc<dyn ReceiptTransport>,
}

impl AdminRecoveryService {
    pub fn new(
        outbox: Arc<ReceiptOutbox>,
        db: Arc<Database>,
        transport: Arc<dyn ReceiptTransport>,
    ) -> Self {
        Self {
            outbox,
            db,
            transport,
        }
    }

    /// Run one recovery. Infallible by contract: every failure mode is a
    /// reported outcome.
    pub fn recover(&self, request: &RecoveryRequest) -> RecoveryOutcome {
        let span = info_span!("receipt_recovery", trace_id = %request.trace_id);
        let _entered = span.enter();

        let (dir, mut meta) = match self.outbox.find_by_trace_id(&request.trace_id) {
            Ok(Some(found)) => found,
            Ok(None) => {
                info!("Recovery requested for unknown or already sent trace id");
                return RecoveryOutcome::not_found(&request.trace_id);
            }
            Err(err) => {
                error!(error = %err, "Recovery lookup failed");
                let mut outcome = RecoveryOutcome::not_found(&request.trace_id);
                outcome.message = format!("lookup failed: {err}");
                return outcome;
            }
        };

        let old_file_name = meta.file_name.clone();
        info!(dir = %dir, file_name = %old_file_name, "Recovering receipt");

        if let Some(participant) = &request.new_participant_name {
            if let Err(outcome) = self.rename(dir, &mut meta, participant, &request.trace_id) {
                return outcome;
            }
        }

        let artifact = self.outbox.artifact_path(dir, &meta.file_name);
        if !artifact.exists() {
            if let Err(message) = self.regenerate(dir, &meta) {
                return RecoveryOutcome::failure(&request.trace_id, dir, &meta.file_name, message);
            }
        }

        // Out-of-band upload: attempts and next-attempt time stay as they
        // are, so a failed recovery leaves the scheduler's view intact.
        if let Err(err) = self.transport.upload(&artifact, &meta.file_name) {
            warn!(error = %err, "Recovery upload failed");
            return RecoveryOutcome::failure(
                &request.trace_id,
                dir,
                &meta.file_name,
                format!("upload failed: {err}"),
            );
        }

        if let Err(err) = self.outbox.move_to_sent_from(dir, &meta.file_name) {
            error!(error = %err, "Uploaded but could not move entry to sent");
            return RecoveryOutcome::failure(
                &request.trace_id,
                dir,
                &meta.file_name,
                format!("uploaded but moving to sent failed: {err}"),
            );
        }

        info!(file_name = %meta.file_name, from = %dir, "Receipt recovered");
        RecoveryOutcome {
            trace_id: request.trace_id.clone(),
            success: true,
            message: format!("delivered from {dir}"),
            old_file_name: Some(old_file_name),
            new_file_name: Some(meta.file_name),
            found_in: Some(dir.as_str()),
        }
    }

    /// Rename the entry, keeping the timestamp group. A file name that does
    /// not match the receipt pattern is logged and left as is.
    fn rename(
        &self,
        dir: OutboxDir,
        meta: &mut ReceiptMeta,
        participant: &str,
        trace_id: &str,
    ) -> Result<(), RecoveryOutcome> {
        let new_name = match renamed_file_name(&meta.file_name, participant) {
            Ok(name) => name,
            Err(err) => {
                warn!(file_name = %meta.file_name, error = %err, "File name does not match receipt pattern, skipping rename");
                return Ok(());
            }
        };
        if new_name == meta.file_name {
            return Ok(());
        }

        if let Err(err) = self.outbox.rename_entry(dir, &meta.file_name, &new_name) {
            warn!(error = %err, "Rename refused");
            return Err(RecoveryOutcome::failure(
                trace_id,
                dir,
                &meta.file_name,
                format!("rename failed: {err}"),
            ));
        }

        meta.file_name = new_name;
        if let Err(err) = self.outbox.update_meta(dir, meta) {
            error!(error = %err, "Renamed but could not update sidecar");
            return Err(RecoveryOutcome::failure(
                trace_id,
                dir,
                &meta.file_name,
                format!("renamed but sidecar update failed: {err}"),
            ));
        }
        Ok(())
    }

    fn regenerate(&self, dir: OutboxDir, meta: &ReceiptMeta) -> Result<(), String> {
        let orders = self
            .db
            .find_orders_by_ids(&meta.applicant_key, &meta.order_ids)
            .map_err(|e| format!("database lookup failed: {e}"))?;
        if orders.len() != meta.order_ids.len() {
            return Err(format!(
                "only {} of {} order rows exist, cannot regenerate",
                orders.len(),
                meta.order_ids.len()
            ));
        }

        let content = render_receipt(&orders);
        self.outbox
            .write_receipt(dir, &meta.file_name, &content)
            .map_err(|e| format!("artifact write failed: {e}"))?;
        info!(rows = orders.len(), dir = %dir, "Regenerated receipt artifact for recovery");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_database::{queries, DatabaseResult, NewOrder};
    use receipt_delivery::ScriptedTransport;
    use std::fs;

    struct Fixture {
        _guard: tempfile::TempDir,
        outbox: Arc<ReceiptOutbox>,
        db: Arc<Database>,
        transport: Arc<ScriptedTransport>,
        service: AdminRecoveryService,
    }

    fn fixture() -> Fixture {
        let guard = tempfile::tempdir().unwrap();
        let outbox = Arc::new(ReceiptOutbox::open(guard.path().join("outbox")).unwrap());
        let db = Arc::new(Database::open_in_memory().unwrap());
        let transport = Arc::new(ScriptedTransport::new());
        let service = AdminRecoveryService::new(outbox.clone(), db.clone(), transport.clone());
        Fixture {
            _guard: guard,
            outbox,
            db,
            transport,
            service,
        }
    }

    fn seed_order(db: &Database, order_id: &str) {
        db.with_transaction(|tx| -> DatabaseResult<()> {
            let order = NewOrder {
                user_id: "user-1".to_string(),
                item_id: "item-1".to_string(),
                name: "Kim".to_string(),
                address: "Seoul".to_string(),
                item_name: "Keyboard".to_string(),
                price: "42000".to_string(),
            }
            .into_order(order_id.to_string(), "APPL-1");
            queries::insert_orders(tx, &[order])
        })
        .unwrap();
    }

    fn stuck_meta(trace_id: &str, file_name: &str, order_ids: &[&str]) -> ReceiptMeta {
        let mut meta = ReceiptMeta::new(
            trace_id,
            "APPL-1",
            file_name,
            order_ids.iter().map(|s| s.to_string()).collect(),
        );
        meta.record_failure("transport down", i64::MAX);
        meta
    }

    fn request(trace_id: &str) -> RecoveryRequest {
        RecoveryRequest {
            trace_id: trace_id.to_string(),
            new_participant_name: None,
        }
    }

    const NAME: &str = "RECEIPT_ACME_20260827093005.txt";

    #[test]
    fn unknown_trace_id_is_reported_not_fatal() {
        let f = fixture();
        let outcome = f.service.recover(&request("ghost"));
        assert!(!outcome.success);
        assert!(outcome.found_in.is_none());
    }

    #[test]
    fn recovers_pending_entry_to_sent() {
        let f = fixture();
        f.outbox
            .write_meta_to_pending(&stuck_meta("trace-1", NAME, &[]))
            .unwrap();
        f.outbox.write_receipt_to_pending(NAME, "content\n").unwrap();

        let outcome = f.service.recover(&request("trace-1"));
        assert!(outcome.success);
        assert_eq!(outcome.found_in, Some("pending"));
        assert!(f.outbox.artifact_path(OutboxDir::Sent, NAME).exists());
        assert_eq!(f.transport.uploads().len(), 1);
    }

    #[test]
    fn recovers_failed_entry_to_sent() {
        let f = fixture();
        f.outbox
            .write_meta(OutboxDir::Failed, &stuck_meta("trace-1", NAME, &[]))
            .unwrap();
        f.outbox
            .write_receipt(OutboxDir::Failed, NAME, "content\n")
            .unwrap();

        let outcome = f.service.recover(&request("trace-1"));
        assert!(outcome.success);
        assert_eq!(outcome.found_in, Some("failed"));
        assert!(f.outbox.artifact_path(OutboxDir::Sent, NAME).exists());
    }

    #[test]
    fn recovery_is_idempotent_once_sent() {
        let f = fixture();
        f.outbox
            .write_meta_to_pending(&stuck_meta("trace-1", NAME, &[]))
            .unwrap();
        f.outbox.write_receipt_to_pending(NAME, "content\n").unwrap();

        assert!(f.service.recover(&request("trace-1")).success);
        // Entry is in sent/ now, a second run finds nothing.
        let second = f.service.recover(&request("trace-1"));
        assert!(!second.success);
        assert!(second.found_in.is_none());
        assert_eq!(f.transport.uploads().len(), 1);
    }

    #[test]
    fn rename_preserves_timestamp_and_updates_sidecar() {
        let f = fixture();
        f.outbox
            .write_meta_to_pending(&stuck_meta("trace-1", NAME, &[]))
            .unwrap();
        f.outbox.write_receipt_to_pending(NAME, "content\n").unwrap();

        let outcome = f.service.recover(&RecoveryRequest {
            trace_id: "trace-1".to_string(),
            new_participant_name: Some("NEWCO".to_string()),
        });
        assert!(outcome.success);
        assert_eq!(
            outcome.new_file_name.as_deref(),
            Some("RECEIPT_NEWCO_20260827093005.txt")
        );

        let meta = f
            .outbox
            .read_meta(OutboxDir::Sent, "RECEIPT_NEWCO_20260827093005.txt")
            .unwrap();
        assert_eq!(meta.file_name, "RECEIPT_NEWCO_20260827093005.txt");
    }

    #[test]
    fn rename_refuses_existing_target() {
        let f = fixture();
        f.outbox
            .write_meta_to_pending(&stuck_meta("trace-1", NAME, &[]))
            .unwrap();
        f.outbox.write_receipt_to_pending(NAME, "content\n").unwrap();
        // Target name already taken.
        f.outbox
            .write_receipt_to_pending("RECEIPT_NEWCO_20260827093005.txt", "other\n")
            .unwrap();

        let outcome = f.service.recover(&RecoveryRequest {
            trace_id: "trace-1".to_string(),
            new_participant_name: Some("NEWCO".to_string()),
        });
        assert!(!outcome.success);
        assert!(outcome.message.contains("rename failed"));
        // Original entry untouched.
        assert!(f.outbox.artifact_path(OutboxDir::Pending, NAME).exists());
    }

    #[test]
    fn unparseable_file_name_skips_rename_but_recovers() {
        let f = fixture();
        f.outbox
            .write_meta_to_pending(&stuck_meta("trace-1", "oddball.txt", &[]))
            .unwrap();
        f.outbox
            .write_receipt_to_pending("oddball.txt", "content\n")
            .unwrap();

        let outcome = f.service.recover(&RecoveryRequest {
            trace_id: "trace-1".to_string(),
            new_participant_name: Some("NEWCO".to_string()),
        });
        assert!(outcome.success);
        assert_eq!(outcome.new_file_name.as_deref(), Some("oddball.txt"));
    }

    #[test]
    fn regenerates_missing_artifact_in_failed_dir() {
        let f = fixture();
        seed_order(&f.db, "A000");
        f.outbox
            .write_meta(OutboxDir::Failed, &stuck_meta("trace-1", NAME, &["A000"]))
            .unwrap();

        let outcome = f.service.recover(&request("trace-1"));
        assert!(outcome.success);
        let content = fs::read_to_string(f.outbox.artifact_path(OutboxDir::Sent, NAME)).unwrap();
        assert_eq!(content, "A000^user-1^item-1^APPL-1^Kim^Seoul^Keyboard^42000\n");
    }

    #[test]
    fn missing_rows_fail_the_recovery() {
        let f = fixture();
        f.outbox
            .write_meta_to_pending(&stuck_meta("trace-1", NAME, &["A000"]))
            .unwrap();

        let outcome = f.service.recover(&request("trace-1"));
        assert!(!outcome.success);
        assert!(outcome.message.contains("cannot regenerate"));
        // Entry stays where it was.
        assert!(f.outbox.meta_path(OutboxDir::Pending, NAME).exists());
    }

    #[test]
    fn upload_failure_leaves_bookkeeping_untouched() {
        let f = fixture();
        f.transport.push_err("still down");
        let meta = stuck_meta("trace-1", NAME, &[]);
        let attempts_before = meta.attempts;
        f.outbox.write_meta_to_pending(&meta).unwrap();
        f.outbox.write_receipt_to_pending(NAME, "content\n").unwrap();

        let outcome = f.service.recover(&request("trace-1"));
        assert!(!outcome.success);

        let after = f.outbox.read_meta(OutboxDir::Pending, NAME).unwrap();
        assert_eq!(after.attempts, attempts_before);
        assert_eq!(after.next_attempt_at_epoch_ms, i64::MAX);
    }
}

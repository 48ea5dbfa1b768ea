//! Intake-path delivery: the one synchronous attempt.

use crate::render::{build_file_name, render_receipt};
use crate::transport::ReceiptTransport;
use crate::DeliveryResult;
use order_database::Order;
use receipt_outbox::{next_attempt_at, OutboxDir, ReceiptMeta, ReceiptOutbox};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to a receipt on the intake path. The orders themselves
/// are already committed by the time this exists; `uploaded == false`
/// means "accepted, delivery pending", not a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeDelivery {
    pub trace_id: String,
    pub file_name: String,
    pub artifact_created: bool,
    pub uploaded: bool,
    pub attempts: u32,
}

/// Runs the immediate delivery attempt for freshly committed orders.
pub struct ReceiptDeliveryService {
    outbox: Arc<ReceiptOutbox>,
    transport: Arc<dyn ReceiptTransport>,
    participant_name: String,
    max_attempts: u32,
}

impl ReceiptDeliveryService {
    pub fn new(
        outbox: Arc<ReceiptOutbox>,
        transport: Arc<dyn ReceiptTransport>,
        participant_name: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            outbox,
            transport,
            participant_name: participant_name.into(),
            max_attempts,
        }
    }

    /// Record and attempt delivery of the receipt for `orders`.
    ///
    /// Order of operations is deliberate: the metadata sidecar is persisted
    /// first, so any later failure (artifact write, upload, crash) leaves a
    /// recoverable entry in `pending/`. Failures after that point are
    /// recorded in the sidecar and reported in the outcome, never returned
    /// as errors.
    pub fn deliver_new_receipt(
        &self,
        trace_id: &str,
        applicant_key: &str,
        orders: &[Order],
    ) -> DeliveryResult<IntakeDelivery> {
        let file_name = build_file_name(&self.participant_name, chrono::Utc::now());
        let order_ids: Vec<String> = orders.iter().map(|o| o.order_id.clone()).collect();

        let mut meta = ReceiptMeta::new(trace_id, applicant_key, file_name.clone(), order_ids);
        self.outbox.write_meta_to_pending(&meta)?;

        let content = render_receipt(orders);
        if let Err(err) = self.outbox.write_receipt_to_pending(&file_name, &content) {
            // Sidecar is safe in pending/; the sweep regenerates the
            // artifact from the database.
            error!(trace_id, file_name, error = %err, "Receipt artifact creation failed");
            let next = next_attempt_at(meta.attempts + 1);
            meta.record_failure(format!("artifact creation failed: {err}"), next);
            self.outbox.update_meta(OutboxDir::Pending, &meta)?;
            return Ok(IntakeDelivery {
                trace_id: trace_id.to_string(),
                file_name,
                artifact_created: false,
                uploaded: false,
                attempts: meta.attempts,
            });
        }

        let artifact = self.outbox.artifact_path(OutboxDir::Pending, &file_name);
        match self.transport.upload(&artifact, &file_name) {
            Ok(()) => {
                self.outbox.mark_sent(&file_name)?;
                info!(trace_id, file_name, "Receipt delivered on intake");
                Ok(IntakeDelivery {
                    trace_id: trace_id.to_string(),
                    file_name,
                    artifact_created: true,
                    uploaded: true,
                    attempts: meta.attempts,
                })
            }
            Err(err) => {
                let next = next_attempt_at(meta.attempts + 1);
                meta.record_failure(err.to_string(), next);
                self.outbox.update_meta(OutboxDir::Pending, &meta)?;
                if meta.attempts >= self.max_attempts {
                    warn!(trace_id, file_name, attempts = meta.attempts, "Attempt ceiling reached on intake, marking failed");
                    self.outbox.mark_failed(&file_name)?;
                } else {
                    warn!(trace_id, file_name, error = %err, "Intake delivery failed, left pending for retry");
                }
                Ok(IntakeDelivery {
                    trace_id: trace_id.to_string(),
                    file_name,
                    artifact_created: true,
                    uploaded: false,
                    attempts: meta.attempts,
                })
            }
        }
    }
}

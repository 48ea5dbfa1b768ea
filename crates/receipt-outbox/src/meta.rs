//! Receipt metadata sidecar.

use serde::{Deserialize, Serialize};

/// Suffix appended to the artifact name for the sidecar.
pub const META_SUFFIX: &str = ".meta.json";

/// Sidecar file name for a receipt artifact.
pub fn meta_file_name(file_name: &str) -> String {
    format!("{file_name}{META_SUFFIX}")
}

/// Delivery bookkeeping for one receipt, persisted as
/// `<fileName>.meta.json` next to the artifact.
///
/// Field names on the wire are camelCase; the sidecar format predates this
/// implementation and is read by operator tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMeta {
    /// Correlates the receipt with the intake request that produced it.
    pub trace_id: String,
    pub applicant_key: String,
    /// Current artifact file name; updated when the entry is renamed.
    pub file_name: String,
    /// Identifiers of the rows the artifact renders, in allocation order.
    /// Enough to regenerate the artifact from the database.
    pub order_ids: Vec<String>,
    /// Delivery attempts made so far, counting the immediate intake attempt.
    pub attempts: u32,
    pub next_attempt_at_epoch_ms: i64,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl ReceiptMeta {
    /// Fresh metadata for a receipt that has not been attempted yet.
    pub fn new(
        trace_id: impl Into<String>,
        applicant_key: impl Into<String>,
        file_name: impl Into<String>,
        order_ids: Vec<String>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            applicant_key: applicant_key.into(),
            file_name: file_name.into(),
            order_ids,
            attempts: 0,
            next_attempt_at_epoch_ms: chrono::Utc::now().timestamp_millis(),
            last_error: None,
        }
    }

    /// Sidecar file name for this entry.
    pub fn meta_file_name(&self) -> String {
        meta_file_name(&self.file_name)
    }

    /// Record a failed attempt and when to try again.
    pub fn record_failure(&mut self, error: impl Into<String>, next_attempt_at_epoch_ms: i64) {
        self.attempts += 1;
        self.last_error = Some(error.into());
        self.next_attempt_at_epoch_ms = next_attempt_at_epoch_ms;
    }

    /// Whether the entry is due for redelivery at `now_epoch_ms`.
    pub fn is_due(&self, now_epoch_ms: i64) -> bool {
        self.next_attempt_at_epoch_ms <= now_epoch_ms
    }

    /// Whether the intake path still owns this entry: no attempt recorded
    /// and no error (blank text included). The sweep must leave these
    /// alone.
    pub fn is_fresh(&self) -> bool {
        self.attempts == 0 && self.last_error.as_deref().unwrap_or("").trim().is_empty()
    }
}

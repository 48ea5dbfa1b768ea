//! Receipt artifact rendering and the file-name codec.

use crate::{DeliveryError, DeliveryResult};
use chrono::{DateTime, Utc};
use order_database::Order;

/// File-name prefix of every receipt artifact.
pub const FILE_PREFIX: &str = "RECEIPT";

const EXTENSION: &str = ".txt";
const TIMESTAMP_LEN: usize = 14;

/// Render the receipt body: one caret-separated line per order, in the
/// order given, with a trailing newline. Rows must be passed in
/// allocation order so a regenerated artifact is byte-identical to the
/// original.
pub fn render_receipt(orders: &[Order]) -> String {
    let mut out = String::new();
    for order in orders {
        out.push_str(&order.order_id);
        out.push('^');
        out.push_str(&order.user_id);
        out.push('^');
        out.push_str(&order.item_id);
        out.push('^');
        out.push_str(&order.applicant_key);
        out.push('^');
        out.push_str(&order.name);
        out.push('^');
        out.push_str(&order.address);
        out.push('^');
        out.push_str(&order.item_name);
        out.push('^');
        out.push_str(&order.price);
        out.push('\n');
    }
    out
}

/// Build `RECEIPT_<participant>_<yyyyMMddHHmmss>.txt` for the given moment.
pub fn build_file_name(participant: &str, at: DateTime<Utc>) -> String {
    format!(
        "{FILE_PREFIX}_{participant}_{}{EXTENSION}",
        at.format("%Y%m%d%H%M%S")
    )
}

/// Extract the 14-digit timestamp group from a receipt file name.
///
/// The participant segment may itself contain underscores, so the
/// timestamp is taken from the last underscore-separated group.
pub fn timestamp_group(file_name: &str) -> DeliveryResult<&str> {
    let stem = file_name
        .strip_suffix(EXTENSION)
        .ok_or_else(|| DeliveryError::InvalidFileName(file_name.to_string()))?;

    let (head, timestamp) = stem
        .rsplit_once('_')
        .ok_or_else(|| DeliveryError::InvalidFileName(file_name.to_string()))?;

    let valid_head = head
        .strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|participant| !participant.is_empty());
    let valid_timestamp =
        timestamp.len() == TIMESTAMP_LEN && timestamp.bytes().all(|b| b.is_ascii_digit());

    if !valid_head || !valid_timestamp {
        return Err(DeliveryError::InvalidFileName(file_name.to_string()));
    }
    Ok(timestamp)
}

/// New file name with the participant segment replaced and the timestamp
/// group preserved.
pub fn renamed_file_name(file_name: &str, new_participant: &str) -> DeliveryResult<String> {
    let timestamp = timestamp_group(file_name)?;
    Ok(format!("{FILE_PREFIX}_{new_participant}_{timestamp}{EXTENSION}"))
}

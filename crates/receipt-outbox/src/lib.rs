//! Durable receipt outbox.
//!
//! Every receipt lives as a pair of files — the artifact and a
//! `<name>.meta.json` sidecar — inside one of three state directories:
//!
//! - `pending/` — awaiting delivery (or redelivery)
//! - `sent/`    — confirmed delivered
//! - `failed/`  — gave up; awaiting manual recovery
//!
//! The metadata sidecar is the recovery anchor: it is written before the
//! artifact, so a crash at any point leaves enough on disk to regenerate
//! and redeliver. State transitions are directory moves of the pair.

mod backoff;
mod error;
mod fs_util;
mod meta;
mod store;

pub use backoff::{next_attempt_at, retry_backoff_ms};
pub use error::{OutboxError, OutboxResult};
pub use meta::{meta_file_name, ReceiptMeta};
pub use store::{OutboxDir, ReceiptOutbox};

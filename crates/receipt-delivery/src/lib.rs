//! Receipt rendering and delivery.
//!
//! Ties the outbox to the remote channel: renders receipt artifacts from
//! order rows, names them, and runs the intake-path delivery (one
//! synchronous upload attempt; the retry worker owns everything after
//! that).

mod error;
mod intake;
mod render;
mod transport;

pub use error::{DeliveryError, DeliveryResult};
pub use intake::{IntakeDelivery, ReceiptDeliveryService};
pub use render::{build_file_name, render_receipt, renamed_file_name, timestamp_group};
pub use transport::{LocalDirTransport, ReceiptTransport, ScriptedTransport, TransportError};

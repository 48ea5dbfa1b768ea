//! SQLite persistence layer for the order relay.
//!
//! This crate provides:
//! - A `Database` wrapper with WAL mode and migrations
//! - Model types for the order and shipment tables
//! - Query helpers for the allocator, receipt regeneration, and the
//!   shipment batch
//!
//! The connection sits behind a mutex so a single `Arc<Database>` can be
//! shared by the intake path and the background workers. Writes are short
//! and SQLite serializes them anyway; transactions go through
//! [`Database::with_transaction`].

mod db;
mod error;
mod migrations;
mod models;
pub mod queries;

pub use db::Database;
pub use error::{DatabaseError, DatabaseResult};
pub use migrations::run_migrations;
pub use models::{NewOrder, Order, OrderStatus, Shipment};

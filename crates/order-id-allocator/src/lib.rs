//! Collision-safe sequential order identifier allocation.
//!
//! Identifiers run `A000` through `Z999`. Allocation reads the current
//! maximum for an applicant inside a transaction, binds the next contiguous
//! block, and inserts; the composite primary key in the database is the
//! collision detector when two allocations race. Collisions are retried a
//! bounded number of times with jittered backoff.

mod allocator;
mod error;
mod order_id;

pub use allocator::{IdAllocator, MAX_ALLOCATION_ATTEMPTS};
pub use error::{AllocatorError, AllocatorResult};
pub use order_id::{next_block, OrderId, MAX_ORDER_INDEX};

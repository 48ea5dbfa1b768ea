//! Transactional allocation with bounded collision retry.

use crate::order_id::{next_block, OrderId};
use crate::{AllocatorError, AllocatorResult};
use order_database::{queries, Database, NewOrder, Order};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts per allocation before the collision is surfaced to the caller.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

/// Jitter cap between collision retries.
const MAX_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Allocates contiguous identifier blocks and inserts the bound rows.
pub struct IdAllocator {
    db: Arc<Database>,
    applicant_key: String,
}

impl IdAllocator {
    pub fn new(db: Arc<Database>, applicant_key: impl Into<String>) -> Self {
        Self {
            db,
            applicant_key: applicant_key.into(),
        }
    }

    /// Allocate identifiers for `rows` and insert them, all in one
    /// transaction per attempt.
    ///
    /// Each attempt reads the current maximum identifier for the applicant,
    /// binds the next contiguous block, and inserts chunked. A concurrent
    /// allocation that read the same maximum loses on the primary key; the
    /// loser backs off with jitter and re-runs the whole cycle, up to
    /// [`MAX_ALLOCATION_ATTEMPTS`] times. Range exhaustion is returned
    /// immediately without retrying.
    pub async fn allocate_and_insert(&self, rows: Vec<NewOrder>) -> AllocatorResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 1;
        loop {
            match self.try_allocate(rows.clone()) {
                Ok(orders) => {
                    debug!(
                        applicant_key = %self.applicant_key,
                        count = orders.len(),
                        first_id = %orders[0].order_id,
                        attempt,
                        "Allocated order identifiers"
                    );
                    return Ok(orders);
                }
                Err(AllocatorError::Database(e)) if e.is_unique_violation() => {
                    if attempt >= MAX_ALLOCATION_ATTEMPTS {
                        return Err(AllocatorError::Collision {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    let delay = retry_delay(attempt);
                    warn!(
                        applicant_key = %self.applicant_key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Identifier allocation collided, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One read-max / bind / insert cycle.
    fn try_allocate(&self, rows: Vec<NewOrder>) -> AllocatorResult<Vec<Order>> {
        self.db.with_transaction(|tx| {
            let max = queries::select_max_order_id(tx, &self.applicant_key)?;
            let max = max.as_deref().map(OrderId::parse).transpose()?;
            let block = next_block(max, rows.len())?;

            let orders: Vec<Order> = rows
                .into_iter()
                .zip(block)
                .map(|(row, id)| row.into_order(id.to_string(), &self.applicant_key))
                .collect();
            queries::insert_orders(tx, &orders)?;
            Ok(orders)
        })
    }
}

/// Jittered delay before retry `attempt + 1`: roughly 10ms per attempt
/// already made, capped, plus a small random component so two losers do not
/// collide again in lockstep.
fn retry_delay(attempt: u32) -> Duration {
    let base = Duration::from_millis(10).saturating_mul(attempt).min(MAX_RETRY_DELAY);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..10));
    base + jitter
}

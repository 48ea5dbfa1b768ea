//! Periodic shipment batch.
//!
//! Claims unshipped orders, records a shipment row per order (the shipment
//! id reuses the order id), and flips the status flag — all in a single
//! transaction, so a failed run leaves every row unshipped for the next
//! one.

use order_database::{queries, Database, DatabaseResult, Shipment};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, info_span};

/// Shipment batch tuning.
#[derive(Debug, Clone)]
pub struct ShipmentBatchConfig {
    /// Wait before the first run after startup.
    pub initial_delay: Duration,
    /// Time between runs.
    pub run_interval: Duration,
    /// Orders claimed per run.
    pub fetch_limit: usize,
}

impl Default for ShipmentBatchConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            run_interval: Duration::from_secs(300),
            fetch_limit: 200,
        }
    }
}

/// Background worker that turns unshipped orders into shipments.
pub struct ShipmentBatchWorker {
    config: ShipmentBatchConfig,
    db: Arc<Database>,
    run_guard: Mutex<()>,
}

impl ShipmentBatchWorker {
    pub fn new(config: ShipmentBatchConfig, db: Arc<Database>) -> Self {
        Self {
            config,
            db,
            run_guard: Mutex::new(()),
        }
    }

    /// Spawn the periodic batch loop.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let initial_delay = self.config.initial_delay;
        let run_interval = self.config.run_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + initial_delay, run_interval);
            loop {
                ticker.tick().await;
                let worker = self.clone();
                let _ = tokio::task::spawn_blocking(move || worker.run_once()).await;
            }
        })
    }

    /// One batch run. Returns the number of orders shipped, or `None` when
    /// a previous run is still in progress.
    pub fn run_once(&self) -> Option<usize> {
        let _guard = match self.run_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Previous shipment batch still running, skipping tick");
                return None;
            }
        };

        let trace_id = format!("SHIPBATCH-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"));
        let span = info_span!("shipment_batch", trace_id = %trace_id);
        let _entered = span.enter();

        let fetch_limit = self.config.fetch_limit;
        let shipped = self.db.with_transaction(|tx| -> DatabaseResult<usize> {
            let orders = queries::select_unshipped_orders(tx, fetch_limit)?;
            if orders.is_empty() {
                return Ok(0);
            }

            let shipments: Vec<Shipment> = orders.iter().map(Shipment::from_order).collect();
            queries::insert_shipments(tx, &shipments)?;
            queries::mark_orders_shipped(tx, &orders)?;
            Ok(orders.len())
        });

        match shipped {
            Ok(0) => {
                debug!("No unshipped orders");
                Some(0)
            }
            Ok(count) => {
                info!(count, "Shipment batch finished");
                Some(count)
            }
            Err(err) => {
                error!(error = %err, "Shipment batch failed, rolled back");
                Some(0)
            }
        }
    }
}

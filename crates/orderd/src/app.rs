//! Wiring: config to collaborators to running daemon.

use anyhow::Context;
use order_database::{Database, NewOrder};
use order_id_allocator::IdAllocator;
use orderd_config::Config;
use receipt_admin_recovery::{AdminRecoveryService, RecoveryRequest};
use receipt_delivery::{LocalDirTransport, ReceiptDeliveryService, ReceiptTransport};
use receipt_outbox::ReceiptOutbox;
use receipt_retry_worker::{RetryWorker, RetryWorkerConfig};
use shipment_batch_worker::{ShipmentBatchConfig, ShipmentBatchWorker};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

struct Services {
    db: Arc<Database>,
    outbox: Arc<ReceiptOutbox>,
    transport: Arc<dyn ReceiptTransport>,
}

fn build_services(config: &Config) -> anyhow::Result<Services> {
    let db = Arc::new(
        Database::open(&config.database_path())
            .with_context(|| format!("opening database at {}", config.database_path().display()))?,
    );
    let outbox = Arc::new(
        ReceiptOutbox::open(config.outbox_dir())
            .with_context(|| format!("opening outbox at {}", config.outbox_dir().display()))?,
    );
    let transport: Arc<dyn ReceiptTransport> =
        Arc::new(LocalDirTransport::new(config.delivery_drop_dir.clone()));
    Ok(Services {
        db,
        outbox,
        transport,
    })
}

/// Run the background workers until ctrl-c.
pub async fn run_daemon(config: Config) -> anyhow::Result<()> {
    let services = build_services(&config)?;
    info!(
        data_dir = %config.data_dir.display(),
        applicant_key = %config.applicant_key,
        "orderd starting"
    );

    let retry_worker = Arc::new(RetryWorker::new(
        RetryWorkerConfig {
            sweep_interval: Duration::from_secs(config.retry_sweep_interval_secs),
            max_attempts: config.max_delivery_attempts,
        },
        services.outbox.clone(),
        services.db.clone(),
        services.transport.clone(),
    ));
    let retry_handle = retry_worker.start();

    let shipment_worker = Arc::new(ShipmentBatchWorker::new(
        ShipmentBatchConfig {
            initial_delay: Duration::from_secs(config.shipment_initial_delay_secs),
            run_interval: Duration::from_secs(config.shipment_interval_secs),
            fetch_limit: config.shipment_fetch_limit,
        },
        services.db.clone(),
    ));
    let shipment_handle = shipment_worker.start();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("orderd shutting down");

    retry_handle.abort();
    shipment_handle.abort();
    Ok(())
}

/// Allocate identifiers for the rows in `file` and deliver the receipt.
pub async fn ingest(config: Config, file: &Path) -> anyhow::Result<()> {
    let services = build_services(&config)?;

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let rows: Vec<NewOrder> =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", file.display()))?;
    anyhow::ensure!(!rows.is_empty(), "no order rows in {}", file.display());

    let trace_id = uuid::Uuid::new_v4().to_string();
    info!(trace_id, rows = rows.len(), "Ingesting order batch");

    let allocator = IdAllocator::new(services.db.clone(), config.applicant_key.clone());
    let orders = allocator.allocate_and_insert(rows).await?;

    let delivery = ReceiptDeliveryService::new(
        services.outbox,
        services.transport,
        config.participant_name.clone(),
        config.max_delivery_attempts,
    );
    let outcome = delivery.deliver_new_receipt(&trace_id, &config.applicant_key, &orders)?;

    println!("trace id:  {}", outcome.trace_id);
    println!("receipt:   {}", outcome.file_name);
    println!(
        "orders:    {} ({}..{})",
        orders.len(),
        orders[0].order_id,
        orders[orders.len() - 1].order_id
    );
    if outcome.uploaded {
        println!("delivered: yes");
    } else {
        println!("delivered: no (accepted, delivery pending)");
    }
    Ok(())
}

/// Manually recover a stuck receipt.
pub fn recover(
    config: Config,
    trace_id: String,
    participant: Option<String>,
) -> anyhow::Result<()> {
    let services = build_services(&config)?;
    let service = AdminRecoveryService::new(services.outbox, services.db, services.transport);

    let outcome = service.recover(&RecoveryRequest {
        trace_id,
        new_participant_name: participant,
    });

    println!("trace id: {}", outcome.trace_id);
    println!("success:  {}", outcome.success);
    println!("message:  {}", outcome.message);
    if let Some(dir) = outcome.found_in {
        println!("found in: {dir}");
    }
    if let (Some(old), Some(new)) = (&outcome.old_file_name, &outcome.new_file_name) {
        if old != new {
            println!("renamed:  {old} -> {new}");
        }
    }
    Ok(())
}

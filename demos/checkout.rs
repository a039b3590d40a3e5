//! Checkout flow: a transactional order command, a compensating payment,
//! a delayed receipt on its own queue, and a read-side query.
//!
//! Run with `RUST_LOG=routed_rust=debug cargo run --example checkout`.

use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use routed_rust::{
    Bus, BusConfig, Command, CommandHandler, HandlerError, InMemoryStore, JobWorker, Query,
    QueryHandler, Registry, RollbackHandler,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
default_queue = "checkout"

[logging]
log_payloads = true

[worker]
poll_interval_ms = 10

[commands."email.receipt"]
in_transaction = false
"#;

#[derive(Debug, Serialize, Deserialize, Command)]
#[command(name = "order.place")]
struct PlaceOrder {
    id: String,
    total: u64,
}

#[derive(Debug, Serialize, Deserialize, Command)]
#[command(name = "payment.capture")]
struct CapturePayment {
    order_id: String,
    cents: u64,
}

#[derive(Debug, Serialize, Deserialize, Command)]
#[command(name = "email.receipt", queue = "mail", delay_seconds = 0)]
struct SendReceipt {
    order_id: String,
}

#[derive(Debug, Serialize, Query)]
#[query(name = "order.get")]
struct GetOrder {
    id: String,
}

struct Orders {
    store: InMemoryStore,
}

impl CommandHandler<PlaceOrder> for Orders {
    fn handle(&self, command: &PlaceOrder) -> Result<Value, HandlerError> {
        self.store.put(
            format!("order:{}", command.id),
            json!({ "id": command.id, "total": command.total, "paid": false }),
        )?;
        Ok(json!({ "id": command.id }))
    }
}

impl QueryHandler<GetOrder> for Orders {
    fn handle(&self, query: &GetOrder) -> Result<Value, HandlerError> {
        self.store
            .get(&format!("order:{}", query.id))?
            .ok_or_else(|| HandlerError::NotFound(query.id.clone()))
    }
}

/// Captures against a pretend gateway; anything over 500.00 is declined
/// after the capture, so the handler issues a refund.
struct Payments;

impl CommandHandler<CapturePayment> for Payments {
    fn handle(&self, command: &CapturePayment) -> Result<Value, HandlerError> {
        println!("gateway: captured {} for {}", command.cents, command.order_id);
        if command.cents > 50_000 {
            return Err(HandlerError::Rejected("over limit".into()));
        }
        Ok(json!({ "captured": command.cents }))
    }
}

impl RollbackHandler<CapturePayment> for Payments {
    fn rollback(&self, command: &CapturePayment) -> Result<(), HandlerError> {
        println!("gateway: refunded {} for {}", command.cents, command.order_id);
        Ok(())
    }
}

struct Receipts;

impl CommandHandler<SendReceipt> for Receipts {
    fn handle(&self, command: &SendReceipt) -> Result<Value, HandlerError> {
        println!("mail: receipt sent for {}", command.order_id);
        Ok(Value::Null)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = BusConfig::from_toml_str(CONFIG)?;
    let store = InMemoryStore::new();

    let registry = Registry::builder()
        .command::<PlaceOrder, _>(Orders {
            store: store.clone(),
        })
        .command_with_rollback::<CapturePayment, _>(Payments, true)
        .command::<SendReceipt, _>(Receipts)
        .query::<GetOrder, _>(Orders {
            store: store.clone(),
        })
        .with_config(&config)
        .build()?;

    let bus = Bus::builder(registry)
        .config(config)
        .transactions(Arc::new(store.clone()))
        .build();

    let queue = bus
        .job_queue()
        .ok_or("bus was built with an external queue runtime")?
        .clone();
    let mail = JobWorker::spawn(queue.clone(), "mail", &bus.config().worker);
    let checkout = JobWorker::spawn(queue, "checkout", &bus.config().worker);

    bus.dispatch(PlaceOrder {
        id: "A-100".into(),
        total: 4_200,
    })?;
    bus.dispatch(CapturePayment {
        order_id: "A-100".into(),
        cents: 4_200,
    })?;
    bus.dispatch(SendReceipt {
        order_id: "A-100".into(),
    })?;

    if let Err(err) = bus.dispatch(CapturePayment {
        order_id: "A-101".into(),
        cents: 90_000,
    }) {
        println!("capture failed ({}): {}", err.status_code(), err);
    }

    // Explicitly deferred: lands on the default queue.
    let queued = bus.dispatch_async(PlaceOrder {
        id: "A-102".into(),
        total: 1_500,
    })?;
    if let Some(id) = queued.job_id() {
        println!("queued {}", id);
    }

    thread::sleep(Duration::from_millis(200));
    let mail_stats = mail.stop();
    let checkout_stats = checkout.stop();
    println!(
        "workers: mail executed {}, checkout executed {}",
        mail_stats.executed, checkout_stats.executed
    );

    println!("A-100: {}", bus.ask(GetOrder { id: "A-100".into() })?);
    println!("A-102: {}", bus.ask(GetOrder { id: "A-102".into() })?);

    Ok(())
}

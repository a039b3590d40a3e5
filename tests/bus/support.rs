//! Test domain: orders, payments and receipts on an in-memory store.

use std::sync::{Arc, Mutex};

use routed_rust::{
    Command, CommandHandler, DispatchError, HandlerError, InMemoryStore, Middleware, Next,
    Query, QueryHandler, Request, RollbackHandler,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Requests
// ============================================================================

/// Writes an order; a zero total is rejected after the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Command)]
#[command(name = "order.place")]
pub struct PlaceOrder {
    pub id: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Command)]
#[command(name = "email.receipt", queue = "mail", delay_seconds = 30)]
pub struct SendReceipt {
    pub order_id: String,
}

/// Async on the runtime's default queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Command)]
#[command(name = "search.reindex", deferred)]
pub struct Reindex {
    pub shard: u32,
}

/// Charges an external gateway; amounts over the limit are declined after
/// the charge went out, so the handler compensates with a refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Command)]
#[command(name = "payment.charge")]
pub struct ChargeCard {
    pub order_id: String,
    pub cents: u64,
}

/// No `name` attribute: routed under `module_path!()::Ident`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Command)]
pub struct Unregistered;

#[derive(Debug, Serialize, Query)]
#[query(name = "order.get")]
pub struct GetOrder {
    pub id: String,
}

#[derive(Debug, Serialize, Query)]
pub struct CountOrders;

pub const CHARGE_LIMIT: u64 = 10_000;

// ============================================================================
// Handlers
// ============================================================================

pub struct PlaceOrderHandler {
    pub store: InMemoryStore,
}

impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
    fn handle(&self, command: &PlaceOrder) -> Result<Value, HandlerError> {
        self.store.put(
            format!("order:{}", command.id),
            json!({ "id": command.id, "total": command.total }),
        )?;
        if command.total == 0 {
            return Err(HandlerError::Rejected("empty order".into()));
        }
        Ok(json!({ "id": command.id }))
    }
}

pub struct GetOrderHandler {
    pub store: InMemoryStore,
}

impl QueryHandler<GetOrder> for GetOrderHandler {
    fn handle(&self, query: &GetOrder) -> Result<Value, HandlerError> {
        self.store
            .get(&format!("order:{}", query.id))?
            .ok_or_else(|| HandlerError::NotFound(query.id.clone()))
    }
}

/// Records every receipt it sends.
#[derive(Clone, Default)]
pub struct Mailer {
    pub sent: Arc<Mutex<Vec<String>>>,
}

impl CommandHandler<SendReceipt> for Mailer {
    fn handle(&self, command: &SendReceipt) -> Result<Value, HandlerError> {
        self.sent.lock().unwrap().push(command.order_id.clone());
        Ok(Value::Null)
    }
}

/// What the rollback observed when it ran.
#[derive(Debug, Clone, PartialEq)]
pub struct Refund {
    pub command: ChargeCard,
    /// Whether the charge record was still visible in the store.
    pub charge_visible: bool,
}

#[derive(Clone, Default)]
pub struct ChargeHandler {
    pub store: InMemoryStore,
    pub gateway: Arc<Mutex<Vec<String>>>,
    pub refunds: Arc<Mutex<Vec<Refund>>>,
    pub fail_refund: bool,
}

impl CommandHandler<ChargeCard> for ChargeHandler {
    fn handle(&self, command: &ChargeCard) -> Result<Value, HandlerError> {
        self.store.put(
            format!("charge:{}", command.order_id),
            json!(command.cents),
        )?;
        self.gateway
            .lock()
            .unwrap()
            .push(format!("charge {} {}", command.order_id, command.cents));
        if command.cents > CHARGE_LIMIT {
            return Err(HandlerError::Rejected("declined".into()));
        }
        Ok(json!({ "charged": command.cents }))
    }
}

impl RollbackHandler<ChargeCard> for ChargeHandler {
    fn rollback(&self, command: &ChargeCard) -> Result<(), HandlerError> {
        let charge_visible = self
            .store
            .get(&format!("charge:{}", command.order_id))?
            .is_some();
        self.refunds.lock().unwrap().push(Refund {
            command: command.clone(),
            charge_visible,
        });
        if self.fail_refund {
            return Err(HandlerError::Other("gateway offline".into()));
        }
        self.gateway
            .lock()
            .unwrap()
            .push(format!("refund {}", command.order_id));
        Ok(())
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Appends `<label>-before` / `<label>-after` around the rest of the chain.
pub struct Trace {
    pub label: &'static str,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    pub fn new(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label,
            log: Arc::clone(log),
        }
    }
}

impl Middleware for Trace {
    fn handle(&self, request: &Request<'_>, next: Next<'_>) -> Result<Value, DispatchError> {
        self.log.lock().unwrap().push(format!("{}-before", self.label));
        let result = next.run(request);
        self.log.lock().unwrap().push(format!("{}-after", self.label));
        result
    }

    fn name(&self) -> &str {
        self.label
    }
}

/// Rejects every command before it reaches the handler.
pub struct ReadOnly;

impl Middleware for ReadOnly {
    fn handle(&self, request: &Request<'_>, next: Next<'_>) -> Result<Value, DispatchError> {
        if request.is_command() {
            return Err(HandlerError::Rejected("read-only mode".into()).into());
        }
        next.run(request)
    }
}

pub fn shared_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

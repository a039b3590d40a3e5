//! Compensating rollback after failed synchronous dispatches.

use std::sync::Arc;

use routed_rust::{
    CommandBus, DispatchError, HandlerError, InMemoryJobQueue, InMemoryStore, MiddlewarePipeline,
    Registry,
};
use serde_json::json;

use crate::support::{shared_log, ChargeCard, ChargeHandler, ReadOnly, Refund, Trace, CHARGE_LIMIT};

fn bus(handler: &ChargeHandler, pipeline: MiddlewarePipeline, in_transaction: bool) -> CommandBus {
    let registry = Registry::builder()
        .command_with_rollback::<ChargeCard, _>(handler.clone(), in_transaction)
        .build()
        .unwrap();
    CommandBus::new(
        Arc::new(registry),
        pipeline,
        Arc::new(handler.store.clone()),
        Arc::new(InMemoryJobQueue::default()),
    )
}

fn declined() -> ChargeCard {
    ChargeCard {
        order_id: "o-1".into(),
        cents: CHARGE_LIMIT + 1,
    }
}

// ============================================================================
// Test 1: Exactly one rollback with the original command, after the
//         transaction has been rolled back, through three middleware layers
// ============================================================================

#[test]
fn rollback_runs_once_after_transaction_rollback() {
    let handler = ChargeHandler::default();
    let log = shared_log();
    let pipeline = MiddlewarePipeline::new()
        .pipe(Trace::new("A", &log))
        .pipe(Trace::new("B", &log))
        .pipe(Trace::new("C", &log));
    let bus = bus(&handler, pipeline, true);

    let err = bus.dispatch(declined()).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Handler(HandlerError::Rejected(ref m)) if m == "declined"
    ));
    assert_eq!(
        *handler.refunds.lock().unwrap(),
        vec![Refund {
            command: declined(),
            charge_visible: false,
        }]
    );
    assert_eq!(
        *handler.gateway.lock().unwrap(),
        vec![format!("charge o-1 {}", CHARGE_LIMIT + 1), "refund o-1".to_string()]
    );
    assert_eq!(handler.store.rollbacks(), 1);
    // Every layer saw the failure on the way out.
    assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("A-after"));
}

#[test]
fn rollback_without_transaction_sees_partial_writes() {
    let handler = ChargeHandler::default();
    let bus = bus(&handler, MiddlewarePipeline::new(), false);

    bus.dispatch(declined()).unwrap_err();

    let refunds = handler.refunds.lock().unwrap();
    assert_eq!(refunds.len(), 1);
    assert!(refunds[0].charge_visible);
}

// ============================================================================
// Test 2: No rollback on success
// ============================================================================

#[test]
fn success_does_not_roll_back() {
    let handler = ChargeHandler::default();
    let bus = bus(&handler, MiddlewarePipeline::new(), true);

    let result = bus
        .dispatch(ChargeCard {
            order_id: "o-2".into(),
            cents: 500,
        })
        .unwrap();

    assert_eq!(result.into_value(), Some(json!({ "charged": 500 })));
    assert!(handler.refunds.lock().unwrap().is_empty());
    assert_eq!(handler.store.get("charge:o-2").unwrap(), Some(json!(500)));
}

// ============================================================================
// Test 3: A failing rollback never replaces the original error
// ============================================================================

#[test]
fn rollback_failure_keeps_original_error() {
    let handler = ChargeHandler {
        fail_refund: true,
        ..ChargeHandler::default()
    };
    let bus = bus(&handler, MiddlewarePipeline::new(), true);

    let err = bus.dispatch(declined()).unwrap_err();

    assert!(matches!(err, DispatchError::Handler(HandlerError::Rejected(_))));
    assert_eq!(handler.refunds.lock().unwrap().len(), 1);
    assert_eq!(handler.gateway.lock().unwrap().len(), 1);
}

// ============================================================================
// Test 4: Middleware failures also trigger the rollback
// ============================================================================

#[test]
fn middleware_failure_triggers_rollback() {
    let handler = ChargeHandler::default();
    let bus = bus(&handler, MiddlewarePipeline::new().pipe(ReadOnly), true);

    let err = bus
        .dispatch(ChargeCard {
            order_id: "o-3".into(),
            cents: 100,
        })
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Handler(HandlerError::Rejected(ref m)) if m == "read-only mode"
    ));
    assert!(handler
        .gateway
        .lock()
        .unwrap()
        .iter()
        .all(|line| !line.starts_with("charge")));
    assert_eq!(handler.refunds.lock().unwrap().len(), 1);
}

// ============================================================================
// Test 5: Handlers without the capability just propagate the error
// ============================================================================

#[test]
fn handler_without_rollback_propagates() {
    let store = InMemoryStore::new();
    let registry = Registry::builder()
        .command_fn::<ChargeCard, _>(true, |_| Err(HandlerError::Rejected("declined".into())))
        .build()
        .unwrap();
    assert!(!registry.command::<ChargeCard>().unwrap().has_rollback());

    let bus = CommandBus::new(
        Arc::new(registry),
        MiddlewarePipeline::new(),
        Arc::new(store),
        Arc::new(InMemoryJobQueue::default()),
    );
    let err = bus.dispatch(declined()).unwrap_err();
    assert_eq!(err.status_code(), 422);
}

// ============================================================================
// Test 6: The deferred path never rolls back
// ============================================================================

#[test]
fn deferred_dispatch_skips_rollback() {
    let handler = ChargeHandler::default();
    let bus = bus(&handler, MiddlewarePipeline::new(), true);

    let result = bus.dispatch_async(declined()).unwrap();
    assert!(result.is_queued());
    assert!(handler.gateway.lock().unwrap().is_empty());
    assert!(handler.refunds.lock().unwrap().is_empty());
}

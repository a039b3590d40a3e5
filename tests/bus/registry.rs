//! Registry construction, snapshots and startup verification.

use routed_rust::{InMemoryStore, Registry, RegistryError, RegistrySnapshot};
use serde_json::json;

use crate::support::{
    ChargeCard, ChargeHandler, GetOrder, GetOrderHandler, Mailer, PlaceOrder, PlaceOrderHandler,
    Reindex, SendReceipt,
};

fn registry(store: &InMemoryStore) -> Registry {
    Registry::builder()
        .command::<PlaceOrder, _>(PlaceOrderHandler {
            store: store.clone(),
        })
        .command_outside_transaction::<SendReceipt, _>(Mailer::default())
        .command_with_rollback::<ChargeCard, _>(ChargeHandler::default(), true)
        .query::<GetOrder, _>(GetOrderHandler {
            store: store.clone(),
        })
        .build()
        .unwrap()
}

// ============================================================================
// Test 1: Snapshot describes every binding
// ============================================================================

#[test]
fn snapshot_lists_bindings() {
    let snapshot = registry(&InMemoryStore::new()).snapshot();

    assert_eq!(
        snapshot.commands.keys().collect::<Vec<_>>(),
        vec!["email.receipt", "order.place", "payment.charge"]
    );

    let receipt = &snapshot.commands["email.receipt"];
    assert!(!receipt.transaction);
    assert!(receipt.deferred);
    assert_eq!(receipt.queue.as_deref(), Some("mail"));
    assert_eq!(receipt.delay_seconds, Some(30));
    assert!(receipt.handler.ends_with("Mailer"));

    let charge = &snapshot.commands["payment.charge"];
    assert!(charge.transaction);
    assert!(charge.rollback);
    assert!(!charge.deferred);

    assert!(snapshot.queries["order.get"].handler.ends_with("GetOrderHandler"));
}

// ============================================================================
// Test 2: Startup verification against a saved snapshot
// ============================================================================

#[test]
fn verify_against_saved_snapshot() {
    let path = std::env::temp_dir().join(format!("routed-registry-{}.json", std::process::id()));
    registry(&InMemoryStore::new()).snapshot().save(&path).unwrap();

    let expected = RegistrySnapshot::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let store = InMemoryStore::new();
    assert!(registry(&store).verify(&expected).is_ok());

    let drifted = Registry::builder()
        .command_outside_transaction::<PlaceOrder, _>(PlaceOrderHandler {
            store: store.clone(),
        })
        .command_fn::<Reindex, _>(false, |_| Ok(json!(null)))
        .build()
        .unwrap();

    match drifted.verify(&expected) {
        Err(RegistryError::SnapshotMismatch(drift)) => {
            assert!(drift.contains(&"command email.receipt is not registered".to_string()));
            assert!(drift
                .contains(&"command search.reindex is missing from the snapshot".to_string()));
            assert!(drift.contains(&"query order.get is not registered".to_string()));
            assert!(drift.iter().any(|line| line.starts_with("command order.place expected")));
        }
        other => panic!("expected snapshot mismatch, got {:?}", other),
    }
}

// ============================================================================
// Test 3: Registration conflicts are reported by build()
// ============================================================================

#[test]
fn duplicate_bindings_fail_build() {
    let result = Registry::builder()
        .command_outside_transaction::<SendReceipt, _>(Mailer::default())
        .command_outside_transaction::<SendReceipt, _>(Mailer::default())
        .build();
    assert_eq!(
        result.unwrap_err(),
        RegistryError::DuplicateCommand("email.receipt".into())
    );

    let store = InMemoryStore::new();
    let result = Registry::builder()
        .query::<GetOrder, _>(GetOrderHandler {
            store: store.clone(),
        })
        .query::<GetOrder, _>(GetOrderHandler { store })
        .build();
    assert_eq!(
        result.unwrap_err().to_string(),
        "duplicate query handler for order.get"
    );
}

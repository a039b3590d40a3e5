//! A thousand command types dispatched from many threads at once.

use std::sync::Arc;
use std::thread;

use routed_rust::{
    run_pending, AsyncCommand, Command, CommandBus, CommandHandler, DispatchError, Dispatched,
    HandlerError, InMemoryJobQueue, MiddlewarePipeline, NoTransaction, Registry, RegistryBuilder,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const THREADS: usize = 8;
const BULK_EVERY: usize = 250;

/// One distinct command type per `N`, routed under its default type name.
#[derive(Debug, Serialize, Deserialize)]
struct Numbered<const N: usize> {
    index: usize,
}

impl<const N: usize> Command for Numbered<N> {
    fn async_options() -> Option<AsyncCommand> {
        (N % BULK_EVERY == 0).then(|| AsyncCommand::new().on_queue("bulk"))
    }
}

/// Answers with the type's own index, so a misroute is visible.
struct IndexHandler;

impl<const N: usize> CommandHandler<Numbered<N>> for IndexHandler {
    fn handle(&self, command: &Numbered<N>) -> Result<Value, HandlerError> {
        if command.index != N {
            return Err(HandlerError::Rejected(format!(
                "index {} routed to handler {}",
                command.index, N
            )));
        }
        Ok(json!(N))
    }
}

struct Entry {
    register: fn(RegistryBuilder) -> RegistryBuilder,
    dispatch: fn(&CommandBus) -> Result<(usize, Dispatched), DispatchError>,
}

fn register<const N: usize>(builder: RegistryBuilder) -> RegistryBuilder {
    builder.command_outside_transaction::<Numbered<N>, _>(IndexHandler)
}

fn dispatch_one<const N: usize>(bus: &CommandBus) -> Result<(usize, Dispatched), DispatchError> {
    bus.dispatch(Numbered::<N> { index: N }).map(|out| (N, out))
}

macro_rules! entries {
    (@u $out:ident, $h:literal, $t:literal; $($u:literal)*) => {
        $(
            $out.push(Entry {
                register: register::<{ $h * 100 + $t * 10 + $u }>,
                dispatch: dispatch_one::<{ $h * 100 + $t * 10 + $u }>,
            });
        )*
    };
    (@t $out:ident, $h:literal; $($t:literal)*) => {
        $( entries!(@u $out, $h, $t; 0 1 2 3 4 5 6 7 8 9); )*
    };
    ($out:ident; $($h:literal)*) => {
        $( entries!(@t $out, $h; 0 1 2 3 4 5 6 7 8 9); )*
    };
}

fn all_entries() -> Vec<Entry> {
    let mut out = Vec::with_capacity(1000);
    entries!(out; 0 1 2 3 4 5 6 7 8 9);
    out
}

// ============================================================================
// Test 1: Parallel dispatch across 1,000 registered types
// ============================================================================

#[test]
fn thousand_types_dispatch_in_parallel() {
    let entries = all_entries();
    assert_eq!(entries.len(), 1000);

    let registry = entries
        .iter()
        .fold(Registry::builder(), |builder, entry| (entry.register)(builder))
        .build()
        .unwrap();
    assert_eq!(registry.commands().len(), 1000);

    let queue = InMemoryJobQueue::default();
    let bus = CommandBus::new(
        Arc::new(registry),
        MiddlewarePipeline::new(),
        Arc::new(NoTransaction),
        Arc::new(queue.clone()),
    );

    let chunk = entries.len() / THREADS;
    thread::scope(|scope| {
        for slice in entries.chunks(chunk) {
            let bus = &bus;
            scope.spawn(move || {
                // Each thread walks every type twice: the second pass hits
                // the warmed async annotation cache.
                for _ in 0..2 {
                    for entry in slice {
                        let (n, outcome) = (entry.dispatch)(bus).unwrap();
                        match outcome {
                            Dispatched::Completed(value) => {
                                assert_ne!(n % BULK_EVERY, 0);
                                assert_eq!(value, json!(n));
                            }
                            Dispatched::Queued(_) => assert_eq!(n % BULK_EVERY, 0),
                        }
                    }
                }
            });
        }
    });

    // 0, 250, 500 and 750, each dispatched twice.
    assert_eq!(queue.len("bulk"), 8);
    let stats = run_pending(&queue, "bulk", false).unwrap();
    assert_eq!(stats.executed, 8);
    assert_eq!(stats.failed, 0);
}

// ============================================================================
// Test 2: The async annotation is computed once per type
// ============================================================================

#[test]
fn async_annotation_shared_across_threads() {
    let registry = register::<500>(register::<501>(Registry::builder()))
        .build()
        .unwrap();
    let bus = CommandBus::new(
        Arc::new(registry),
        MiddlewarePipeline::new(),
        Arc::new(NoTransaction),
        Arc::new(InMemoryJobQueue::default()),
    );

    let seen: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| scope.spawn(|| bus.async_options::<Numbered<500>>().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = seen[0].as_ref().unwrap();
    assert_eq!(first.queue.as_deref(), Some("bulk"));
    assert!(seen
        .iter()
        .all(|options| Arc::ptr_eq(options.as_ref().unwrap(), first)));
    assert!(bus.async_options::<Numbered<501>>().unwrap().is_none());
}

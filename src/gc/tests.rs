//! Tests for external memory accounting.

use super::*;
use crate::error::ErrorKind;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Sink recording the net delta it received.
#[derive(Default)]
struct RecordingSink {
    total: Cell<i64>,
    calls: Cell<usize>,
}

impl ExternalMemorySink for RecordingSink {
    fn adjust_external_memory(&self, delta: i64) {
        self.total.set(self.total.get() + delta);
        self.calls.set(self.calls.get() + 1);
    }
}

#[test]
fn test_charge_and_release_are_paired() {
    let accountant = Arc::new(MemoryAccountant::default());

    let guard = accountant.try_charge(400).unwrap();
    assert_eq!(guard.amount(), 400);
    assert_eq!(accountant.charged(), 400);

    drop(guard);
    assert_eq!(accountant.charged(), 0);
}

#[test]
fn test_without_lock_changes_are_pending() {
    let accountant = Arc::new(MemoryAccountant::default());

    let guard = accountant.try_charge(1000).unwrap();
    assert_eq!(accountant.pending_delta(), 1000);
    drop(guard);
    assert_eq!(accountant.pending_delta(), 0);

    let _kept = accountant.try_charge(64).unwrap();
    assert_eq!(accountant.pending_delta(), 64);
}

#[test]
fn test_lock_applies_pending_then_forwards() {
    let accountant = Arc::new(MemoryAccountant::default());
    let sink = Rc::new(RecordingSink::default());

    let early = accountant.try_charge(300).unwrap();
    assert!(!HostLock::is_held(&accountant));

    {
        let _lock = HostLock::new(&accountant, sink.clone());
        assert!(HostLock::is_held(&accountant));
        assert_eq!(sink.total.get(), 300);
        assert_eq!(accountant.pending_delta(), 0);

        let during = accountant.try_charge(50).unwrap();
        assert_eq!(sink.total.get(), 350);
        drop(during);
        assert_eq!(sink.total.get(), 300);
        assert_eq!(accountant.pending_delta(), 0);
    }

    assert!(!HostLock::is_held(&accountant));
    drop(early);
    assert_eq!(sink.total.get(), 300);
    assert_eq!(accountant.pending_delta(), -300);
}

#[test]
fn test_nested_locks_restore_outer() {
    let outer_accountant = Arc::new(MemoryAccountant::default());
    let inner_accountant = Arc::new(MemoryAccountant::default());
    let outer_sink = Rc::new(RecordingSink::default());
    let inner_sink = Rc::new(RecordingSink::default());

    let _outer = HostLock::new(&outer_accountant, outer_sink.clone());
    {
        let _inner = HostLock::new(&inner_accountant, inner_sink.clone());
        assert!(HostLock::is_held(&inner_accountant));
        assert!(!HostLock::is_held(&outer_accountant));

        // The outer accountant is not the current one: its change waits.
        let _g = outer_accountant.try_charge(10).unwrap();
        assert_eq!(outer_sink.calls.get(), 0);
        assert_eq!(outer_accountant.pending_delta(), 10);
    }

    assert!(HostLock::is_held(&outer_accountant));
}

#[test]
fn test_limit_refuses_charge_without_side_effects() {
    let accountant = Arc::new(MemoryAccountant::new(Some(1000)));

    let first = accountant.try_charge(800).unwrap();
    let err = accountant.try_charge(201).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Allocation);
    assert_eq!(accountant.charged(), 800);
    assert_eq!(accountant.pending_delta(), 800);

    let exact = accountant.try_charge(200).unwrap();
    assert_eq!(accountant.charged(), 1000);

    drop(first);
    drop(exact);
    assert_eq!(accountant.charged(), 0);
}

#[test]
fn test_concurrent_charges_balance() {
    let accountant = Arc::new(MemoryAccountant::default());

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let accountant = Arc::clone(&accountant);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let guard = accountant.try_charge(16).unwrap();
                    drop(guard);
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(accountant.charged(), 0);
    assert_eq!(accountant.pending_delta(), 0);
}

#[test]
fn test_gc_traceable_option_and_vec() {
    let some = Some(bytes::Bytes::from_static(b"abcd"));
    let none: Option<bytes::Bytes> = None;

    assert_eq!(some.external_memory_size(), 4);
    assert_eq!(none.external_memory_size(), 0);
    assert_eq!(vec![some, none].external_memory_size(), 4);
}

//! HostLock - marks the thread that currently drives the host runtime.
//!
//! While a lock is held, accountant changes are reported to the host's
//! external memory sink immediately. Changes made elsewhere (collector
//! threads, or before the host is locked) accumulate in the accountant's
//! pending delta and are applied when the next lock is taken.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::MemoryAccountant;

/// Receives external memory deltas, e.g. a V8 isolate.
pub trait ExternalMemorySink {
    /// Positive values are allocations, negative values frees.
    fn adjust_external_memory(&self, delta: i64);
}

#[derive(Clone)]
struct Frame {
    accountant: Arc<MemoryAccountant>,
    sink: Rc<dyn ExternalMemorySink>,
}

thread_local! {
    /// Lock currently held on this thread (if any).
    static CURRENT_LOCK: RefCell<Option<Frame>> = const { RefCell::new(None) };
}

/// RAII guard registering a sink for one accountant on the current thread.
///
/// On construction:
/// - Applies the accountant's pending delta to the sink
/// - Registers itself, saving any outer lock (locks nest)
///
/// On drop:
/// - Restores the outer lock
///
/// Deferred finalizations should run before the lock is created; see
/// [`Bridge::lock`](crate::Bridge::lock).
pub struct HostLock {
    accountant: Arc<MemoryAccountant>,
    previous: Option<Frame>,
}

impl HostLock {
    pub fn new(accountant: &Arc<MemoryAccountant>, sink: Rc<dyn ExternalMemorySink>) -> Self {
        let pending = accountant.take_pending();

        if pending != 0 {
            sink.adjust_external_memory(pending);
            log::trace!(
                "Applied deferred external memory adjustment: {} bytes",
                pending
            );
        }

        let frame = Frame {
            accountant: Arc::clone(accountant),
            sink,
        };
        let previous = CURRENT_LOCK.with(|c| c.borrow_mut().replace(frame));

        Self {
            accountant: Arc::clone(accountant),
            previous,
        }
    }

    /// Whether a lock for `accountant` is held on this thread.
    pub fn is_held(accountant: &MemoryAccountant) -> bool {
        CURRENT_LOCK.with(|c| {
            c.borrow()
                .as_ref()
                .is_some_and(|frame| std::ptr::eq(Arc::as_ptr(&frame.accountant), accountant))
        })
    }

    pub fn accountant(&self) -> &Arc<MemoryAccountant> {
        &self.accountant
    }
}

impl Drop for HostLock {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_LOCK.with(|c| *c.borrow_mut() = previous);
    }
}

/// Report `delta` to the sink of the lock held for `accountant`, if any.
///
/// Returns `false` when no such lock is held on this thread.
pub(super) fn forward_to_current_lock(accountant: &MemoryAccountant, delta: i64) -> bool {
    // Cloned out so a sink that re-enters the bridge does not hit the borrow.
    let sink = CURRENT_LOCK.with(|c| {
        c.borrow()
            .as_ref()
            .filter(|frame| std::ptr::eq(Arc::as_ptr(&frame.accountant), accountant))
            .map(|frame| Rc::clone(&frame.sink))
    });

    match sink {
        Some(sink) => {
            sink.adjust_external_memory(delta);
            log::trace!("Adjusted external memory: {} bytes", delta);
            true
        }
        None => false,
    }
}

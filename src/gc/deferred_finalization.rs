//! Deferred finalization of wrapper objects.
//!
//! ## Problem
//!
//! A tracing collector may decide a wrapper is unreachable on a thread that
//! does not drive the host runtime. Releasing native resources there would
//! report the freed memory from the wrong thread and race with host code.
//!
//! ## Solution
//!
//! Collector threads hand the wrapper to a [`Finalizer`]. The wrapper is
//! dropped, releasing its view, handle and charge in that order, the next
//! time the host thread takes a lock (see [`Bridge::lock`](crate::Bridge::lock)).
//!
//! ## Usage
//!
//! ```ignore
//! let finalizer = bridge.finalizer();
//!
//! // From a collector thread
//! finalizer.defer(surface);
//!
//! // On the host thread
//! let _lock = bridge.lock(sink);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type DeferredWrapper = Box<dyn Send>;

/// Thread-safe queue of wrappers awaiting finalization on the host thread.
pub struct DeferredFinalizationQueue {
    queue: Mutex<VecDeque<DeferredWrapper>>,

    /// Fast check for pending items (avoids lock acquisition on hot path)
    pending_count: AtomicU64,
}

impl Default for DeferredFinalizationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredFinalizationQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(8)),
            pending_count: AtomicU64::new(0),
        }
    }

    /// Queue `wrapper` to be dropped by the next [`process_all`](Self::process_all).
    pub fn defer<T: Send + 'static>(&self, wrapper: T) {
        self.queue
            .lock()
            .expect("deferred finalization queue poisoned")
            .push_back(Box::new(wrapper));
        self.pending_count.fetch_add(1, Ordering::Release);

        tracing::trace!("Deferred wrapper finalization (pending: {})", self.len());
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending_count.load(Ordering::Acquire) > 0
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.pending_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }

    /// Finalize every queued wrapper on the calling thread.
    ///
    /// Returns the number of wrappers finalized.
    pub fn process_all(&self) -> usize {
        if !self.has_pending() {
            return 0;
        }

        let wrappers: VecDeque<DeferredWrapper> = {
            let mut queue = self
                .queue
                .lock()
                .expect("deferred finalization queue poisoned");
            std::mem::take(&mut *queue)
        };

        let count = wrappers.len();
        if count == 0 {
            return 0;
        }

        // Dropping outside the queue lock: a wrapper may defer another one.
        drop(wrappers);

        self.pending_count.fetch_sub(count as u64, Ordering::Release);

        tracing::trace!("Processed {} deferred wrapper finalizations", count);
        count
    }
}

impl std::fmt::Debug for DeferredFinalizationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredFinalizationQueue")
            .field("pending_count", &self.len())
            .finish()
    }
}

/// Cloneable entry point for collector threads.
#[derive(Clone, Debug)]
pub struct Finalizer {
    queue: Arc<DeferredFinalizationQueue>,
}

impl Finalizer {
    pub(crate) fn new(queue: Arc<DeferredFinalizationQueue>) -> Self {
        Self { queue }
    }

    /// Hand over an unreachable wrapper.
    pub fn defer<T: Send + 'static>(&self, wrapper: T) {
        self.queue.defer(wrapper);
    }

    pub fn pending(&self) -> u64 {
        self.queue.len()
    }
}

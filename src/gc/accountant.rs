//! Bytes the host collector should treat as external to its heap.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use super::ExternalMemoryGuard;
use super::host_lock::forward_to_current_lock;
use crate::error::{BridgeError, Result};
use crate::native::Status;

/// Counter of externally allocated bytes attributed to native resources.
///
/// Only [`ExternalMemoryGuard`]s move the counter, so every charge is paired
/// with exactly one release. Changes are forwarded to the host's external
/// memory sink while a [`HostLock`](super::HostLock) is held on the calling
/// thread, and accumulated in a pending delta otherwise.
pub struct MemoryAccountant {
    charged: AtomicU64,

    /// Net change not yet reported to the host
    pending: AtomicI64,

    limit: Option<u64>,
}

impl MemoryAccountant {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            charged: AtomicU64::new(0),
            pending: AtomicI64::new(0),
            limit,
        }
    }

    /// Bytes currently charged.
    pub fn charged(&self) -> u64 {
        self.charged.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Net change waiting for the next host lock.
    pub fn pending_delta(&self) -> i64 {
        self.pending.load(Ordering::Acquire)
    }

    /// Charge `bytes`, returning the guard that releases them.
    ///
    /// Fails without side effects when the charge would exceed the limit.
    pub(crate) fn try_charge(self: &Arc<Self>, bytes: u64) -> Result<ExternalMemoryGuard> {
        let limit = self.limit.unwrap_or(u64::MAX);

        self.charged
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(bytes).filter(|total| *total <= limit)
            })
            .map_err(|current| {
                tracing::debug!(
                    "External memory charge of {} bytes refused ({} charged, limit {})",
                    bytes,
                    current,
                    limit
                );
                BridgeError::Allocation(Status::NoMemory)
            })?;

        self.forward(bytes as i64);
        Ok(ExternalMemoryGuard::new(Arc::clone(self), bytes))
    }

    /// Undo a charge. Called only from [`ExternalMemoryGuard`]'s drop.
    pub(super) fn release(&self, bytes: u64) {
        let result = self.charged.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            current.checked_sub(bytes)
        });

        if let Err(current) = result {
            tracing::warn!(
                "External memory release of {} bytes exceeds the {} bytes charged",
                bytes,
                current
            );
            self.charged.store(0, Ordering::Release);
            self.forward(-(current as i64));
            return;
        }

        self.forward(-(bytes as i64));
    }

    fn forward(&self, delta: i64) {
        if delta == 0 || forward_to_current_lock(self, delta) {
            return;
        }

        self.pending.fetch_add(delta, Ordering::AcqRel);
        log::trace!("Deferred external memory adjustment: {} bytes", delta);
    }

    /// Take the pending delta, leaving zero behind.
    pub(super) fn take_pending(&self) -> i64 {
        self.pending.swap(0, Ordering::AcqRel)
    }
}

impl Default for MemoryAccountant {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for MemoryAccountant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAccountant")
            .field("charged", &self.charged())
            .field("pending", &self.pending_delta())
            .field("limit", &self.limit)
            .finish()
    }
}

//! External memory accounting and deferred finalization.
//!
//! Native pixel buffers live outside the host collector's heap. This module
//! keeps the collector informed about them and gives collector threads a safe
//! way to hand unreachable wrappers back to the host thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  HostLock (RAII)                                            │
//! │  ├── Registers the host's ExternalMemorySink per thread     │
//! │  ├── Applies the pending delta on construction              │
//! │  └── Restores the outer lock on drop                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  DeferredFinalizationQueue / Finalizer                      │
//! │  ├── Wrappers queued from collector threads                 │
//! │  └── Dropped on the host thread before the next lock        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  MemoryAccountant                                           │
//! │  ├── Atomic count of charged bytes, optional limit          │
//! │  ├── If lock held → forwarded to the sink                   │
//! │  └── If no lock → pending delta                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ExternalMemoryGuard (RAII)                                 │
//! │  └── One charge, released exactly once on drop              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod accountant;
mod deferred_finalization;
mod external_memory;
mod host_lock;
mod traceable;

pub use accountant::MemoryAccountant;
pub use deferred_finalization::{DeferredFinalizationQueue, Finalizer};
pub use external_memory::ExternalMemoryGuard;
pub use host_lock::{ExternalMemorySink, HostLock};
pub use traceable::GcTraceable;

#[cfg(test)]
mod tests;

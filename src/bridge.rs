//! The bridge: configuration, memory accounting and deferred finalization
//! shared by every wrapper created through it.

use std::rc::Rc;
use std::sync::{Arc, OnceLock};

use crate::config::BridgeConfig;
use crate::gc::{
    DeferredFinalizationQueue, ExternalMemorySink, Finalizer, HostLock, MemoryAccountant,
};

/// Global bridge, configured by [`init_bridge`] or defaulted on first use.
static BRIDGE: OnceLock<Bridge> = OnceLock::new();

/// Configure the global bridge.
///
/// Must be called before the first [`Bridge::global`] access to take
/// effect. Returns `false` when the global bridge already exists.
pub fn init_bridge(config: BridgeConfig) -> bool {
    let max_dimension = config.max_dimension;
    let limit = config.max_external_memory;

    if BRIDGE.set(Bridge::new(config)).is_err() {
        log::warn!("Bridge already initialized");
        false
    } else {
        log::info!(
            "Bridge initialized: max_dimension={}, max_external_memory={:?}",
            max_dimension,
            limit
        );
        true
    }
}

pub struct Bridge {
    config: BridgeConfig,
    accountant: Arc<MemoryAccountant>,
    queue: Arc<DeferredFinalizationQueue>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            accountant: Arc::new(MemoryAccountant::new(config.max_external_memory)),
            queue: Arc::new(DeferredFinalizationQueue::new()),
            config,
        }
    }

    pub fn global() -> &'static Bridge {
        BRIDGE.get_or_init(|| Bridge::new(BridgeConfig::default()))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn accountant(&self) -> &Arc<MemoryAccountant> {
        &self.accountant
    }

    /// Handle for collector threads to queue unreachable wrappers.
    pub fn finalizer(&self) -> Finalizer {
        Finalizer::new(Arc::clone(&self.queue))
    }

    /// Enter the host on this thread.
    ///
    /// Wrappers queued by collector threads are dropped first, then the
    /// lock applies the accumulated external memory delta to `sink`.
    pub fn lock(&self, sink: Rc<dyn ExternalMemorySink>) -> HostLock {
        self.collect();
        HostLock::new(&self.accountant, sink)
    }

    /// Drop every queued wrapper now. Returns how many were dropped.
    pub fn collect(&self) -> usize {
        self.queue.process_all()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("accountant", &self.accountant)
            .field("pending_finalizations", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Format;
    use crate::surface::ImageSurface;

    #[test]
    fn test_finalizer_defers_drop_until_collect() {
        let bridge = Bridge::new(BridgeConfig::default());
        let surface = ImageSurface::new(&bridge, Format::A8, 4, 4).unwrap();
        let weak = surface.downgrade();
        let finalizer = bridge.finalizer();

        std::thread::spawn(move || finalizer.defer(surface))
            .join()
            .unwrap();

        assert!(weak.is_alive());
        assert_eq!(bridge.accountant().charged(), 16);
        assert_eq!(bridge.collect(), 1);
        assert!(!weak.is_alive());
        assert_eq!(bridge.accountant().charged(), 0);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(Bridge::global(), Bridge::global()));
    }
}

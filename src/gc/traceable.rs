//! GcTraceable trait for values holding memory the host collector cannot see.

/// Types that can report the external memory they keep alive.
///
/// For wrappers this is the byte length of their attached, charged pixel
/// view. Summed over every live wrapper it equals
/// [`MemoryAccountant::charged`](super::MemoryAccountant::charged).
///
/// # Example
///
/// ```ignore
/// use cairo_bridge_v8::gc::GcTraceable;
///
/// let total: usize = surfaces.iter().map(|s| s.external_memory_size()).sum();
/// assert_eq!(total as u64, bridge.accountant().charged());
/// ```
pub trait GcTraceable {
    /// Bytes of external memory attributed to this value.
    ///
    /// Shared storage is counted by exactly one owner.
    fn external_memory_size(&self) -> usize;
}

impl GcTraceable for bytes::Bytes {
    fn external_memory_size(&self) -> usize {
        self.len()
    }
}

impl<T: GcTraceable> GcTraceable for Option<T> {
    fn external_memory_size(&self) -> usize {
        self.as_ref().map(|v| v.external_memory_size()).unwrap_or(0)
    }
}

impl<T: GcTraceable> GcTraceable for [T] {
    fn external_memory_size(&self) -> usize {
        self.iter().map(|v| v.external_memory_size()).sum()
    }
}

impl<T: GcTraceable> GcTraceable for Vec<T> {
    fn external_memory_size(&self) -> usize {
        self.as_slice().external_memory_size()
    }
}

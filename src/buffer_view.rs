//! Zero-copy view over a surface's native pixel storage.
//!
//! A view is a capability: every access checks that it is still attached,
//! and the check and the access happen under the same lock. Detaching flips
//! the view exactly once, clears the stored base address and hands back the
//! external memory charge so the owner can release it after the native
//! handle.

use std::ptr::NonNull;
use std::sync::{Arc, RwLock};

use bytes::Bytes;

use crate::error::{BridgeError, Result};
use crate::gc::{ExternalMemoryGuard, GcTraceable};
use crate::handle::engine_lock;

enum ViewState {
    Attached {
        base: NonNull<u8>,
        /// `None` when the view is not counted by an accountant
        charge: Option<ExternalMemoryGuard>,
    },
    Detached,
}

struct ViewCell {
    len: usize,
    state: RwLock<ViewState>,
}

// SAFETY: `base` is only dereferenced while the state is `Attached`, under
// both the engine lock and a read lock on `state`. Detaching takes the write
// lock, so no access can overlap the transition.
unsafe impl Send for ViewCell {}
unsafe impl Sync for ViewCell {}

/// Shared view over native memory. Clones observe the same state.
#[derive(Clone)]
pub struct BufferView {
    cell: Arc<ViewCell>,
}

impl BufferView {
    /// # Safety
    /// `base` points to `len` bytes that stay valid until [`detach`](Self::detach)
    /// is called, and that are only accessed under the engine lock.
    pub(crate) unsafe fn attach(
        base: NonNull<u8>,
        len: usize,
        charge: Option<ExternalMemoryGuard>,
    ) -> Self {
        Self {
            cell: Arc::new(ViewCell {
                len,
                state: RwLock::new(ViewState::Attached { base, charge }),
            }),
        }
    }

    /// Length in bytes. Unchanged by detachment.
    pub fn len(&self) -> usize {
        self.cell.len
    }

    pub fn is_empty(&self) -> bool {
        self.cell.len == 0
    }

    pub fn is_detached(&self) -> bool {
        matches!(
            *self.cell.state.read().expect("buffer view lock poisoned"),
            ViewState::Detached
        )
    }

    /// Whether both views are the same view (not merely equal bytes).
    pub fn ptr_eq(&self, other: &BufferView) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    fn check_range(&self, offset: usize, count: usize) -> Result<()> {
        match offset.checked_add(count) {
            Some(end) if end <= self.cell.len => Ok(()),
            _ => Err(BridgeError::Range(format!(
                "range {}..{} is outside the {} byte view",
                offset,
                offset.saturating_add(count),
                self.cell.len
            ))),
        }
    }

    /// Run `access` on the base address if the view is still attached.
    fn with_base<R>(&self, access: impl FnOnce(NonNull<u8>) -> R) -> Result<R> {
        let _engine = engine_lock();
        let state = self.cell.state.read().expect("buffer view lock poisoned");

        match &*state {
            ViewState::Attached { base, .. } => Ok(access(*base)),
            ViewState::Detached => Err(BridgeError::Detached("buffer view")),
        }
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    pub fn read(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.with_base(|base| {
            self.check_range(offset, dst.len())?;
            // SAFETY: attached and in range.
            let src = unsafe { std::slice::from_raw_parts(base.as_ptr().add(offset), dst.len()) };
            dst.copy_from_slice(src);
            Ok(())
        })?
    }

    /// Copy `src` into the view starting at `offset`.
    pub fn write(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.with_base(|base| {
            self.check_range(offset, src.len())?;
            // SAFETY: attached and in range; the engine lock excludes every
            // other access to the pixels.
            let dst =
                unsafe { std::slice::from_raw_parts_mut(base.as_ptr().add(offset), src.len()) };
            dst.copy_from_slice(src);
            Ok(())
        })?
    }

    pub fn get(&self, index: usize) -> Result<u8> {
        let mut byte = [0u8];
        self.read(index, &mut byte)?;
        Ok(byte[0])
    }

    pub fn set(&self, index: usize, value: u8) -> Result<()> {
        self.write(index, &[value])
    }

    /// Set every byte to `value`.
    pub fn fill(&self, value: u8) -> Result<()> {
        self.with_base(|base| {
            // SAFETY: attached; covers exactly the view.
            unsafe { std::ptr::write_bytes(base.as_ptr(), value, self.cell.len) };
        })
    }

    /// Copy of the current contents.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut copy = vec![0u8; self.cell.len];
        self.read(0, &mut copy)?;
        Ok(Bytes::from(copy))
    }

    /// Base address for hosts that expose the memory directly.
    pub(crate) fn base_ptr(&self) -> Result<NonNull<u8>> {
        let state = self.cell.state.read().expect("buffer view lock poisoned");
        match &*state {
            ViewState::Attached { base, .. } => Ok(*base),
            ViewState::Detached => Err(BridgeError::Detached("buffer view")),
        }
    }

    /// Invalidate the view and return its charge, if it still had one.
    ///
    /// Only the first call does anything.
    pub(crate) fn detach(&self) -> Option<ExternalMemoryGuard> {
        let mut state = self.cell.state.write().expect("buffer view lock poisoned");

        match std::mem::replace(&mut *state, ViewState::Detached) {
            ViewState::Attached { charge, .. } => {
                tracing::trace!("Detached {} byte buffer view", self.cell.len);
                charge
            }
            ViewState::Detached => None,
        }
    }
}

impl GcTraceable for BufferView {
    fn external_memory_size(&self) -> usize {
        match &*self.cell.state.read().expect("buffer view lock poisoned") {
            ViewState::Attached { charge: Some(charge), .. } => charge.amount() as usize,
            _ => 0,
        }
    }
}

impl std::fmt::Debug for BufferView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferView")
            .field("len", &self.cell.len)
            .field("detached", &self.is_detached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn view_over(storage: &mut [u8]) -> BufferView {
        let base = NonNull::new(storage.as_mut_ptr()).unwrap();
        unsafe { BufferView::attach(base, storage.len(), None) }
    }

    #[test]
    fn test_read_and_write_go_through_to_storage() {
        let mut storage = vec![0u8; 8];
        let view = view_over(&mut storage);

        view.write(2, &[1, 2, 3]).unwrap();
        assert_eq!(view.get(3).unwrap(), 2);
        assert_eq!(&view.to_bytes().unwrap()[..], &[0, 0, 1, 2, 3, 0, 0, 0]);

        view.detach();
        assert_eq!(storage, vec![0, 0, 1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_range_access_is_rejected() {
        let mut storage = vec![0u8; 4];
        let view = view_over(&mut storage);

        let err = view.write(3, &[1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(view.get(4).is_err());
        assert!(view.read(usize::MAX, &mut [0u8; 2]).is_err());
        view.detach();
    }

    #[test]
    fn test_detach_is_terminal_and_shared_by_clones() {
        let mut storage = vec![7u8; 4];
        let view = view_over(&mut storage);
        let clone = view.clone();

        assert!(view.detach().is_none());
        assert!(clone.is_detached());
        assert_eq!(clone.len(), 4);

        for _ in 0..3 {
            assert_eq!(clone.get(0).unwrap_err(), BridgeError::Detached("buffer view"));
            assert_eq!(view.fill(0).unwrap_err().kind(), ErrorKind::Detached);
        }
        assert!(view.detach().is_none());
        assert!(view.ptr_eq(&clone));
    }
}

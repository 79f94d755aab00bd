//! Image surface wrapper.

use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::bridge::Bridge;
use crate::buffer_view::BufferView;
use crate::config::Materialization;
use crate::error::{BridgeError, Result};
use crate::gc::{ExternalMemoryGuard, GcTraceable, MemoryAccountant};
use crate::handle::SurfaceHandle;
use crate::native::{Format, Status, ffi};

struct SurfaceState {
    handle: Option<SurfaceHandle>,
    /// Cached once materialized so every request returns the same view.
    view: Option<BufferView>,
    /// Set by `finish`, after which the engine no longer owns pixels.
    finished: bool,
}

impl SurfaceState {
    /// Detach the view, release the handle, then release the charge.
    fn release(&mut self) {
        let charge: Option<ExternalMemoryGuard> = self.view.take().and_then(|view| view.detach());
        let handle = self.handle.take();
        let released = handle.is_some();

        drop(handle);
        drop(charge);

        if released {
            tracing::debug!("Finalized image surface");
        }
    }
}

struct SurfaceInner {
    state: Mutex<SurfaceState>,
    accountant: Arc<MemoryAccountant>,
    materialization: Materialization,
    format: Format,
    width: i32,
    height: i32,
    stride: i32,
}

impl Drop for SurfaceInner {
    fn drop(&mut self) {
        self.state
            .get_mut()
            .expect("surface state poisoned")
            .release();
    }
}

/// Host-visible image surface.
///
/// Clones share the surface. The native resource is released when the last
/// clone is dropped, or earlier by [`dispose`](Self::dispose).
#[derive(Clone)]
pub struct ImageSurface {
    inner: Arc<SurfaceInner>,
}

impl ImageSurface {
    /// Construct a zero-filled surface.
    ///
    /// Dimensions are validated before anything is allocated; a failure
    /// leaves no handle behind and the accountant untouched.
    pub fn new(bridge: &Bridge, format: Format, width: i32, height: i32) -> Result<Self> {
        let max = bridge.config().max_dimension;
        for (name, value) in [("width", width), ("height", height)] {
            if !(0..=max).contains(&value) {
                return Err(BridgeError::Range(format!(
                    "`{name}` must be between 0 and {max}, got {value}"
                )));
            }
        }

        let raw_format = format.as_raw();
        // SAFETY: the constructor returns an owned reference.
        let handle = unsafe {
            SurfaceHandle::create(|| ffi::cairo_image_surface_create(raw_format, width, height))
        }?;
        let stride = handle.query(|s| unsafe { ffi::cairo_image_surface_get_stride(s) });

        let surface = Self {
            inner: Arc::new(SurfaceInner {
                state: Mutex::new(SurfaceState {
                    handle: Some(handle),
                    view: None,
                    finished: false,
                }),
                accountant: Arc::clone(bridge.accountant()),
                materialization: bridge.config().materialization,
                format,
                width,
                height,
                stride,
            }),
        };

        if surface.inner.materialization == Materialization::Eager {
            surface.data()?;
        }

        tracing::debug!(
            "Created {:?} image surface {}x{} ({} bytes)",
            format,
            width,
            height,
            surface.byte_length()
        );
        Ok(surface)
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.inner.state.lock().expect("surface state poisoned")
    }

    /// Run `f` with the live handle, or fail if the surface was released.
    pub(crate) fn with_handle<R>(
        &self,
        f: impl FnOnce(&SurfaceHandle) -> Result<R>,
    ) -> Result<R> {
        let state = self.lock();
        let handle = state.handle.as_ref().ok_or(BridgeError::Detached("Surface"))?;
        f(handle)
    }

    pub fn format(&self) -> Format {
        self.inner.format
    }

    pub fn width(&self) -> i32 {
        self.inner.width
    }

    pub fn height(&self) -> i32 {
        self.inner.height
    }

    pub fn stride(&self) -> i32 {
        self.inner.stride
    }

    /// `stride * height`
    pub fn byte_length(&self) -> usize {
        self.inner.stride as usize * self.inner.height as usize
    }

    /// The view over the pixels, created and charged on first request.
    ///
    /// Every call returns the same view. After [`finish`](Self::finish) it is
    /// detached.
    pub fn data(&self) -> Result<BufferView> {
        let mut state = self.lock();
        let handle = state.handle.as_ref().ok_or(BridgeError::Detached("Surface"))?;

        if let Some(view) = &state.view {
            return Ok(view.clone());
        }
        if state.finished {
            return Err(BridgeError::Operation(Status::SurfaceFinished));
        }

        let len = self.byte_length();
        let base = handle.query(|s| unsafe { ffi::cairo_image_surface_get_data(s) });
        // cairo allocates nothing for an empty surface.
        let base = match NonNull::new(base) {
            Some(base) => base,
            None if len == 0 => NonNull::dangling(),
            None => return Err(BridgeError::Operation(Status::NullPointer)),
        };

        let charge = self.inner.accountant.try_charge(len as u64)?;

        // SAFETY: the storage of a live, unfinished surface is stable, and the
        // view is detached before the handle is released or finished.
        let view = unsafe { BufferView::attach(base, len, Some(charge)) };
        state.view = Some(view.clone());
        Ok(view)
    }

    /// Complete pending drawing before host code reads the pixels.
    pub fn flush(&self) -> Result<()> {
        self.with_handle(|h| h.invoke(|s| unsafe { ffi::cairo_surface_flush(s) }))
    }

    /// Tell the engine host code changed the pixels.
    pub fn mark_dirty(&self) -> Result<()> {
        self.with_handle(|h| h.invoke(|s| unsafe { ffi::cairo_surface_mark_dirty(s) }))
    }

    pub fn mark_dirty_rectangle(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.with_handle(|h| {
            h.invoke(|s| unsafe { ffi::cairo_surface_mark_dirty_rectangle(s, x, y, width, height) })
        })
    }

    /// Release the pixel storage while keeping the surface object.
    ///
    /// The view is detached first and its charge released. The engine
    /// ignores later flushes and reports `SurfaceFinished` for later writes,
    /// and `data` fails from then on.
    pub fn finish(&self) -> Result<()> {
        let charge = {
            let mut state = self.lock();
            let handle = state.handle.as_ref().ok_or(BridgeError::Detached("Surface"))?;

            let charge = state.view.as_ref().and_then(BufferView::detach);
            handle.invoke(|s| unsafe { ffi::cairo_surface_finish(s) })?;
            state.finished = true;
            charge
        };

        drop(charge);
        Ok(())
    }

    pub fn status(&self) -> Result<Status> {
        self.with_handle(|h| Ok(h.status()))
    }

    /// Native references on the surface, including those held by patterns
    /// and contexts.
    pub fn reference_count(&self) -> Result<usize> {
        self.with_handle(|h| Ok(h.reference_count()))
    }

    /// Release the native surface now. Idempotent; the last drop is then a
    /// no-op.
    pub fn dispose(&self) {
        self.lock().release();
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().handle.is_none()
    }

    pub fn downgrade(&self) -> WeakSurface {
        WeakSurface {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both values are the same wrapper.
    pub fn ptr_eq(&self, other: &ImageSurface) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl GcTraceable for ImageSurface {
    fn external_memory_size(&self) -> usize {
        self.lock().view.external_memory_size()
    }
}

impl std::fmt::Debug for ImageSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSurface")
            .field("format", &self.inner.format)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("stride", &self.inner.stride)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Non-owning observer of an [`ImageSurface`].
#[derive(Clone, Debug)]
pub struct WeakSurface {
    inner: Weak<SurfaceInner>,
}

impl WeakSurface {
    pub fn upgrade(&self) -> Option<ImageSurface> {
        self.inner.upgrade().map(|inner| ImageSurface { inner })
    }

    /// Whether any owner (host reference or pattern) still holds the surface.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::error::ErrorKind;

    #[test]
    fn test_eager_view_is_charged_at_construction() {
        let bridge = Bridge::new(BridgeConfig::default());
        let surface = ImageSurface::new(&bridge, Format::A8, 10, 3).unwrap();

        assert_eq!(surface.stride(), 12);
        assert_eq!(bridge.accountant().charged(), 36);
        assert_eq!(surface.external_memory_size(), 36);
        assert!(surface.data().unwrap().ptr_eq(&surface.data().unwrap()));
    }

    #[test]
    fn test_lazy_view_is_charged_on_first_request() {
        let config = BridgeConfig::default().with_materialization(Materialization::Lazy);
        let bridge = Bridge::new(config);
        let surface = ImageSurface::new(&bridge, Format::Argb32, 4, 4).unwrap();

        assert_eq!(bridge.accountant().charged(), 0);
        let view = surface.data().unwrap();
        assert_eq!(view.len(), 64);
        assert_eq!(bridge.accountant().charged(), 64);
    }

    #[test]
    fn test_dimensions_are_validated_first() {
        let bridge = Bridge::new(BridgeConfig::default().with_max_dimension(100));

        let err = ImageSurface::new(&bridge, Format::Argb32, 101, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = ImageSurface::new(&bridge, Format::Argb32, 1, -1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(bridge.accountant().charged(), 0);
    }

    #[test]
    fn test_lazy_data_after_finish_fails() {
        let config = BridgeConfig::default().with_materialization(Materialization::Lazy);
        let bridge = Bridge::new(config);
        let surface = ImageSurface::new(&bridge, Format::Rgb24, 2, 2).unwrap();

        surface.finish().unwrap();
        assert_eq!(
            surface.data().unwrap_err(),
            BridgeError::Operation(Status::SurfaceFinished)
        );
        assert_eq!(bridge.accountant().charged(), 0);
    }
}

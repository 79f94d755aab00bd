//! Owning handles over native engine objects.
//!
//! A [`NativeHandle`] owns exactly one reference on a native object. The
//! object itself is freed by the engine once every reference is gone, so
//! handles can be created for the same object independently (for example a
//! surface referenced both by its wrapper and by a pattern painting from it).
//!
//! The engine is not thread-safe. Every call into it goes through
//! [`engine_lock`], which is uncontended in the usual single host thread.

use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard};

use crate::error::{BridgeError, Result};
use crate::native::{Status, cairo_pattern_t, cairo_surface_t, cairo_t, ffi};

static ENGINE: Mutex<()> = Mutex::new(());

/// Serializes access to the native engine and to the pixel memory it owns.
pub(crate) fn engine_lock() -> MutexGuard<'static, ()> {
    ENGINE.lock().expect("native engine lock poisoned")
}

/// Reference counting contract of a native object type.
///
/// # Safety
///
/// Implementations must forward to the engine functions of the matching type,
/// which accept any pointer produced by that type's constructors and not yet
/// fully destroyed.
pub unsafe trait NativeResource {
    /// Name used in logs and detached-resource errors
    const KIND: &'static str;

    unsafe fn reference(ptr: *mut Self) -> *mut Self;
    unsafe fn destroy(ptr: *mut Self);
    unsafe fn status(ptr: *mut Self) -> Status;
    unsafe fn reference_count(ptr: *mut Self) -> usize;
}

macro_rules! native_resource {
    ($raw:ty, $kind:literal, $reference:ident, $destroy:ident, $status:ident, $count:ident) => {
        unsafe impl NativeResource for $raw {
            const KIND: &'static str = $kind;

            unsafe fn reference(ptr: *mut Self) -> *mut Self {
                unsafe { ffi::$reference(ptr) }
            }

            unsafe fn destroy(ptr: *mut Self) {
                unsafe { ffi::$destroy(ptr) }
            }

            unsafe fn status(ptr: *mut Self) -> Status {
                Status::from_engine(unsafe { ffi::$status(ptr) })
            }

            unsafe fn reference_count(ptr: *mut Self) -> usize {
                unsafe { ffi::$count(ptr) as usize }
            }
        }
    };
}

native_resource!(
    cairo_surface_t,
    "Surface",
    cairo_surface_reference,
    cairo_surface_destroy,
    cairo_surface_status,
    cairo_surface_get_reference_count
);
native_resource!(
    cairo_pattern_t,
    "Pattern",
    cairo_pattern_reference,
    cairo_pattern_destroy,
    cairo_pattern_status,
    cairo_pattern_get_reference_count
);
native_resource!(
    cairo_t,
    "Context",
    cairo_reference,
    cairo_destroy,
    cairo_status,
    cairo_get_reference_count
);

pub type SurfaceHandle = NativeHandle<cairo_surface_t>;
pub type PatternHandle = NativeHandle<cairo_pattern_t>;
pub type ContextHandle = NativeHandle<cairo_t>;

/// One owned reference on a native object. Dropping it is `release`.
pub struct NativeHandle<T: NativeResource> {
    ptr: NonNull<T>,
}

// SAFETY: the engine's reference counts are atomic, and every access through
// the pointer happens under `engine_lock`.
unsafe impl<T: NativeResource> Send for NativeHandle<T> {}
unsafe impl<T: NativeResource> Sync for NativeHandle<T> {}

impl<T: NativeResource> NativeHandle<T> {
    /// Run a native constructor and take over the reference it returns.
    ///
    /// A non-success status is an allocation failure: the object is
    /// destroyed here and never exposed.
    ///
    /// # Safety
    /// `constructor` returns null or a pointer carrying one reference the
    /// caller owns.
    pub(crate) unsafe fn create(constructor: impl FnOnce() -> *mut T) -> Result<Self> {
        let _engine = engine_lock();

        let Some(ptr) = NonNull::new(constructor()) else {
            return Err(BridgeError::Allocation(Status::NullPointer));
        };

        let status = unsafe { T::status(ptr.as_ptr()) };
        if !status.is_success() {
            unsafe { T::destroy(ptr.as_ptr()) };
            tracing::debug!("{} creation failed: {}", T::KIND, status);
            return Err(BridgeError::Allocation(status));
        }

        tracing::trace!("Created native {} {:p}", T::KIND, ptr);
        Ok(Self { ptr })
    }

    /// Take a new reference on an object the engine already owns.
    ///
    /// # Safety
    /// `ptr` is null or a live object of this type.
    pub(crate) unsafe fn acquire(ptr: *mut T) -> Result<Self> {
        let _engine = engine_lock();

        let Some(ptr) = NonNull::new(ptr) else {
            return Err(BridgeError::Operation(Status::NullPointer));
        };

        let status = unsafe { T::status(ptr.as_ptr()) };
        if !status.is_success() {
            return Err(BridgeError::Operation(status));
        }

        unsafe { T::reference(ptr.as_ptr()) };
        Ok(Self { ptr })
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub fn status(&self) -> Status {
        let _engine = engine_lock();
        // SAFETY: the handle owns a reference, so the object is live.
        unsafe { T::status(self.ptr.as_ptr()) }
    }

    /// `Err(Operation)` carrying the current status unless it is success.
    pub fn check(&self) -> Result<()> {
        match self.status() {
            Status::Success => Ok(()),
            status => Err(BridgeError::Operation(status)),
        }
    }

    /// Fire and check: run `call`, then surface a non-success status.
    ///
    /// The closure runs under the engine lock and receives the live pointer.
    /// It must not call back into the bridge.
    pub fn invoke<R>(&self, call: impl FnOnce(*mut T) -> R) -> Result<R> {
        let _engine = engine_lock();
        let ptr = self.ptr.as_ptr();
        let result = call(ptr);

        // SAFETY: the handle owns a reference, so the object is live.
        match unsafe { T::status(ptr) } {
            Status::Success => Ok(result),
            status => Err(BridgeError::Operation(status)),
        }
    }

    /// Run a read-only `call` without the status check.
    pub fn query<R>(&self, call: impl FnOnce(*mut T) -> R) -> R {
        let _engine = engine_lock();
        call(self.ptr.as_ptr())
    }

    pub fn reference_count(&self) -> usize {
        let _engine = engine_lock();
        // SAFETY: the handle owns a reference, so the object is live.
        unsafe { T::reference_count(self.ptr.as_ptr()) }
    }
}

impl<T: NativeResource> Drop for NativeHandle<T> {
    fn drop(&mut self) {
        let _engine = engine_lock();
        tracing::trace!("Released native {} {:p}", T::KIND, self.ptr);
        // SAFETY: this handle owns exactly one reference and drops it once.
        unsafe { T::destroy(self.ptr.as_ptr()) };
    }
}

impl<T: NativeResource> std::fmt::Debug for NativeHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &T::KIND)
            .field("ptr", &self.ptr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::native::Format;

    fn image(format: Format, width: i32, height: i32) -> *mut cairo_surface_t {
        unsafe { ffi::cairo_image_surface_create(format.as_raw(), width, height) }
    }

    #[test]
    fn test_create_failure_is_allocation_error() {
        let err = unsafe { SurfaceHandle::create(|| image(Format::Argb32, -1, 1)) }.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
        assert_eq!(err.status(), Some(Status::InvalidSize));
    }

    #[test]
    fn test_acquire_shares_the_object() {
        let first = unsafe { SurfaceHandle::create(|| image(Format::A8, 8, 8)) }.unwrap();
        let second = unsafe { SurfaceHandle::acquire(first.as_ptr()) }.unwrap();

        assert_eq!(first.as_ptr(), second.as_ptr());
        assert_eq!(first.reference_count(), 2);
        drop(first);
        assert_eq!(second.reference_count(), 1);
    }

    #[test]
    fn test_invoke_reports_status_after_the_call() {
        let handle = unsafe { SurfaceHandle::create(|| image(Format::Rgb24, 2, 2)) }.unwrap();

        assert!(handle.invoke(|s| unsafe { ffi::cairo_surface_mark_dirty(s) }).is_ok());
        handle.query(|s| unsafe { ffi::cairo_surface_finish(s) });

        let err = handle.invoke(|s| unsafe { ffi::cairo_surface_mark_dirty(s) }).unwrap_err();
        assert_eq!(err, BridgeError::Operation(Status::SurfaceFinished));
        // Sticky: the next check fails as well.
        assert!(handle.check().is_err());
    }
}

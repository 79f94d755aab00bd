//! Pattern wrapper.
//!
//! Patterns have no public constructor: they come from the `create_*`
//! factories, or from a context's current source.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{BridgeError, Result};
use crate::handle::PatternHandle;
use crate::native::{
    ColorStop, Extend, Filter, Matrix, PatternType, Status, cairo_pattern_t, ffi,
};
use crate::surface::ImageSurface;

struct PatternState {
    handle: Option<PatternHandle>,
    /// Back-reference to the surface a surface pattern paints from. Keeps
    /// the surface wrapper alive for as long as this pattern is.
    surface: Option<ImageSurface>,
}

struct PatternInner {
    state: Mutex<PatternState>,
}

impl Drop for PatternInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().expect("pattern state poisoned");
        if state.handle.take().is_some() {
            tracing::debug!("Finalized pattern");
        }
        // Dropped last: may finalize the surface.
        state.surface.take();
    }
}

/// Getter status: cairo reports type mismatches and bad indices through the
/// return value without touching the pattern's own status.
fn checked(status: ffi::cairo_status_t) -> std::result::Result<(), Status> {
    match Status::from_engine(status) {
        Status::Success => Ok(()),
        status => Err(status),
    }
}

/// Host-visible paint source.
#[derive(Clone)]
pub struct Pattern {
    inner: Arc<PatternInner>,
}

impl Pattern {
    fn from_handle(handle: PatternHandle, surface: Option<ImageSurface>) -> Self {
        Self {
            inner: Arc::new(PatternInner {
                state: Mutex::new(PatternState {
                    handle: Some(handle),
                    surface,
                }),
            }),
        }
    }

    /// Wrap a pattern the engine already owns, taking a reference on it.
    ///
    /// # Safety
    /// `ptr` is null or a live pattern.
    pub(crate) unsafe fn acquire(
        ptr: *mut cairo_pattern_t,
        surface: Option<ImageSurface>,
    ) -> Result<Self> {
        let handle = unsafe { PatternHandle::acquire(ptr) }?;
        Ok(Self::from_handle(handle, surface))
    }

    fn create(constructor: impl FnOnce() -> *mut cairo_pattern_t) -> Result<Self> {
        // SAFETY: every `cairo_pattern_create_*` returns an owned reference.
        let handle = unsafe { PatternHandle::create(constructor) }?;
        Ok(Self::from_handle(handle, None))
    }

    /// Opaque solid color. Components are clamped to `[0, 1]`.
    pub fn create_rgb(red: f64, green: f64, blue: f64) -> Result<Self> {
        Self::create(|| unsafe { ffi::cairo_pattern_create_rgb(red, green, blue) })
    }

    pub fn create_rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Result<Self> {
        Self::create(|| unsafe { ffi::cairo_pattern_create_rgba(red, green, blue, alpha) })
    }

    /// Linear gradient along `(x0, y0) -> (x1, y1)`, without color stops.
    pub fn create_linear(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self> {
        Self::create(|| unsafe { ffi::cairo_pattern_create_linear(x0, y0, x1, y1) })
    }

    /// Radial gradient between two circles, without color stops.
    pub fn create_radial(
        cx0: f64,
        cy0: f64,
        radius0: f64,
        cx1: f64,
        cy1: f64,
        radius1: f64,
    ) -> Result<Self> {
        Self::create(|| unsafe {
            ffi::cairo_pattern_create_radial(cx0, cy0, radius0, cx1, cy1, radius1)
        })
    }

    /// Pattern painting from `surface`.
    ///
    /// The pattern holds `surface` strongly: it stays usable even when every
    /// other reference to it is gone.
    pub fn create_for_surface(surface: &ImageSurface) -> Result<Self> {
        let handle = surface.with_handle(|s| {
            let target = s.as_ptr();
            // SAFETY: `target` is live while the surface handle is borrowed.
            unsafe { PatternHandle::create(|| ffi::cairo_pattern_create_for_surface(target)) }
        })?;

        Ok(Self::from_handle(handle, Some(surface.clone())))
    }

    fn lock(&self) -> MutexGuard<'_, PatternState> {
        self.inner.state.lock().expect("pattern state poisoned")
    }

    pub(crate) fn with_handle<R>(
        &self,
        f: impl FnOnce(&PatternHandle) -> Result<R>,
    ) -> Result<R> {
        let state = self.lock();
        let handle = state.handle.as_ref().ok_or(BridgeError::Detached("Pattern"))?;
        f(handle)
    }

    /// Getter returning a status instead of setting one.
    fn get<R>(
        &self,
        getter: impl FnOnce(*mut cairo_pattern_t) -> std::result::Result<R, Status>,
    ) -> Result<R> {
        self.with_handle(|h| h.query(getter).map_err(BridgeError::Operation))
    }

    pub fn add_color_stop_rgb(&self, offset: f64, red: f64, green: f64, blue: f64) -> Result<()> {
        self.with_handle(|h| {
            h.invoke(|p| unsafe {
                ffi::cairo_pattern_add_color_stop_rgb(p, offset, red, green, blue)
            })
        })
    }

    pub fn add_color_stop_rgba(
        &self,
        offset: f64,
        red: f64,
        green: f64,
        blue: f64,
        alpha: f64,
    ) -> Result<()> {
        self.with_handle(|h| {
            h.invoke(|p| unsafe {
                ffi::cairo_pattern_add_color_stop_rgba(p, offset, red, green, blue, alpha)
            })
        })
    }

    pub fn color_stop_count(&self) -> Result<usize> {
        self.get(|p| {
            let mut count = 0;
            checked(unsafe { ffi::cairo_pattern_get_color_stop_count(p, &mut count) })?;
            Ok(count as usize)
        })
    }

    pub fn color_stop_rgba(&self, index: i32) -> Result<ColorStop> {
        self.get(|p| {
            let [mut offset, mut red, mut green, mut blue, mut alpha] = [0.0; 5];
            checked(unsafe {
                ffi::cairo_pattern_get_color_stop_rgba(
                    p,
                    index,
                    &mut offset,
                    &mut red,
                    &mut green,
                    &mut blue,
                    &mut alpha,
                )
            })?;
            Ok(ColorStop {
                offset,
                red,
                green,
                blue,
                alpha,
            })
        })
    }

    /// `[red, green, blue, alpha]` of a solid pattern.
    pub fn rgba(&self) -> Result<[f64; 4]> {
        self.get(|p| {
            let [mut r, mut g, mut b, mut a] = [0.0; 4];
            checked(unsafe { ffi::cairo_pattern_get_rgba(p, &mut r, &mut g, &mut b, &mut a) })?;
            Ok([r, g, b, a])
        })
    }

    /// The surface a surface pattern paints from.
    ///
    /// `None` for surface patterns obtained from a context whose source was
    /// not installed from a surface wrapper.
    pub fn surface(&self) -> Result<Option<ImageSurface>> {
        let state = self.lock();
        let handle = state.handle.as_ref().ok_or(BridgeError::Detached("Pattern"))?;
        handle
            .query(|p| {
                let mut surface = std::ptr::null_mut();
                checked(unsafe { ffi::cairo_pattern_get_surface(p, &mut surface) })
            })
            .map_err(BridgeError::Operation)?;
        Ok(state.surface.clone())
    }

    /// `[x0, y0, x1, y1]`
    pub fn linear_points(&self) -> Result<[f64; 4]> {
        self.get(|p| {
            let [mut x0, mut y0, mut x1, mut y1] = [0.0; 4];
            checked(unsafe {
                ffi::cairo_pattern_get_linear_points(p, &mut x0, &mut y0, &mut x1, &mut y1)
            })?;
            Ok([x0, y0, x1, y1])
        })
    }

    /// `[cx0, cy0, r0, cx1, cy1, r1]`
    pub fn radial_circles(&self) -> Result<[f64; 6]> {
        self.get(|p| {
            let mut c = [0.0; 6];
            let [x0, y0, r0, x1, y1, r1] = &mut c;
            checked(unsafe { ffi::cairo_pattern_get_radial_circles(p, x0, y0, r0, x1, y1, r1) })?;
            Ok(c)
        })
    }

    pub fn set_extend(&self, extend: Extend) -> Result<()> {
        self.with_handle(|h| {
            h.invoke(|p| unsafe { ffi::cairo_pattern_set_extend(p, extend.as_raw()) })
        })
    }

    pub fn extend(&self) -> Result<Extend> {
        self.get(|p| {
            let raw = unsafe { ffi::cairo_pattern_get_extend(p) };
            Extend::from_raw(raw).ok_or(Status::InvalidContent)
        })
    }

    pub fn set_filter(&self, filter: Filter) -> Result<()> {
        self.with_handle(|h| {
            h.invoke(|p| unsafe { ffi::cairo_pattern_set_filter(p, filter.as_raw()) })
        })
    }

    pub fn filter(&self) -> Result<Filter> {
        self.get(|p| {
            let raw = unsafe { ffi::cairo_pattern_get_filter(p) };
            Filter::from_raw(raw).ok_or(Status::InvalidContent)
        })
    }

    /// Map from user space to pattern space.
    pub(crate) fn set_matrix(&self, matrix: &Matrix) -> Result<()> {
        let raw = ffi::cairo_matrix_t::from(*matrix);
        self.with_handle(|h| h.invoke(|p| unsafe { ffi::cairo_pattern_set_matrix(p, &raw) }))
    }

    pub fn pattern_type(&self) -> Result<PatternType> {
        self.get(|p| {
            let raw = unsafe { ffi::cairo_pattern_get_type(p) };
            PatternType::from_raw(raw).ok_or(Status::PatternTypeMismatch)
        })
    }

    pub fn status(&self) -> Result<Status> {
        self.with_handle(|h| Ok(h.status()))
    }

    pub fn reference_count(&self) -> Result<usize> {
        self.with_handle(|h| Ok(h.reference_count()))
    }

    /// Release the native pattern and the surface back-reference now.
    /// Idempotent.
    pub fn dispose(&self) {
        let (handle, surface) = {
            let mut state = self.lock();
            (state.handle.take(), state.surface.take())
        };

        if handle.is_some() {
            tracing::debug!("Disposed pattern");
        }
        drop(handle);
        drop(surface);
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().handle.is_none()
    }

    pub fn ptr_eq(&self, other: &Pattern) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Pattern")
            .field("handle", &state.handle)
            .field("has_surface", &state.surface.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_solid_pattern_getters() {
        let p = Pattern::create_rgba(0.25, 0.5, 0.75, 1.0).unwrap();
        assert_eq!(p.rgba().unwrap(), [0.25, 0.5, 0.75, 1.0]);
        assert_eq!(p.pattern_type().unwrap(), PatternType::Solid);

        let err = p.linear_points().unwrap_err();
        assert_eq!(err, BridgeError::Operation(Status::PatternTypeMismatch));
        // Getter mismatches are not sticky.
        assert_eq!(p.status().unwrap(), Status::Success);
    }

    #[test]
    fn test_color_stop_on_solid_fails_after_the_call() {
        let p = Pattern::create_rgb(0.0, 0.0, 0.0).unwrap();
        let err = p.add_color_stop_rgb(0.0, 1.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert_eq!(p.status().unwrap(), Status::PatternTypeMismatch);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let p = Pattern::create_linear(0.0, 0.0, 1.0, 1.0).unwrap();
        p.dispose();
        p.dispose();
        assert!(p.is_disposed());
        assert_eq!(p.extend().unwrap_err(), BridgeError::Detached("Pattern"));
    }
}

//! Drawing context wrapper.
//!
//! Every method follows the same contract: run the native call, then check
//! the context's status and report a non-success status as
//! [`BridgeError::Operation`]. Context errors are sticky, so once a call has
//! failed every later call on the same context fails with the same status.
//! Getters report values without the status check.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{BridgeError, Result};
use crate::handle::ContextHandle;
use crate::native::{
    Antialias, FillRule, LineCap, LineJoin, Matrix, Operator, Status, cairo_t, ffi,
};
use crate::pattern::Pattern;
use crate::surface::ImageSurface;

/// `(x1, y1, x2, y2)` in user space.
pub type Extents = (f64, f64, f64, f64);

type ExtentsFn = unsafe extern "C" fn(*mut cairo_t, *mut f64, *mut f64, *mut f64, *mut f64);
type PointFn = unsafe extern "C" fn(*mut cairo_t, *mut f64, *mut f64);

struct ContextState {
    handle: Option<ContextHandle>,
    target: ImageSurface,
    /// Wrapper of the current source with its native address, so `source()`
    /// hands back the same wrapper. Dropped as soon as the native source
    /// changes.
    source: Option<(usize, Pattern)>,
}

impl ContextState {
    fn handle(&self) -> Result<&ContextHandle> {
        self.handle.as_ref().ok_or(BridgeError::Detached("Context"))
    }

    /// Take the cached source out unless it is still the native source.
    fn take_stale_source(&mut self) -> Option<Pattern> {
        let current = self
            .handle
            .as_ref()
            .map(|h| h.query(|cr| unsafe { ffi::cairo_get_source(cr) }) as usize);

        match &self.source {
            Some((addr, _)) if Some(*addr) != current => self.source.take().map(|(_, p)| p),
            _ => None,
        }
    }
}

struct ContextInner {
    state: Mutex<ContextState>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().expect("context state poisoned");
        if state.handle.take().is_some() {
            tracing::debug!("Finalized context");
        }
    }
}

/// Host-visible drawing context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Context drawing onto `target`. A finished target is an allocation
    /// failure.
    pub fn new(target: &ImageSurface) -> Result<Self> {
        let handle = target.with_handle(|s| {
            let surface = s.as_ptr();
            // SAFETY: `surface` is live while its handle is borrowed, and
            // `cairo_create` returns an owned reference.
            unsafe { ContextHandle::create(|| ffi::cairo_create(surface)) }
        })?;

        tracing::debug!("Created context");
        Ok(Self {
            inner: Arc::new(ContextInner {
                state: Mutex::new(ContextState {
                    handle: Some(handle),
                    target: target.clone(),
                    source: None,
                }),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.inner.state.lock().expect("context state poisoned")
    }

    /// Fire and check.
    fn call<R>(&self, f: impl FnOnce(*mut cairo_t) -> R) -> Result<R> {
        let state = self.lock();
        state.handle()?.invoke(f)
    }

    /// Fire and check a call that may change the source. A cached source
    /// that was replaced is released after the context lock.
    fn call_replacing_source(&self, f: impl FnOnce(*mut cairo_t)) -> Result<()> {
        let (result, stale) = {
            let mut state = self.lock();
            let result = state.handle()?.invoke(f);
            (result, state.take_stale_source())
        };

        drop(stale);
        result
    }

    /// Read without the status check.
    fn query<R>(&self, f: impl FnOnce(*mut cairo_t) -> R) -> Result<R> {
        let state = self.lock();
        Ok(state.handle()?.query(f))
    }

    fn query_enum<E>(
        &self,
        f: impl FnOnce(*mut cairo_t) -> i32,
        from_raw: fn(i32) -> Option<E>,
    ) -> Result<E> {
        let raw = self.query(f)?;
        from_raw(raw).ok_or(BridgeError::Operation(Status::InvalidStatus))
    }

    fn extents(&self, f: ExtentsFn) -> Result<Extents> {
        self.query(|cr| {
            let (mut x1, mut y1, mut x2, mut y2) = (0.0, 0.0, 0.0, 0.0);
            unsafe { f(cr, &mut x1, &mut y1, &mut x2, &mut y2) };
            (x1, y1, x2, y2)
        })
    }

    fn map_point(&self, f: PointFn, mut x: f64, mut y: f64) -> Result<(f64, f64)> {
        self.query(|cr| {
            unsafe { f(cr, &mut x, &mut y) };
            (x, y)
        })
    }

    pub fn target(&self) -> ImageSurface {
        self.lock().target.clone()
    }

    pub fn status(&self) -> Result<Status> {
        self.query(|cr| Status::from_engine(unsafe { ffi::cairo_status(cr) }))
    }

    pub fn reference_count(&self) -> Result<usize> {
        self.query(|cr| unsafe { ffi::cairo_get_reference_count(cr) } as usize)
    }

    /// Release the native context now. Idempotent.
    pub fn dispose(&self) {
        let (handle, source) = {
            let mut state = self.lock();
            (state.handle.take(), state.source.take())
        };
        drop(handle);
        drop(source);
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().handle.is_none()
    }

    // -- state stack --

    pub fn save(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_save(cr) })
    }

    /// Fails with `InvalidRestore` without a matching `save`.
    pub fn restore(&self) -> Result<()> {
        self.call_replacing_source(|cr| unsafe { ffi::cairo_restore(cr) })
    }

    // -- source --

    pub fn set_source_rgb(&self, red: f64, green: f64, blue: f64) -> Result<()> {
        self.call_replacing_source(|cr| unsafe { ffi::cairo_set_source_rgb(cr, red, green, blue) })
    }

    pub fn set_source_rgba(&self, red: f64, green: f64, blue: f64, alpha: f64) -> Result<()> {
        self.call_replacing_source(|cr| unsafe {
            ffi::cairo_set_source_rgba(cr, red, green, blue, alpha)
        })
    }

    pub fn set_source(&self, source: &Pattern) -> Result<()> {
        let stale = {
            let mut state = self.lock();
            let handle = state.handle()?;
            let ptr = source.with_handle(|p| {
                let ptr = p.as_ptr();
                handle.invoke(|cr| unsafe { ffi::cairo_set_source(cr, ptr) })?;
                Ok(ptr)
            })?;
            state.source.replace((ptr as usize, source.clone()))
        };

        drop(stale);
        Ok(())
    }

    /// Paint from `surface` with its origin at `(x, y)`. The installed source
    /// holds the surface like [`Pattern::create_for_surface`] does.
    pub fn set_source_surface(&self, surface: &ImageSurface, x: f64, y: f64) -> Result<()> {
        let source = Pattern::create_for_surface(surface)?;
        source.set_matrix(&Matrix::translation(-x, -y))?;
        self.set_source(&source)
    }

    /// The current source.
    ///
    /// Returns the wrapper installed through this context while it is still
    /// the source and not disposed, otherwise a new wrapper sharing the
    /// native pattern.
    pub fn source(&self) -> Result<Pattern> {
        let (pattern, stale) = {
            let mut state = self.lock();
            let ptr = state.handle()?.invoke(|cr| unsafe { ffi::cairo_get_source(cr) })?;

            if let Some((addr, cached)) = &state.source
                && *addr == ptr as usize
                && !cached.is_disposed()
            {
                return Ok(cached.clone());
            }

            // SAFETY: the context holds a reference on its source while locked.
            let pattern = unsafe { Pattern::acquire(ptr, None) }?;
            let stale = state.source.replace((ptr as usize, pattern.clone()));
            (pattern, stale)
        };

        drop(stale);
        Ok(pattern)
    }

    /// The wrapper [`source`](Self::source) currently hands back, if any.
    pub fn installed_source(&self) -> Option<Pattern> {
        self.lock().source.as_ref().map(|(_, pattern)| pattern.clone())
    }

    // -- rendering state --

    pub fn set_operator(&self, operator: Operator) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_operator(cr, operator.as_raw()) })
    }

    pub fn operator(&self) -> Result<Operator> {
        self.query_enum(|cr| unsafe { ffi::cairo_get_operator(cr) }, Operator::from_raw)
    }

    pub fn set_tolerance(&self, tolerance: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_tolerance(cr, tolerance) })
    }

    pub fn tolerance(&self) -> Result<f64> {
        self.query(|cr| unsafe { ffi::cairo_get_tolerance(cr) })
    }

    pub fn set_antialias(&self, antialias: Antialias) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_antialias(cr, antialias.as_raw()) })
    }

    pub fn antialias(&self) -> Result<Antialias> {
        self.query_enum(|cr| unsafe { ffi::cairo_get_antialias(cr) }, Antialias::from_raw)
    }

    pub fn set_fill_rule(&self, fill_rule: FillRule) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_fill_rule(cr, fill_rule.as_raw()) })
    }

    pub fn fill_rule(&self) -> Result<FillRule> {
        self.query_enum(|cr| unsafe { ffi::cairo_get_fill_rule(cr) }, FillRule::from_raw)
    }

    pub fn set_line_width(&self, width: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_line_width(cr, width) })
    }

    pub fn line_width(&self) -> Result<f64> {
        self.query(|cr| unsafe { ffi::cairo_get_line_width(cr) })
    }

    pub fn set_line_cap(&self, line_cap: LineCap) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_line_cap(cr, line_cap.as_raw()) })
    }

    pub fn line_cap(&self) -> Result<LineCap> {
        self.query_enum(|cr| unsafe { ffi::cairo_get_line_cap(cr) }, LineCap::from_raw)
    }

    pub fn set_line_join(&self, line_join: LineJoin) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_line_join(cr, line_join.as_raw()) })
    }

    pub fn line_join(&self) -> Result<LineJoin> {
        self.query_enum(|cr| unsafe { ffi::cairo_get_line_join(cr) }, LineJoin::from_raw)
    }

    pub fn set_miter_limit(&self, limit: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_set_miter_limit(cr, limit) })
    }

    pub fn miter_limit(&self) -> Result<f64> {
        self.query(|cr| unsafe { ffi::cairo_get_miter_limit(cr) })
    }

    /// Fails with `InvalidDash` for negative values or only zeros.
    pub fn set_dash(&self, dashes: &[f64], offset: f64) -> Result<()> {
        let count = i32::try_from(dashes.len())
            .map_err(|_| BridgeError::Range("Too many `dashes`".to_string()))?;
        self.call(|cr| unsafe { ffi::cairo_set_dash(cr, dashes.as_ptr(), count, offset) })
    }

    pub fn dash_count(&self) -> Result<usize> {
        self.query(|cr| unsafe { ffi::cairo_get_dash_count(cr) }.max(0) as usize)
    }

    /// Dash lengths and offset.
    pub fn dash(&self) -> Result<(Vec<f64>, f64)> {
        self.query(|cr| {
            let count = unsafe { ffi::cairo_get_dash_count(cr) }.max(0) as usize;
            let mut dashes = vec![0.0; count];
            let mut offset = 0.0;
            unsafe { ffi::cairo_get_dash(cr, dashes.as_mut_ptr(), &mut offset) };
            (dashes, offset)
        })
    }

    // -- paths --

    pub fn new_path(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_new_path(cr) })
    }

    pub fn new_sub_path(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_new_sub_path(cr) })
    }

    pub fn move_to(&self, x: f64, y: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_move_to(cr, x, y) })
    }

    pub fn line_to(&self, x: f64, y: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_line_to(cr, x, y) })
    }

    pub fn curve_to(&self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_curve_to(cr, x1, y1, x2, y2, x3, y3) })
    }

    /// Fails with `NoCurrentPoint` when there is no current point.
    pub fn rel_move_to(&self, dx: f64, dy: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_rel_move_to(cr, dx, dy) })
    }

    pub fn rel_line_to(&self, dx: f64, dy: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_rel_line_to(cr, dx, dy) })
    }

    pub fn rel_curve_to(
        &self,
        dx1: f64,
        dy1: f64,
        dx2: f64,
        dy2: f64,
        dx3: f64,
        dy3: f64,
    ) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_rel_curve_to(cr, dx1, dy1, dx2, dy2, dx3, dy3) })
    }

    pub fn rectangle(&self, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_rectangle(cr, x, y, width, height) })
    }

    pub fn arc(&self, xc: f64, yc: f64, radius: f64, angle1: f64, angle2: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_arc(cr, xc, yc, radius, angle1, angle2) })
    }

    pub fn arc_negative(
        &self,
        xc: f64,
        yc: f64,
        radius: f64,
        angle1: f64,
        angle2: f64,
    ) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_arc_negative(cr, xc, yc, radius, angle1, angle2) })
    }

    pub fn close_path(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_close_path(cr) })
    }

    pub fn has_current_point(&self) -> Result<bool> {
        self.query(|cr| unsafe { ffi::cairo_has_current_point(cr) }.as_bool())
    }

    pub fn current_point(&self) -> Result<(f64, f64)> {
        self.map_point(ffi::cairo_get_current_point, 0.0, 0.0)
    }

    pub fn path_extents(&self) -> Result<Extents> {
        self.extents(ffi::cairo_path_extents)
    }

    // -- drawing --

    pub fn paint(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_paint(cr) })
    }

    pub fn paint_with_alpha(&self, alpha: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_paint_with_alpha(cr, alpha) })
    }

    pub fn fill(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_fill(cr) })
    }

    pub fn fill_preserve(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_fill_preserve(cr) })
    }

    pub fn fill_extents(&self) -> Result<Extents> {
        self.extents(ffi::cairo_fill_extents)
    }

    pub fn in_fill(&self, x: f64, y: f64) -> Result<bool> {
        self.query(|cr| unsafe { ffi::cairo_in_fill(cr, x, y) }.as_bool())
    }

    pub fn stroke(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_stroke(cr) })
    }

    pub fn stroke_preserve(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_stroke_preserve(cr) })
    }

    pub fn stroke_extents(&self) -> Result<Extents> {
        self.extents(ffi::cairo_stroke_extents)
    }

    pub fn in_stroke(&self, x: f64, y: f64) -> Result<bool> {
        self.query(|cr| unsafe { ffi::cairo_in_stroke(cr, x, y) }.as_bool())
    }

    pub fn clip(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_clip(cr) })
    }

    pub fn clip_preserve(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_clip_preserve(cr) })
    }

    pub fn reset_clip(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_reset_clip(cr) })
    }

    pub fn clip_extents(&self) -> Result<Extents> {
        self.extents(ffi::cairo_clip_extents)
    }

    pub fn in_clip(&self, x: f64, y: f64) -> Result<bool> {
        self.query(|cr| unsafe { ffi::cairo_in_clip(cr, x, y) }.as_bool())
    }

    /// Paint the source through the alpha channel of `mask`.
    pub fn mask(&self, mask: &Pattern) -> Result<()> {
        let state = self.lock();
        let handle = state.handle()?;
        mask.with_handle(|m| {
            let ptr = m.as_ptr();
            handle.invoke(|cr| unsafe { ffi::cairo_mask(cr, ptr) })
        })
    }

    pub fn mask_surface(&self, surface: &ImageSurface, x: f64, y: f64) -> Result<()> {
        surface.with_handle(|s| {
            let ptr = s.as_ptr();
            self.call(|cr| unsafe { ffi::cairo_mask_surface(cr, ptr, x, y) })
        })
    }

    pub fn copy_page(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_copy_page(cr) })
    }

    // -- transformations --

    pub fn translate(&self, tx: f64, ty: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_translate(cr, tx, ty) })
    }

    /// Fails with `InvalidMatrix` when a factor is zero.
    pub fn scale(&self, sx: f64, sy: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_scale(cr, sx, sy) })
    }

    pub fn rotate(&self, radians: f64) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_rotate(cr, radians) })
    }

    pub fn transform(&self, matrix: &Matrix) -> Result<()> {
        let raw = ffi::cairo_matrix_t::from(*matrix);
        self.call(|cr| unsafe { ffi::cairo_transform(cr, &raw) })
    }

    pub fn set_matrix(&self, matrix: &Matrix) -> Result<()> {
        let raw = ffi::cairo_matrix_t::from(*matrix);
        self.call(|cr| unsafe { ffi::cairo_set_matrix(cr, &raw) })
    }

    pub fn matrix(&self) -> Result<Matrix> {
        self.query(|cr| {
            let mut raw = ffi::cairo_matrix_t::from(Matrix::identity());
            unsafe { ffi::cairo_get_matrix(cr, &mut raw) };
            Matrix::from(raw)
        })
    }

    pub fn identity_matrix(&self) -> Result<()> {
        self.call(|cr| unsafe { ffi::cairo_identity_matrix(cr) })
    }

    pub fn user_to_device(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.map_point(ffi::cairo_user_to_device, x, y)
    }

    pub fn user_to_device_distance(&self, dx: f64, dy: f64) -> Result<(f64, f64)> {
        self.map_point(ffi::cairo_user_to_device_distance, dx, dy)
    }

    pub fn device_to_user(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.map_point(ffi::cairo_device_to_user, x, y)
    }

    pub fn device_to_user_distance(&self, dx: f64, dy: f64) -> Result<(f64, f64)> {
        self.map_point(ffi::cairo_device_to_user_distance, dx, dy)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;
    use crate::config::BridgeConfig;
    use crate::error::ErrorKind;
    use crate::native::{Format, Status};

    fn argb(bridge: &Bridge, width: i32, height: i32) -> ImageSurface {
        ImageSurface::new(bridge, Format::Argb32, width, height).unwrap()
    }

    #[test]
    fn test_fill_rectangle_reaches_the_view() {
        let bridge = Bridge::new(BridgeConfig::default());
        let surface = argb(&bridge, 4, 4);
        let cr = Context::new(&surface).unwrap();

        cr.set_source_rgb(1.0, 0.0, 0.0).unwrap();
        cr.rectangle(0.0, 0.0, 2.0, 4.0).unwrap();
        cr.fill().unwrap();
        surface.flush().unwrap();

        let view = surface.data().unwrap();
        let mut pixel = [0u8; 4];
        view.read(0, &mut pixel).unwrap();
        assert_eq!(u32::from_ne_bytes(pixel), 0xffff_0000);
        view.read(3 * 4, &mut pixel).unwrap();
        assert_eq!(u32::from_ne_bytes(pixel), 0);
    }

    #[test]
    fn test_restore_without_save_is_sticky() {
        let bridge = Bridge::new(BridgeConfig::default());
        let cr = Context::new(&argb(&bridge, 1, 1)).unwrap();

        let err = cr.restore().unwrap_err();
        assert_eq!(err, BridgeError::Operation(Status::InvalidRestore));
        assert_eq!(cr.move_to(0.0, 0.0).unwrap_err().status(), Some(Status::InvalidRestore));
        assert_eq!(cr.status().unwrap(), Status::InvalidRestore);
    }

    #[test]
    fn test_source_returns_the_installed_wrapper() {
        let bridge = Bridge::new(BridgeConfig::default());
        let cr = Context::new(&argb(&bridge, 1, 1)).unwrap();
        let source = Pattern::create_rgba(0.0, 0.5, 0.0, 1.0).unwrap();

        cr.set_source(&source).unwrap();
        assert!(cr.source().unwrap().ptr_eq(&source));

        cr.set_source_rgb(0.0, 0.0, 0.0).unwrap();
        let other = cr.source().unwrap();
        assert!(!other.ptr_eq(&source));
        assert_eq!(other.rgba().unwrap(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_context_keeps_its_target_alive() {
        let bridge = Bridge::new(BridgeConfig::default());
        let surface = argb(&bridge, 2, 2);
        let weak = surface.downgrade();
        let cr = Context::new(&surface).unwrap();
        drop(surface);

        assert!(weak.is_alive());
        cr.paint().unwrap();
        drop(cr);
        assert!(!weak.is_alive());
        assert_eq!(bridge.accountant().charged(), 0);
    }

    #[test]
    fn test_context_on_finished_surface_fails() {
        let bridge = Bridge::new(BridgeConfig::default());
        let surface = argb(&bridge, 2, 2);
        surface.finish().unwrap();

        let err = Context::new(&surface).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
    }

    #[test]
    fn test_set_source_surface_offsets_the_source() {
        let bridge = Bridge::new(BridgeConfig::default());
        let src = ImageSurface::new(&bridge, Format::A8, 1, 1).unwrap();
        src.data().unwrap().set(0, 0xff).unwrap();
        src.mark_dirty().unwrap();

        let dst = ImageSurface::new(&bridge, Format::A8, 3, 1).unwrap();
        let cr = Context::new(&dst).unwrap();
        cr.set_source_surface(&src, 2.0, 0.0).unwrap();
        cr.paint().unwrap();
        dst.flush().unwrap();

        assert_eq!(&dst.data().unwrap().to_bytes().unwrap()[..3], &[0, 0, 0xff]);
        assert!(cr.source().unwrap().surface().unwrap().unwrap().ptr_eq(&src));
    }

    #[test]
    fn test_disposed_context_reports_detached() {
        let bridge = Bridge::new(BridgeConfig::default());
        let cr = Context::new(&argb(&bridge, 1, 1)).unwrap();
        cr.dispose();
        cr.dispose();
        assert_eq!(cr.paint().unwrap_err().kind(), ErrorKind::Detached);
    }

    #[test]
    fn test_replaced_source_surface_is_released() {
        let bridge = Bridge::new(BridgeConfig::default());
        let target = argb(&bridge, 1, 1);
        let baseline = bridge.accountant().charged();
        let cr = Context::new(&target).unwrap();

        let big = argb(&bridge, 64, 64);
        let weak = big.downgrade();
        big.data().unwrap();
        cr.set_source_surface(&big, 0.0, 0.0).unwrap();
        cr.set_source_rgb(0.0, 0.0, 1.0).unwrap();
        drop(big);

        assert!(!weak.is_alive());
        assert_eq!(bridge.accountant().charged(), baseline);
        assert_eq!(cr.source().unwrap().rgba().unwrap(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_restore_releases_the_saved_over_source() {
        let bridge = Bridge::new(BridgeConfig::default());
        let target = argb(&bridge, 1, 1);
        let baseline = bridge.accountant().charged();
        let cr = Context::new(&target).unwrap();

        let big = argb(&bridge, 64, 64);
        let weak = big.downgrade();
        big.data().unwrap();
        cr.save().unwrap();
        cr.set_source_surface(&big, 0.0, 0.0).unwrap();
        cr.restore().unwrap();
        drop(big);

        assert!(!weak.is_alive());
        assert_eq!(bridge.accountant().charged(), baseline);
        assert!(cr.installed_source().is_none());
    }

    #[test]
    fn test_source_survives_a_disposed_wrapper() {
        let bridge = Bridge::new(BridgeConfig::default());
        let cr = Context::new(&argb(&bridge, 1, 1)).unwrap();
        let source = Pattern::create_rgba(0.0, 1.0, 0.0, 0.5).unwrap();

        cr.set_source(&source).unwrap();
        source.dispose();
        cr.paint().unwrap();

        let current = cr.source().unwrap();
        assert!(!current.ptr_eq(&source));
        assert_eq!(current.rgba().unwrap(), [0.0, 1.0, 0.0, 0.5]);
        assert!(cr.source().unwrap().ptr_eq(&current));
    }
}

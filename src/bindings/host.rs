//! Host records behind the JS objects, and the glue shared by every class.
//!
//! Each JS object created by the bindings carries, in internal field 0, an
//! `External` pointing to a boxed [`Host`]. A weak handle with a finalizer
//! owns the box: when the collector reclaims the object the host record is
//! freed, its array buffer detached, and its core wrapper handed to the
//! bridge's [`Finalizer`] to be released on the next host lock.

use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::gc::{ExternalMemorySink, Finalizer, HostLock};
use crate::native::{
    Antialias, ColorStop, Extend, FillRule, Filter, Format, LineCap, LineJoin, Matrix, Operator,
    PatternType, Status,
};
use crate::pattern::Pattern;

use super::context::ContextHost;
use super::pattern::PatternHost;
use super::surface::SurfaceHost;

/// Reports external memory changes to the isolate's collector.
pub struct IsolateSink {
    isolate: *mut v8::Isolate,
}

impl IsolateSink {
    pub fn new(isolate: &mut v8::Isolate) -> Self {
        Self { isolate }
    }
}

impl ExternalMemorySink for IsolateSink {
    fn adjust_external_memory(&self, delta: i64) {
        if delta != 0 {
            unsafe {
                (*self.isolate).adjust_amount_of_external_allocated_memory(delta);
            }
            log::trace!("Adjusted isolate external memory: {} bytes", delta);
        }
    }
}

/// State shared by every callback of one context.
pub struct CairoState {
    pub(super) bridge: &'static Bridge,
    sink: Rc<dyn ExternalMemorySink>,

    /// `Pattern` constructor, for factories and `get_source`.
    pub(super) pattern_class: v8::Global<v8::Function>,

    /// Core wrapper handed to the next internal `new Pattern(marker)` call.
    pub(super) pending_pattern: RefCell<Option<(Pattern, Option<v8::Global<v8::Object>>)>>,

    /// Weak handles carrying the finalizers. Pruned once collected.
    weaks: RefCell<Vec<v8::Weak<v8::Object>>>,
}

impl CairoState {
    pub(super) fn new(
        bridge: &'static Bridge,
        sink: Rc<dyn ExternalMemorySink>,
        pattern_class: v8::Global<v8::Function>,
    ) -> Self {
        Self {
            bridge,
            sink,
            pattern_class,
            pending_pattern: RefCell::new(None),
            weaks: RefCell::new(Vec::new()),
        }
    }

    pub(super) fn lock(&self) -> HostLock {
        self.bridge.lock(Rc::clone(&self.sink))
    }
}

pub(super) enum Host {
    Surface(SurfaceHost),
    Pattern(PatternHost),
    Context(ContextHost),
}

impl Host {
    fn class(&self) -> &'static str {
        match self {
            Host::Surface(_) => "Surface",
            Host::Pattern(_) => "Pattern",
            Host::Context(_) => "Context",
        }
    }

    /// Runs from the weak callback, after the JS object is gone.
    fn finalize(self, isolate: &mut v8::Isolate, finalizer: &Finalizer) {
        match self {
            Host::Surface(host) => {
                if let Some(buffer) = host.buffer.into_inner() {
                    let scope = std::pin::pin!(v8::HandleScope::new(isolate));
                    let scope = scope.init();
                    v8::Local::new(&scope, &buffer).detach(None);
                }
                finalizer.defer(host.surface);
            }
            Host::Pattern(host) => finalizer.defer(host.pattern),
            Host::Context(host) => finalizer.defer(host.context),
        }
    }
}

/// Typed access to one variant of [`Host`].
pub(super) trait HostClass {
    fn from_host(host: &Host) -> Option<&Self>;
}

impl HostClass for SurfaceHost {
    fn from_host(host: &Host) -> Option<&Self> {
        match host {
            Host::Surface(surface) => Some(surface),
            _ => None,
        }
    }
}

impl HostClass for PatternHost {
    fn from_host(host: &Host) -> Option<&Self> {
        match host {
            Host::Pattern(pattern) => Some(pattern),
            _ => None,
        }
    }
}

impl HostClass for ContextHost {
    fn from_host(host: &Host) -> Option<&Self> {
        match host {
            Host::Context(context) => Some(context),
            _ => None,
        }
    }
}

/// Attach `host` to `object` and register its finalizer.
pub(super) fn wrap(
    scope: &mut v8::PinScope,
    state: &CairoState,
    object: v8::Local<v8::Object>,
    host: Host,
) {
    let class = host.class();
    let host_ptr = Box::into_raw(Box::new(host));

    let external = v8::External::new(scope, host_ptr as *mut c_void);
    object.set_internal_field(0, external.into());

    let finalizer = state.bridge.finalizer();
    let weak = v8::Weak::with_finalizer(
        scope,
        object,
        Box::new(move |isolate: &mut v8::Isolate| {
            // SAFETY: the object is collected, so nothing reads the field
            // anymore and this closure is the only owner of the box.
            let host = unsafe { Box::from_raw(host_ptr) };
            tracing::trace!("Collected {} object", host.class());
            host.finalize(isolate, &finalizer);
        }),
    );

    let mut weaks = state.weaks.borrow_mut();
    weaks.retain(|weak| !weak.is_empty());
    weaks.push(weak);

    tracing::trace!("Wrapped {} object", class);
}

/// The host record of `value`, if it is an object of class `H`.
pub(super) fn unwrap<'a, H: HostClass>(
    scope: &mut v8::PinScope,
    value: v8::Local<v8::Value>,
) -> Option<&'a H> {
    let object = v8::Local::<v8::Object>::try_from(value).ok()?;
    if object.internal_field_count() < 1 {
        return None;
    }

    let data = object.get_internal_field(scope, 0)?;
    let value = v8::Local::<v8::Value>::try_from(data).ok()?;
    let external = v8::Local::<v8::External>::try_from(value).ok()?;

    // SAFETY: only `wrap` stores an External in field 0, and the box it points
    // to lives until the object is collected.
    let host = unsafe { &*(external.value() as *const Host) };
    H::from_host(host)
}

pub(super) fn throw_type_error(scope: &mut v8::PinScope, message: &str) {
    throw(scope, &BridgeError::Type(message.to_string()));
}

/// Raise `err` in JS: `TypeError` and `RangeError` for validation failures,
/// `Error` for everything else.
pub(super) fn throw(scope: &mut v8::PinScope, err: &BridgeError) {
    let message = v8::String::new(scope, &err.to_string()).unwrap();
    let exception = match err {
        BridgeError::Type(_) => v8::Exception::type_error(scope, message),
        BridgeError::Range(_) => v8::Exception::range_error(scope, message),
        _ => v8::Exception::error(scope, message),
    };
    scope.throw_exception(exception);
}

/// Set the return value, or throw.
pub(super) fn ret<T: ToJs>(scope: &mut v8::PinScope, rv: &mut v8::ReturnValue, result: Result<T>) {
    match result {
        Ok(value) => {
            let value = value.to_js(scope);
            rv.set(value);
        }
        Err(err) => throw(scope, &err),
    }
}

/// Plain object with numeric fields.
pub(super) fn object<'s>(
    scope: &mut v8::PinScope<'s, '_>,
    fields: &[(&str, f64)],
) -> v8::Local<'s, v8::Value> {
    let object = v8::Object::new(scope);
    for (name, value) in fields {
        let key = v8::String::new(scope, name).unwrap();
        let value = v8::Number::new(scope, *value);
        object.set(scope, key.into(), value.into());
    }
    object.into()
}

pub(super) trait ToJs {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value>;
}

impl ToJs for () {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        v8::undefined(scope).into()
    }
}

impl ToJs for bool {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        v8::Boolean::new(scope, self).into()
    }
}

impl ToJs for i32 {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        v8::Integer::new(scope, self).into()
    }
}

impl ToJs for usize {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        v8::Number::new(scope, self as f64).into()
    }
}

impl ToJs for f64 {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        v8::Number::new(scope, self).into()
    }
}

/// A point or a distance.
impl ToJs for (f64, f64) {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        object(scope, &[("x", self.0), ("y", self.1)])
    }
}

/// Extents.
impl ToJs for (f64, f64, f64, f64) {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        object(scope, &[("x1", self.0), ("y1", self.1), ("x2", self.2), ("y2", self.3)])
    }
}

impl ToJs for Matrix {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        object(
            scope,
            &[
                ("xx", self.xx),
                ("yx", self.yx),
                ("xy", self.xy),
                ("yy", self.yy),
                ("x0", self.x0),
                ("y0", self.y0),
            ],
        )
    }
}

impl ToJs for ColorStop {
    fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
        object(
            scope,
            &[
                ("offset", self.offset),
                ("r", self.red),
                ("g", self.green),
                ("b", self.blue),
                ("a", self.alpha),
            ],
        )
    }
}

macro_rules! enum_to_js {
    ($($ty:ty),+) => {
        $(
            impl ToJs for $ty {
                fn to_js<'s>(self, scope: &mut v8::PinScope<'s, '_>) -> v8::Local<'s, v8::Value> {
                    v8::Integer::new(scope, self.as_raw()).into()
                }
            }
        )+
    };
}

enum_to_js!(
    Status,
    Format,
    Extend,
    Filter,
    PatternType,
    Operator,
    FillRule,
    LineCap,
    LineJoin,
    Antialias
);

//! V8 bindings: the `cairo` global with its `Surface`, `Pattern` and
//! `Context` classes and the enumeration constants.
//!
//! ```ignore
//! let sink = IsolateSink::new(&mut isolate);
//! let scope = pin!(v8::HandleScope::new(&mut isolate));
//! let mut scope = scope.init();
//! let context = v8::Context::new(&scope, Default::default());
//! let scope = &mut v8::ContextScope::new(&mut scope, context);
//! setup_cairo(scope, Bridge::global(), sink);
//! ```

#[macro_use]
mod macros;

mod args;
mod context;
pub(crate) mod host;
mod pattern;
mod surface;

use std::rc::Rc;
use std::sync::OnceLock;

pub use host::IsolateSink;

use crate::bridge::Bridge;
use crate::native::{
    Antialias, Extend, FillRule, Filter, Format, LineCap, LineJoin, Operator, PatternType, Status,
};

static PLATFORM: OnceLock<v8::SharedRef<v8::Platform>> = OnceLock::new();

/// Initialize the V8 platform once per process.
///
/// `gc()` is exposed so scripts and tests can force collections.
pub fn init_platform() -> &'static v8::SharedRef<v8::Platform> {
    PLATFORM.get_or_init(|| {
        v8::V8::set_flags_from_string("--expose-gc");

        let platform = v8::new_default_platform(0, false).make_shared();
        v8::V8::initialize_platform(platform.clone());
        v8::V8::initialize();
        platform
    })
}

/// `DestOver` -> `DEST_OVER`, `Argb32` -> `ARGB32`, `Win32GdiError` ->
/// `WIN32_GDI_ERROR`.
fn constant_name(prefix: &str, variant: &str) -> String {
    let mut name = String::from(prefix);
    let mut previous = '_';

    for c in variant.chars() {
        if c.is_ascii_uppercase() && (previous.is_ascii_lowercase() || previous.is_ascii_digit()) {
            name.push('_');
        }
        name.push(c.to_ascii_uppercase());
        previous = c;
    }
    name
}

fn set_constants<T>(
    scope: &mut v8::PinScope,
    target: v8::Local<v8::Object>,
    prefix: &str,
    values: &[T],
) where
    T: std::fmt::Debug + Copy + Into<i32>,
{
    for value in values {
        let name = constant_name(prefix, &format!("{:?}", value));
        let key = v8::String::new(scope, &name).unwrap();
        let raw = v8::Integer::new(scope, (*value).into());
        target.set(scope, key.into(), raw.into());
    }
}

/// Install `globalThis.cairo` in the current context.
pub fn setup_cairo(scope: &mut v8::PinScope, bridge: &'static Bridge, sink: IsolateSink) {
    let surface_class = surface::template(scope).get_function(scope).unwrap();
    let pattern_class = pattern::template(scope).get_function(scope).unwrap();
    let context_class = context::template(scope).get_function(scope).unwrap();

    let cairo = v8::Object::new(scope);
    for (name, class) in [
        ("Surface", surface_class),
        ("Pattern", pattern_class),
        ("Context", context_class),
    ] {
        let key = v8::String::new(scope, name).unwrap();
        cairo.set(scope, key.into(), class.into());
    }

    set_constants(scope, cairo, "FORMAT_", Format::ALL);
    set_constants(scope, cairo, "EXTEND_", Extend::ALL);
    set_constants(scope, cairo, "FILTER_", Filter::ALL);
    set_constants(scope, cairo, "PATTERN_TYPE_", PatternType::ALL);
    set_constants(scope, cairo, "OPERATOR_", Operator::ALL);
    set_constants(scope, cairo, "FILL_RULE_", FillRule::ALL);
    set_constants(scope, cairo, "LINE_CAP_", LineCap::ALL);
    set_constants(scope, cairo, "LINE_JOIN_", LineJoin::ALL);
    set_constants(scope, cairo, "ANTIALIAS_", Antialias::ALL);
    set_constants(scope, cairo, "STATUS_", Status::ALL);

    let pattern_class = v8::Global::new(scope, pattern_class);
    let state = host::CairoState::new(bridge, Rc::new(sink), pattern_class);
    store_state!(scope, state);

    let global = scope.get_current_context().global(scope);
    let key = v8::String::new(scope, "cairo").unwrap();
    global.set(scope, key.into(), cairo.into());

    tracing::debug!("Installed cairo bindings");
}

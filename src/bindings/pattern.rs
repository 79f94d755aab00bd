//! `cairo.Pattern`: paint sources, created only through the `create_*`
//! statics or returned by `Context#get_source`.

use crate::error::Result;
use crate::native::{Extend, Filter};
use crate::pattern::Pattern;

use super::args;
use super::host::{self, CairoState, Host};
use super::surface::SurfaceHost;

pub(super) struct PatternHost {
    pub(super) pattern: Pattern,

    /// JS object of the surface a surface pattern paints from, so the
    /// surface object outlives every pattern created from it.
    pub(super) surface: Option<v8::Global<v8::Object>>,
}

/// Create the JS object for `pattern` through the `Pattern` constructor.
pub(super) fn instantiate<'s>(
    scope: &mut v8::PinScope<'s, '_>,
    state: &CairoState,
    pattern: Pattern,
    surface: Option<v8::Local<v8::Object>>,
) -> Option<v8::Local<'s, v8::Object>> {
    let surface = surface.map(|surface| v8::Global::new(scope, surface));
    *state.pending_pattern.borrow_mut() = Some((pattern, surface));

    let class = v8::Local::new(scope, &state.pattern_class);
    let marker = v8::External::new(scope, std::ptr::null_mut());
    let object = class.new_instance(scope, &[marker.into()]);

    // Left over only if the constructor threw.
    state.pending_pattern.borrow_mut().take();
    object
}

fn pattern_constructor(
    scope: &mut v8::PinScope,
    args: v8::FunctionCallbackArguments,
    mut rv: v8::ReturnValue,
) {
    if args.new_target().is_undefined() {
        host::throw_type_error(
            scope,
            "Do not call `Pattern()`: use `Pattern.create_XXX()` methods",
        );
        return;
    }

    let Some(state) = get_state!(scope) else {
        return;
    };

    let pending = if args.length() == 1 && args.get(0).is_external() {
        state.pending_pattern.borrow_mut().take()
    } else {
        None
    };

    let Some((pattern, surface)) = pending else {
        host::throw_type_error(
            scope,
            "Do not use `new Pattern()`: use `Pattern.create_XXX()` methods",
        );
        return;
    };

    let this = args.this();
    host::wrap(scope, state, this, Host::Pattern(PatternHost { pattern, surface }));
    rv.set(this.into());
}

fn created(
    scope: &mut v8::PinScope,
    state: &CairoState,
    rv: &mut v8::ReturnValue,
    pattern: Result<Pattern>,
    surface: Option<v8::Local<v8::Object>>,
) {
    match pattern {
        Ok(pattern) => {
            if let Some(object) = instantiate(scope, state, pattern, surface) {
                rv.set(object.into());
            }
        }
        Err(err) => host::throw(scope, &err),
    }
}

/// Static factory taking `N` numbers.
macro_rules! pattern_factory {
    ($name:ident, $factory:ident, [$($arg:ident),+], $message:literal) => {
        fn $name(
            scope: &mut v8::PinScope,
            args: v8::FunctionCallbackArguments,
            mut rv: v8::ReturnValue,
        ) {
            let Some(state) = get_state!(scope) else {
                return;
            };
            let _lock = state.lock();

            let Some([$($arg),+]) = args::numbers(scope, &args, $message) else {
                return;
            };
            created(scope, state, &mut rv, Pattern::$factory($($arg),+), None);
        }
    };
}

pattern_factory!(
    pattern_create_rgb,
    create_rgb,
    [r, g, b],
    "Must pass `r`, `g` and `b`: three Numbers"
);
pattern_factory!(
    pattern_create_rgba,
    create_rgba,
    [r, g, b, a],
    "Must pass `r`, `g`, `b` and `a`: four Numbers"
);
pattern_factory!(
    pattern_create_linear,
    create_linear,
    [x0, y0, x1, y1],
    "Must pass `x0`, `y0`, `x1` and `y1`: four Numbers"
);
pattern_factory!(
    pattern_create_radial,
    create_radial,
    [cx0, cy0, r0, cx1, cy1, r1],
    "Must pass `cx0`, `cy0`, `r0`, `cx1`, `cy1` and `r1`: six Numbers"
);

fn pattern_create_for_surface(
    scope: &mut v8::PinScope,
    args: v8::FunctionCallbackArguments,
    mut rv: v8::ReturnValue,
) {
    let Some(state) = get_state!(scope) else {
        return;
    };
    let _lock = state.lock();

    let value = args.get(0);
    let Some(surface) = host::unwrap::<SurfaceHost>(scope, value) else {
        host::throw_type_error(scope, "Must pass `surface`, an ImageSurface");
        return;
    };

    let object = v8::Local::<v8::Object>::try_from(value).ok();
    created(scope, state, &mut rv, Pattern::create_for_surface(&surface.surface), object);
}

host_method!(pattern_add_color_stop_rgb, PatternHost, |scope, args, rv, state, this| {
    const MESSAGE: &str = "Must pass `offset`, `r`, `g` and `b`: four Numbers";

    let Some([offset, r, g, b]) = args::numbers(scope, &args, MESSAGE) else {
        return;
    };
    host::ret(scope, &mut rv, this.pattern.add_color_stop_rgb(offset, r, g, b));
});

host_method!(pattern_add_color_stop_rgba, PatternHost, |scope, args, rv, state, this| {
    let Some([offset, r, g, b, a]) = args::numbers(
        scope,
        &args,
        "Must pass `offset`, `r`, `g`, `b` and `a`: five Numbers",
    ) else {
        return;
    };
    host::ret(scope, &mut rv, this.pattern.add_color_stop_rgba(offset, r, g, b, a));
});

host_method!(pattern_get_color_stop_count, PatternHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.pattern.color_stop_count());
});

host_method!(pattern_get_color_stop_rgba, PatternHost, |scope, args, rv, state, this| {
    let Some([index]) = args::integers(scope, &args, "Must pass `index`, an integer") else {
        return;
    };
    host::ret(scope, &mut rv, this.pattern.color_stop_rgba(index));
});

host_method!(pattern_get_rgba, PatternHost, |scope, args, rv, state, this| {
    match this.pattern.rgba() {
        Ok([r, g, b, a]) => {
            let value = host::object(scope, &[("r", r), ("g", g), ("b", b), ("a", a)]);
            rv.set(value);
        }
        Err(err) => host::throw(scope, &err),
    }
});

host_method!(pattern_get_surface, PatternHost, |scope, args, rv, state, this| {
    if let Err(err) = this.pattern.surface() {
        return host::throw(scope, &err);
    }

    match &this.surface {
        Some(surface) => {
            let surface = v8::Local::new(scope, surface);
            rv.set(surface.into());
        }
        None => rv.set_null(),
    }
});

host_method!(pattern_get_linear_points, PatternHost, |scope, args, rv, state, this| {
    match this.pattern.linear_points() {
        Ok([x0, y0, x1, y1]) => {
            let value = host::object(scope, &[("x0", x0), ("y0", y0), ("x1", x1), ("y1", y1)]);
            rv.set(value);
        }
        Err(err) => host::throw(scope, &err),
    }
});

host_method!(pattern_get_radial_circles, PatternHost, |scope, args, rv, state, this| {
    match this.pattern.radial_circles() {
        Ok([x0, y0, r0, x1, y1, r1]) => {
            let value = host::object(
                scope,
                &[("x0", x0), ("y0", y0), ("r0", r0), ("x1", x1), ("y1", y1), ("r1", r1)],
            );
            rv.set(value);
        }
        Err(err) => host::throw(scope, &err),
    }
});

host_method!(pattern_set_extend, PatternHost, |scope, args, rv, state, this| {
    let Some(extend) = args::enumeration::<Extend>(scope, &args, "Must pass `extend`, an integer")
    else {
        return;
    };
    host::ret(scope, &mut rv, this.pattern.set_extend(extend));
});

host_method!(pattern_get_extend, PatternHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.pattern.extend());
});

host_method!(pattern_set_filter, PatternHost, |scope, args, rv, state, this| {
    let Some(filter) = args::enumeration::<Filter>(scope, &args, "Must pass `filter`, an integer")
    else {
        return;
    };
    host::ret(scope, &mut rv, this.pattern.set_filter(filter));
});

host_method!(pattern_get_filter, PatternHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.pattern.filter());
});

host_method!(pattern_get_type, PatternHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.pattern.pattern_type());
});

host_method!(pattern_status, PatternHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.pattern.status());
});

host_method!(pattern_dispose, PatternHost, |scope, args, rv, state, this| {
    this.pattern.dispose();
});

pub(super) fn template<'s>(
    scope: &mut v8::PinScope<'s, '_>,
) -> v8::Local<'s, v8::FunctionTemplate> {
    let class = v8::FunctionTemplate::new(scope, pattern_constructor);
    let name = v8::String::new(scope, "Pattern").unwrap();
    class.set_class_name(name);
    class.instance_template(scope).set_internal_field_count(1);

    set_method!(scope, class, "create_rgb", pattern_create_rgb);
    set_method!(scope, class, "create_rgba", pattern_create_rgba);
    set_method!(scope, class, "create_linear", pattern_create_linear);
    set_method!(scope, class, "create_radial", pattern_create_radial);
    set_method!(scope, class, "create_for_surface", pattern_create_for_surface);

    let proto = class.prototype_template(scope);
    set_method!(scope, proto, "add_color_stop_rgb", pattern_add_color_stop_rgb);
    set_method!(scope, proto, "add_color_stop_rgba", pattern_add_color_stop_rgba);
    set_method!(scope, proto, "get_color_stop_count", pattern_get_color_stop_count);
    set_method!(scope, proto, "get_color_stop_rgba", pattern_get_color_stop_rgba);
    set_method!(scope, proto, "get_rgba", pattern_get_rgba);
    set_method!(scope, proto, "get_surface", pattern_get_surface);
    set_method!(scope, proto, "get_linear_points", pattern_get_linear_points);
    set_method!(scope, proto, "get_radial_circles", pattern_get_radial_circles);
    set_method!(scope, proto, "set_extend", pattern_set_extend);
    set_method!(scope, proto, "get_extend", pattern_get_extend);
    set_method!(scope, proto, "set_filter", pattern_set_filter);
    set_method!(scope, proto, "get_filter", pattern_get_filter);
    set_method!(scope, proto, "get_type", pattern_get_type);
    set_method!(scope, proto, "status", pattern_status);
    set_method!(scope, proto, "dispose", pattern_dispose);

    class
}

//! `cairo.Context`: drawing onto a surface.

use std::cell::RefCell;

use crate::context::Context;
use crate::native::{Antialias, FillRule, LineCap, LineJoin, Operator};
use crate::pattern::Pattern;

use super::args;
use super::host::{self, Host};
use super::pattern::{PatternHost, instantiate};
use super::surface::SurfaceHost;

pub(super) struct ContextHost {
    pub(super) context: Context,

    /// JS object of the target surface, returned by `get_target`.
    pub(super) target: v8::Global<v8::Object>,

    /// Last source installed from JS, so `get_source` returns the same object.
    pub(super) source: RefCell<Option<(Pattern, v8::Global<v8::Object>)>>,
}

impl ContextHost {
    fn remember_source(
        &self,
        scope: &mut v8::PinScope,
        pattern: Pattern,
        object: v8::Local<v8::Object>,
    ) {
        let object = v8::Global::new(scope, object);
        *self.source.borrow_mut() = Some((pattern, object));
    }

    /// Forget the cached source object once the context no longer hands
    /// back its pattern, so the object and what it holds can be collected.
    fn sync_source(&self) {
        let installed = self.context.installed_source();
        let mut source = self.source.borrow_mut();
        let current = match (source.as_ref(), installed.as_ref()) {
            (Some((cached, _)), Some(installed)) => cached.ptr_eq(installed),
            _ => false,
        };
        if !current {
            source.take();
        }
    }
}

fn context_constructor(
    scope: &mut v8::PinScope,
    args: v8::FunctionCallbackArguments,
    mut rv: v8::ReturnValue,
) {
    if args.new_target().is_undefined() {
        host::throw_type_error(scope, "Class constructors cannot be invoked without 'new'");
        return;
    }

    let Some(state) = get_state!(scope) else {
        return;
    };
    let _lock = state.lock();

    let value = args.get(0);
    let (Some(surface), Ok(target)) = (
        host::unwrap::<SurfaceHost>(scope, value),
        v8::Local::<v8::Object>::try_from(value),
    ) else {
        host::throw_type_error(scope, "Must pass `surface`, an ImageSurface");
        return;
    };

    match Context::new(&surface.surface) {
        Ok(context) => {
            let this = args.this();
            let record = ContextHost {
                context,
                target: v8::Global::new(scope, target),
                source: RefCell::new(None),
            };
            host::wrap(scope, state, this, Host::Context(record));
            rv.set(this.into());
        }
        Err(err) => host::throw(scope, &err),
    }
}

/// Methods forwarding their Number arguments to the context.
macro_rules! context_calls {
    ($($name:ident => $method:ident($($arg:ident),+), $message:literal;)+) => {
        $(
            host_method!($name, ContextHost, |scope, args, rv, state, this| {
                let Some([$($arg),+]) = args::numbers(scope, &args, $message) else {
                    return;
                };
                host::ret(scope, &mut rv, this.context.$method($($arg),+));
            });
        )+
    };
}

/// Methods without arguments.
macro_rules! context_queries {
    ($($name:ident => $method:ident;)+) => {
        $(
            host_method!($name, ContextHost, |scope, args, rv, state, this| {
                host::ret(scope, &mut rv, this.context.$method());
            });
        )+
    };
}

/// Setters taking one enumerated argument.
macro_rules! context_enum_setters {
    ($($name:ident => $method:ident: $ty:ty, $message:literal;)+) => {
        $(
            host_method!($name, ContextHost, |scope, args, rv, state, this| {
                let Some(value) = args::enumeration::<$ty>(scope, &args, $message) else {
                    return;
                };
                host::ret(scope, &mut rv, this.context.$method(value));
            });
        )+
    };
}

context_queries! {
    context_save => save;
    context_new_path => new_path;
    context_new_sub_path => new_sub_path;
    context_close_path => close_path;
    context_paint => paint;
    context_fill => fill;
    context_fill_preserve => fill_preserve;
    context_stroke => stroke;
    context_stroke_preserve => stroke_preserve;
    context_clip => clip;
    context_clip_preserve => clip_preserve;
    context_reset_clip => reset_clip;
    context_copy_page => copy_page;
    context_identity_matrix => identity_matrix;

    context_get_line_width => line_width;
    context_get_miter_limit => miter_limit;
    context_get_tolerance => tolerance;
    context_get_operator => operator;
    context_get_antialias => antialias;
    context_get_fill_rule => fill_rule;
    context_get_line_cap => line_cap;
    context_get_line_join => line_join;
    context_get_dash_count => dash_count;
    context_get_matrix => matrix;
    context_has_current_point => has_current_point;
    context_get_current_point => current_point;
    context_path_extents => path_extents;
    context_fill_extents => fill_extents;
    context_stroke_extents => stroke_extents;
    context_clip_extents => clip_extents;
    context_status => status;
}

context_calls! {
    context_set_line_width => set_line_width(width), "Must pass `width`, a Number";
    context_set_miter_limit => set_miter_limit(limit), "Must pass `limit`, a Number";
    context_set_tolerance => set_tolerance(tolerance), "Must pass `tolerance`, a Number";
    context_paint_with_alpha => paint_with_alpha(alpha), "Must pass `alpha`, a Number";
    context_move_to => move_to(x, y), "Must pass `x` and `y`: two Numbers";
    context_line_to => line_to(x, y), "Must pass `x` and `y`: two Numbers";
    context_rel_move_to => rel_move_to(dx, dy), "Must pass `dx` and `dy`: two Numbers";
    context_rel_line_to => rel_line_to(dx, dy), "Must pass `dx` and `dy`: two Numbers";
    context_curve_to => curve_to(x1, y1, x2, y2, x3, y3),
        "Must pass `x1`, `y1`, `x2`, `y2`, `x3` and `y3`: six Numbers";
    context_rel_curve_to => rel_curve_to(dx1, dy1, dx2, dy2, dx3, dy3),
        "Must pass `dx1`, `dy1`, `dx2`, `dy2`, `dx3` and `dy3`: six Numbers";
    context_rectangle => rectangle(x, y, width, height),
        "Must pass `x`, `y`, `width` and `height`: four Numbers";
    context_arc => arc(xc, yc, radius, angle1, angle2),
        "Must pass `xc`, `yc`, `radius`, `angle1` and `angle2`: five Numbers";
    context_arc_negative => arc_negative(xc, yc, radius, angle1, angle2),
        "Must pass `xc`, `yc`, `radius`, `angle1` and `angle2`: five Numbers";
    context_translate => translate(tx, ty), "Must pass `tx` and `ty`: two Numbers";
    context_scale => scale(sx, sy), "Must pass `sx` and `sy`: two Numbers";
    context_rotate => rotate(angle), "Must pass `angle`, a Number";
    context_in_fill => in_fill(x, y), "Must pass `x` and `y`: two Numbers";
    context_in_stroke => in_stroke(x, y), "Must pass `x` and `y`: two Numbers";
    context_in_clip => in_clip(x, y), "Must pass `x` and `y`: two Numbers";
    context_user_to_device => user_to_device(x, y), "Must pass `x` and `y`: two Numbers";
    context_user_to_device_distance => user_to_device_distance(dx, dy),
        "Must pass `dx` and `dy`: two Numbers";
    context_device_to_user => device_to_user(x, y), "Must pass `x` and `y`: two Numbers";
    context_device_to_user_distance => device_to_user_distance(dx, dy),
        "Must pass `dx` and `dy`: two Numbers";
}

context_enum_setters! {
    context_set_operator => set_operator: Operator, "Must pass `operator`, an integer";
    context_set_antialias => set_antialias: Antialias, "Must pass `antialias`, an integer";
    context_set_fill_rule => set_fill_rule: FillRule, "Must pass `fill_rule`, an integer";
    context_set_line_cap => set_line_cap: LineCap, "Must pass `line_cap`, an integer";
    context_set_line_join => set_line_join: LineJoin, "Must pass `line_join`, an integer";
}

host_method!(context_restore, ContextHost, |scope, args, rv, state, this| {
    let result = this.context.restore();
    this.sync_source();
    host::ret(scope, &mut rv, result);
});

host_method!(context_set_source_rgb, ContextHost, |scope, args, rv, state, this| {
    const MESSAGE: &str = "Must pass `r`, `g` and `b`: three Numbers";

    let Some([r, g, b]) = args::numbers(scope, &args, MESSAGE) else {
        return;
    };
    let result = this.context.set_source_rgb(r, g, b);
    this.sync_source();
    host::ret(scope, &mut rv, result);
});

host_method!(context_set_source_rgba, ContextHost, |scope, args, rv, state, this| {
    const MESSAGE: &str = "Must pass `r`, `g`, `b` and `a`: four Numbers";

    let Some([r, g, b, a]) = args::numbers(scope, &args, MESSAGE) else {
        return;
    };
    let result = this.context.set_source_rgba(r, g, b, a);
    this.sync_source();
    host::ret(scope, &mut rv, result);
});

host_method!(context_set_dash, ContextHost, |scope, args, rv, state, this| {
    const MESSAGE: &str = "Must pass `dashes`, an Array of Numbers, and `offset`, a Number";

    let Some(dashes) = args::number_array(scope, args.get(0), MESSAGE) else {
        return;
    };
    let offset = args.get(1);
    let Some(offset) = offset.is_number().then(|| offset.number_value(scope)).flatten() else {
        return host::throw_type_error(scope, MESSAGE);
    };

    host::ret(scope, &mut rv, this.context.set_dash(&dashes, offset));
});

host_method!(context_get_dash, ContextHost, |scope, args, rv, state, this| {
    let (dashes, offset) = match this.context.dash() {
        Ok(dash) => dash,
        Err(err) => return host::throw(scope, &err),
    };

    let elements: Vec<v8::Local<v8::Value>> = dashes
        .into_iter()
        .map(|dash| v8::Number::new(scope, dash).into())
        .collect();
    let dashes = v8::Array::new_with_elements(scope, &elements);

    let result = v8::Object::new(scope);
    let key = v8::String::new(scope, "dashes").unwrap();
    result.set(scope, key.into(), dashes.into());
    let key = v8::String::new(scope, "offset").unwrap();
    let offset = v8::Number::new(scope, offset);
    result.set(scope, key.into(), offset.into());

    rv.set(result.into());
});

host_method!(context_transform, ContextHost, |scope, args, rv, state, this| {
    let Some(matrix) = args::matrix(scope, args.get(0)) else {
        return;
    };
    host::ret(scope, &mut rv, this.context.transform(&matrix));
});

host_method!(context_set_matrix, ContextHost, |scope, args, rv, state, this| {
    let Some(matrix) = args::matrix(scope, args.get(0)) else {
        return;
    };
    host::ret(scope, &mut rv, this.context.set_matrix(&matrix));
});

host_method!(context_set_source, ContextHost, |scope, args, rv, state, this| {
    let value = args.get(0);
    let (Some(source), Ok(object)) = (
        host::unwrap::<PatternHost>(scope, value),
        v8::Local::<v8::Object>::try_from(value),
    ) else {
        return host::throw_type_error(scope, "Must pass `source`, a Pattern");
    };

    match this.context.set_source(&source.pattern) {
        Ok(()) => this.remember_source(scope, source.pattern.clone(), object),
        Err(err) => host::throw(scope, &err),
    }
});

host_method!(context_set_source_surface, ContextHost, |scope, args, rv, state, this| {
    let value = args.get(0);
    let (Some(surface), Ok(object)) = (
        host::unwrap::<SurfaceHost>(scope, value),
        v8::Local::<v8::Object>::try_from(value),
    ) else {
        return host::throw_type_error(scope, "Must pass `surface`, an ImageSurface");
    };

    let offset = [args.get(1), args.get(2)];
    if !offset.iter().all(|value| value.is_number()) {
        return host::throw_type_error(scope, "Must pass `x` and `y`: two Numbers");
    }
    let x = offset[0].number_value(scope).unwrap_or_default();
    let y = offset[1].number_value(scope).unwrap_or_default();

    let installed = this
        .context
        .set_source_surface(&surface.surface, x, y)
        .and_then(|()| this.context.source());

    match installed {
        Ok(pattern) => {
            if let Some(source) = instantiate(scope, state, pattern.clone(), Some(object)) {
                this.remember_source(scope, pattern, source);
            }
        }
        Err(err) => host::throw(scope, &err),
    }
});

host_method!(context_get_source, ContextHost, |scope, args, rv, state, this| {
    let pattern = match this.context.source() {
        Ok(pattern) => pattern,
        Err(err) => return host::throw(scope, &err),
    };

    if let Some((cached, object)) = this.source.borrow().as_ref()
        && cached.ptr_eq(&pattern)
    {
        let object = v8::Local::new(scope, object);
        rv.set(object.into());
        return;
    }

    if let Some(object) = instantiate(scope, state, pattern.clone(), None) {
        this.remember_source(scope, pattern, object);
        rv.set(object.into());
    }
});

host_method!(context_get_target, ContextHost, |scope, args, rv, state, this| {
    let target = v8::Local::new(scope, &this.target);
    rv.set(target.into());
});

host_method!(context_mask, ContextHost, |scope, args, rv, state, this| {
    let Some(mask) = host::unwrap::<PatternHost>(scope, args.get(0)) else {
        return host::throw_type_error(scope, "Must pass `pattern`, a Pattern");
    };
    host::ret(scope, &mut rv, this.context.mask(&mask.pattern));
});

host_method!(context_mask_surface, ContextHost, |scope, args, rv, state, this| {
    let Some(surface) = host::unwrap::<SurfaceHost>(scope, args.get(0)) else {
        return host::throw_type_error(scope, "Must pass `surface`, an ImageSurface");
    };

    let offset = [args.get(1), args.get(2)];
    if !offset.iter().all(|value| value.is_number()) {
        return host::throw_type_error(scope, "Must pass `x` and `y`: two Numbers");
    }
    let x = offset[0].number_value(scope).unwrap_or_default();
    let y = offset[1].number_value(scope).unwrap_or_default();

    host::ret(scope, &mut rv, this.context.mask_surface(&surface.surface, x, y));
});

host_method!(context_dispose, ContextHost, |scope, args, rv, state, this| {
    this.source.borrow_mut().take();
    this.context.dispose();
});

pub(super) fn template<'s>(
    scope: &mut v8::PinScope<'s, '_>,
) -> v8::Local<'s, v8::FunctionTemplate> {
    let class = v8::FunctionTemplate::new(scope, context_constructor);
    let name = v8::String::new(scope, "Context").unwrap();
    class.set_class_name(name);
    class.instance_template(scope).set_internal_field_count(1);

    let proto = class.prototype_template(scope);

    set_method!(scope, proto, "save", context_save);
    set_method!(scope, proto, "restore", context_restore);
    set_method!(scope, proto, "status", context_status);
    set_method!(scope, proto, "get_target", context_get_target);
    set_method!(scope, proto, "dispose", context_dispose);

    // Source
    set_method!(scope, proto, "set_source_rgb", context_set_source_rgb);
    set_method!(scope, proto, "set_source_rgba", context_set_source_rgba);
    set_method!(scope, proto, "set_source", context_set_source);
    set_method!(scope, proto, "set_source_surface", context_set_source_surface);
    set_method!(scope, proto, "get_source", context_get_source);

    // Rendering state
    set_method!(scope, proto, "set_operator", context_set_operator);
    set_method!(scope, proto, "get_operator", context_get_operator);
    set_method!(scope, proto, "set_antialias", context_set_antialias);
    set_method!(scope, proto, "get_antialias", context_get_antialias);
    set_method!(scope, proto, "set_fill_rule", context_set_fill_rule);
    set_method!(scope, proto, "get_fill_rule", context_get_fill_rule);
    set_method!(scope, proto, "set_line_width", context_set_line_width);
    set_method!(scope, proto, "get_line_width", context_get_line_width);
    set_method!(scope, proto, "set_line_cap", context_set_line_cap);
    set_method!(scope, proto, "get_line_cap", context_get_line_cap);
    set_method!(scope, proto, "set_line_join", context_set_line_join);
    set_method!(scope, proto, "get_line_join", context_get_line_join);
    set_method!(scope, proto, "set_miter_limit", context_set_miter_limit);
    set_method!(scope, proto, "get_miter_limit", context_get_miter_limit);
    set_method!(scope, proto, "set_tolerance", context_set_tolerance);
    set_method!(scope, proto, "get_tolerance", context_get_tolerance);
    set_method!(scope, proto, "set_dash", context_set_dash);
    set_method!(scope, proto, "get_dash_count", context_get_dash_count);
    set_method!(scope, proto, "get_dash", context_get_dash);

    // Paths
    set_method!(scope, proto, "new_path", context_new_path);
    set_method!(scope, proto, "new_sub_path", context_new_sub_path);
    set_method!(scope, proto, "move_to", context_move_to);
    set_method!(scope, proto, "line_to", context_line_to);
    set_method!(scope, proto, "curve_to", context_curve_to);
    set_method!(scope, proto, "rel_move_to", context_rel_move_to);
    set_method!(scope, proto, "rel_line_to", context_rel_line_to);
    set_method!(scope, proto, "rel_curve_to", context_rel_curve_to);
    set_method!(scope, proto, "rectangle", context_rectangle);
    set_method!(scope, proto, "arc", context_arc);
    set_method!(scope, proto, "arc_negative", context_arc_negative);
    set_method!(scope, proto, "close_path", context_close_path);
    set_method!(scope, proto, "has_current_point", context_has_current_point);
    set_method!(scope, proto, "get_current_point", context_get_current_point);
    set_method!(scope, proto, "path_extents", context_path_extents);

    // Drawing
    set_method!(scope, proto, "paint", context_paint);
    set_method!(scope, proto, "paint_with_alpha", context_paint_with_alpha);
    set_method!(scope, proto, "fill", context_fill);
    set_method!(scope, proto, "fill_preserve", context_fill_preserve);
    set_method!(scope, proto, "fill_extents", context_fill_extents);
    set_method!(scope, proto, "in_fill", context_in_fill);
    set_method!(scope, proto, "stroke", context_stroke);
    set_method!(scope, proto, "stroke_preserve", context_stroke_preserve);
    set_method!(scope, proto, "stroke_extents", context_stroke_extents);
    set_method!(scope, proto, "in_stroke", context_in_stroke);
    set_method!(scope, proto, "clip", context_clip);
    set_method!(scope, proto, "clip_preserve", context_clip_preserve);
    set_method!(scope, proto, "reset_clip", context_reset_clip);
    set_method!(scope, proto, "clip_extents", context_clip_extents);
    set_method!(scope, proto, "in_clip", context_in_clip);
    set_method!(scope, proto, "mask", context_mask);
    set_method!(scope, proto, "mask_surface", context_mask_surface);
    set_method!(scope, proto, "copy_page", context_copy_page);

    // Transformations
    set_method!(scope, proto, "translate", context_translate);
    set_method!(scope, proto, "scale", context_scale);
    set_method!(scope, proto, "rotate", context_rotate);
    set_method!(scope, proto, "transform", context_transform);
    set_method!(scope, proto, "set_matrix", context_set_matrix);
    set_method!(scope, proto, "get_matrix", context_get_matrix);
    set_method!(scope, proto, "identity_matrix", context_identity_matrix);
    set_method!(scope, proto, "user_to_device", context_user_to_device);
    set_method!(scope, proto, "user_to_device_distance", context_user_to_device_distance);
    set_method!(scope, proto, "device_to_user", context_device_to_user);
    set_method!(scope, proto, "device_to_user_distance", context_device_to_user_distance);

    class
}

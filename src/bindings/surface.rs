//! `cairo.Surface`: an image surface whose pixels JS reads and writes through
//! an `ArrayBuffer` without copying.

use std::cell::RefCell;
use std::ffi::c_void;

use crate::native::Format;
use crate::surface::ImageSurface;

use super::args;
use super::host::{self, Host};

pub(super) struct SurfaceHost {
    pub(super) surface: ImageSurface,

    /// `get_data()` result. Created once, detached before the pixels go away.
    pub(super) buffer: RefCell<Option<v8::Global<v8::ArrayBuffer>>>,
}

impl SurfaceHost {
    fn detach_buffer(&self, scope: &mut v8::PinScope) {
        if let Some(buffer) = self.buffer.borrow().as_ref() {
            v8::Local::new(scope, buffer).detach(None);
        }
    }
}

/// The pixels belong to the native surface; V8 never frees them.
unsafe extern "C" fn borrowed_pixels(
    _data: *mut c_void,
    _byte_length: usize,
    _deleter_data: *mut c_void,
) {
}

fn surface_constructor(
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

    let Some([format, width, height]) = args::integers::<3>(
        scope,
        &args,
        "Must pass `format`, `width` and `height`: three integers",
    ) else {
        return;
    };

    let surface = Format::try_from(format)
        .and_then(|format| ImageSurface::new(state.bridge, format, width, height));

    match surface {
        Ok(surface) => {
            let this = args.this();
            let record = SurfaceHost {
                surface,
                buffer: RefCell::new(None),
            };
            host::wrap(scope, state, this, Host::Surface(record));
            rv.set(this.into());
        }
        Err(err) => host::throw(scope, &err),
    }
}

host_method!(surface_flush, SurfaceHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.surface.flush());
});

host_method!(surface_mark_dirty, SurfaceHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.surface.mark_dirty());
});

host_method!(surface_mark_dirty_rectangle, SurfaceHost, |scope, args, rv, state, this| {
    let Some([x, y, width, height]) = args::integers::<4>(
        scope,
        &args,
        "Must pass `x`, `y`, `width` and `height`: four integers",
    ) else {
        return;
    };
    host::ret(scope, &mut rv, this.surface.mark_dirty_rectangle(x, y, width, height));
});

host_method!(surface_get_width, SurfaceHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, Ok(this.surface.width()));
});

host_method!(surface_get_height, SurfaceHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, Ok(this.surface.height()));
});

host_method!(surface_get_stride, SurfaceHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, Ok(this.surface.stride()));
});

host_method!(surface_get_format, SurfaceHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, Ok(this.surface.format()));
});

host_method!(surface_get_data, SurfaceHost, |scope, args, rv, state, this| {
    if let Some(buffer) = this.buffer.borrow().as_ref() {
        let buffer = v8::Local::new(scope, buffer);
        rv.set(buffer.into());
        return;
    }

    let view = match this.surface.data() {
        Ok(view) => view,
        Err(err) => return host::throw(scope, &err),
    };
    let base = match view.base_ptr() {
        Ok(base) => base,
        Err(err) => return host::throw(scope, &err),
    };

    let buffer = if view.is_empty() {
        v8::ArrayBuffer::new(scope, 0)
    } else {
        // SAFETY: the pixels stay valid until the view is detached, and the
        // buffer is detached at the same points (finish, dispose, collection).
        let store = unsafe {
            v8::ArrayBuffer::new_backing_store_from_ptr(
                base.as_ptr() as *mut c_void,
                view.len(),
                borrowed_pixels,
                std::ptr::null_mut(),
            )
        }
        .make_shared();
        v8::ArrayBuffer::with_backing_store(scope, &store)
    };

    *this.buffer.borrow_mut() = Some(v8::Global::new(scope, buffer));
    rv.set(buffer.into());
});

host_method!(surface_finish, SurfaceHost, |scope, args, rv, state, this| {
    this.detach_buffer(scope);
    host::ret(scope, &mut rv, this.surface.finish());
});

host_method!(surface_status, SurfaceHost, |scope, args, rv, state, this| {
    host::ret(scope, &mut rv, this.surface.status());
});

host_method!(surface_dispose, SurfaceHost, |scope, args, rv, state, this| {
    this.detach_buffer(scope);
    this.surface.dispose();
});

pub(super) fn template<'s>(
    scope: &mut v8::PinScope<'s, '_>,
) -> v8::Local<'s, v8::FunctionTemplate> {
    let class = v8::FunctionTemplate::new(scope, surface_constructor);
    let name = v8::String::new(scope, "Surface").unwrap();
    class.set_class_name(name);
    class.instance_template(scope).set_internal_field_count(1);

    let proto = class.prototype_template(scope);
    set_method!(scope, proto, "flush", surface_flush);
    set_method!(scope, proto, "mark_dirty", surface_mark_dirty);
    set_method!(scope, proto, "mark_dirty_rectangle", surface_mark_dirty_rectangle);
    set_method!(scope, proto, "get_width", surface_get_width);
    set_method!(scope, proto, "get_height", surface_get_height);
    set_method!(scope, proto, "get_stride", surface_get_stride);
    set_method!(scope, proto, "get_format", surface_get_format);
    set_method!(scope, proto, "get_data", surface_get_data);
    set_method!(scope, proto, "finish", surface_finish);
    set_method!(scope, proto, "status", surface_status);
    set_method!(scope, proto, "dispose", surface_dispose);

    class
}

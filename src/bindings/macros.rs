//! Common macros for the cairo bindings.

/// Add a native function to a template, as a method (prototype template) or
/// a static (function template).
///
/// # Example
/// ```ignore
/// set_method!(scope, proto, "flush", surface_flush);
/// ```
macro_rules! set_method {
    ($scope:expr, $template:expr, $name:literal, $callback:expr) => {{
        let method = v8::FunctionTemplate::new($scope, $callback);
        let key = v8::String::new($scope, $name).unwrap();
        $template.set(key.into(), method.into());
    }};
}

/// Store the binding state in the global scope as a V8 External.
macro_rules! store_state {
    ($scope:expr, $state:expr) => {{
        let state_ptr = Box::into_raw(Box::new($state)) as *mut std::ffi::c_void;
        let external = v8::External::new($scope, state_ptr);
        let global = $scope.get_current_context().global($scope);
        let state_key = v8::String::new($scope, "__cairoState").unwrap();
        global.set($scope, state_key.into(), external.into());
    }};
}

/// Get the binding state from the global scope.
///
/// Returns `Option<&CairoState>`.
macro_rules! get_state {
    ($scope:expr) => {{
        (|| -> Option<&$crate::bindings::host::CairoState> {
            let global = $scope.get_current_context().global($scope);
            let state_key = v8::String::new($scope, "__cairoState")?;
            let state_val = global.get($scope, state_key.into())?;

            if !state_val.is_external() {
                return None;
            }

            let external: v8::Local<v8::External> = state_val.try_into().ok()?;
            let state_ptr = external.value() as *const $crate::bindings::host::CairoState;
            Some(unsafe { &*state_ptr })
        })()
    }};
}

/// Define a prototype method of a host class.
///
/// The body runs with the binding state, a held `HostLock`, and `this`
/// unwrapped to the host record of the class. Calling the method on any other
/// receiver throws a `TypeError`.
///
/// # Example
/// ```ignore
/// host_method!(surface_flush, SurfaceHost, |scope, args, rv, state, this| {
///     host::ret(scope, &mut rv, this.surface.flush());
/// });
/// ```
macro_rules! host_method {
    (
        $name:ident,
        $class:ty,
        |$scope:ident, $args:ident, $rv:ident, $state:ident, $this:ident| $body:block
    ) => {
        #[allow(unused_variables, unused_mut)]
        fn $name(
            $scope: &mut v8::PinScope,
            $args: v8::FunctionCallbackArguments,
            mut $rv: v8::ReturnValue,
        ) {
            let Some($state) = get_state!($scope) else {
                return;
            };
            let _lock = $state.lock();

            let receiver = $args.this().into();
            let Some($this) = $crate::bindings::host::unwrap::<$class>($scope, receiver) else {
                $crate::bindings::host::throw_type_error($scope, "Illegal invocation");
                return;
            };

            $body
        }
    };
}

#![cfg(feature = "v8")]

use std::pin::pin;
use std::rc::Rc;

use cairo_bridge_v8::bindings::{IsolateSink, init_platform, setup_cairo};
use cairo_bridge_v8::gc::ExternalMemorySink;
use cairo_bridge_v8::{Bridge, BridgeConfig};

fn leaked_bridge(config: BridgeConfig) -> &'static Bridge {
    Box::leak(Box::new(Bridge::new(config)))
}

/// Run `source` in a fresh context with the bindings installed and return
/// the completion value as a string.
fn run(bridge: &'static Bridge, source: &str) -> String {
    run_steps(bridge, &[source]).remove(0)
}

/// Run each script in turn in one context and collect their completion
/// values. The isolate is gone when this returns.
fn run_steps(bridge: &'static Bridge, sources: &[&str]) -> Vec<String> {
    init_platform();

    let mut isolate = v8::Isolate::new(Default::default());
    let sink = IsolateSink::new(&mut isolate);

    let scope = pin!(v8::HandleScope::new(&mut isolate));
    let mut scope = scope.init();
    let context = v8::Context::new(&scope, Default::default());
    let scope = &mut v8::ContextScope::new(&mut scope, context);

    setup_cairo(scope, bridge, sink);

    sources
        .iter()
        .map(|source| {
            let code = v8::String::new(scope, source).unwrap();
            let script = v8::Script::compile(scope, code, None).expect("Failed to compile script");
            let result = script.run(scope).expect("Script should not throw");
            result.to_string(scope).unwrap().to_rust_string_lossy(scope)
        })
        .collect()
}

struct NullSink;

impl ExternalMemorySink for NullSink {
    fn adjust_external_memory(&self, _delta: i64) {}
}

#[test]
fn test_surface_construction_and_data() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const s = new cairo.Surface(cairo.FORMAT_ARGB32, 10, 10);
        const data = s.get_data();
        [
            s.get_width(),
            s.get_height(),
            s.get_stride(),
            s.get_format() === cairo.FORMAT_ARGB32,
            data.byteLength,
            data === s.get_data(),
            s.status() === cairo.STATUS_SUCCESS,
        ].join(',');
        "#,
    );

    assert_eq!(result, "10,10,40,true,400,true,true");
    assert_eq!(bridge.accountant().charged(), 400);
}

#[test]
fn test_drawing_is_visible_through_the_array_buffer() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const s = new cairo.Surface(cairo.FORMAT_ARGB32, 4, 4);
        const cr = new cairo.Context(s);
        cr.set_source_rgb(1, 0, 0);
        cr.rectangle(0, 0, 2, 4);
        cr.fill();
        s.flush();

        const pixels = new Uint32Array(s.get_data());
        const painted = pixels[0] === 0xffff0000;
        const untouched = pixels[3] === 0;

        pixels[3] = 0xff00ff00;
        s.mark_dirty();
        const written = new Uint32Array(s.get_data())[3] === 0xff00ff00;

        [painted, untouched, written, cr.get_target() === s].join(',');
        "#,
    );

    assert_eq!(result, "true,true,true,true");
}

#[test]
fn test_validation_errors_map_to_js_errors() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        function name(f) {
            try { f(); return 'none'; } catch (e) { return e.name; }
        }
        [
            name(() => cairo.Surface(0, 1, 1)),
            name(() => new cairo.Surface('a', 1, 1)),
            name(() => new cairo.Surface(99, 1, 1)),
            name(() => new cairo.Surface(cairo.FORMAT_A8, 1.5, 1)),
            name(() => new cairo.Pattern()),
            name(() => cairo.Pattern.create_rgb(1)),
            name(() => new cairo.Context({})),
            name(() => cairo.Pattern.create_rgb(1, 1, 1).get_surface()),
        ].join(',');
        "#,
    );

    assert_eq!(
        result,
        "TypeError,TypeError,RangeError,TypeError,TypeError,TypeError,TypeError,Error"
    );
}

#[test]
fn test_methods_reject_foreign_receivers() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const p = cairo.Pattern.create_rgb(0, 0, 0);
        const messages = [];
        try { cairo.Surface.prototype.flush.call({}); } catch (e) { messages.push(e.message); }
        try { cairo.Surface.prototype.flush.call(p); } catch (e) { messages.push(e.message); }
        messages.join('|');
        "#,
    );

    assert_eq!(result, "Illegal invocation|Illegal invocation");
}

#[test]
fn test_pattern_api() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const p = cairo.Pattern.create_linear(0, 0, 10, 0);
        p.add_color_stop_rgb(0, 1, 0, 0);
        p.add_color_stop_rgba(1, 0, 0, 1, 0.5);
        p.set_extend(cairo.EXTEND_REPEAT);

        let invalid;
        try { p.set_extend(42); } catch (e) { invalid = e.name; }

        const stop = p.get_color_stop_rgba(1);
        const points = p.get_linear_points();
        [
            p instanceof cairo.Pattern,
            p.get_type() === cairo.PATTERN_TYPE_LINEAR,
            p.get_color_stop_count(),
            stop.offset, stop.b, stop.a,
            points.x1,
            invalid,
            p.get_extend() === cairo.EXTEND_REPEAT,
            JSON.stringify(cairo.Pattern.create_rgba(0, 0.5, 1, 1).get_rgba()),
        ].join(',');
        "#,
    );

    assert_eq!(result, r#"true,true,2,1,1,0.5,10,RangeError,true,{"r":0,"g":0.5,"b":1,"a":1}"#);
}

#[test]
fn test_sources_keep_their_js_identity() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const target = new cairo.Surface(cairo.FORMAT_ARGB32, 2, 2);
        const image = new cairo.Surface(cairo.FORMAT_ARGB32, 1, 1);
        const cr = new cairo.Context(target);

        const solid = cairo.Pattern.create_rgb(0, 1, 0);
        cr.set_source(solid);
        const same = cr.get_source() === solid;

        cr.set_source_surface(image, 1, 1);
        const source = cr.get_source();
        const fromSurface = source.get_surface() === image;
        const stable = cr.get_source() === source;

        cr.set_source_rgb(0, 0, 0);
        const fresh = cr.get_source();
        const replaced = fresh !== source && fresh.get_type() === cairo.PATTERN_TYPE_SOLID;

        const forSurface = cairo.Pattern.create_for_surface(image);
        [same, fromSurface, stable, replaced, forSurface.get_surface() === image].join(',');
        "#,
    );

    assert_eq!(result, "true,true,true,true,true");
}

#[test]
fn test_context_state_objects() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const cr = new cairo.Context(new cairo.Surface(cairo.FORMAT_ARGB32, 10, 10));
        cr.set_dash([1, 2], 0.5);
        cr.translate(3, 4);
        cr.move_to(1, 1);
        const point = cr.get_current_point();
        cr.rectangle(0, 0, 2, 2);

        let restore;
        const fresh = new cairo.Context(new cairo.Surface(cairo.FORMAT_A8, 1, 1));
        try { fresh.restore(); } catch (e) { restore = e.name; }

        [
            JSON.stringify(cr.get_dash()),
            cr.get_matrix().x0,
            cr.get_matrix().y0,
            point.x, point.y,
            JSON.stringify(cr.path_extents()),
            cr.in_fill(1, 1),
            JSON.stringify(cr.user_to_device(0, 0)),
            restore,
            fresh.status() === cairo.STATUS_INVALID_RESTORE,
        ].join(';');
        "#,
    );

    let expected = [
        r#"{"dashes":[1,2],"offset":0.5}"#,
        "3",
        "4",
        "1",
        "1",
        r#"{"x1":0,"y1":0,"x2":2,"y2":2}"#,
        "true",
        r#"{"x":3,"y":4}"#,
        "Error",
        "true",
    ];
    assert_eq!(result, expected.join(";"));
}

#[test]
fn test_dispose_detaches_the_array_buffer() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const s = new cairo.Surface(cairo.FORMAT_A8, 8, 8);
        const data = s.get_data();
        const before = data.byteLength;
        s.dispose();
        s.dispose();

        let error;
        try { s.flush(); } catch (e) { error = e.message; }
        [before, data.byteLength, error].join(',');
        "#,
    );

    assert_eq!(result, "64,0,Surface has been released");
    assert_eq!(bridge.accountant().charged(), 0);
}

#[test]
fn test_finish_detaches_the_array_buffer() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        const s = new cairo.Surface(cairo.FORMAT_RGB24, 2, 2);
        const data = s.get_data();
        s.finish();

        s.flush();
        let dirty;
        try { s.mark_dirty(); } catch (e) { dirty = e.name; }
        [data.byteLength, dirty, s.status() === cairo.STATUS_SURFACE_FINISHED].join(',');
        "#,
    );

    assert_eq!(result, "0,Error,true");
    assert_eq!(bridge.accountant().charged(), 0);
}

#[test]
fn test_collected_pattern_keeps_its_surface_until_collected_itself() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let results = run_steps(
        bridge,
        &[
            r#"
            (() => {
                const s = new cairo.Surface(cairo.FORMAT_ARGB32, 2, 1);
                new Uint32Array(s.get_data()).fill(0xff0000ff);
                s.mark_dirty();
                globalThis.pattern = cairo.Pattern.create_for_surface(s);
            })();
            'created';
            "#,
            "gc(); gc(); 'collected';",
            r#"
            (() => {
                const target = new cairo.Surface(cairo.FORMAT_ARGB32, 2, 1);
                const cr = new cairo.Context(target);
                cr.set_source(pattern);
                cr.paint();
                target.flush();
                const painted = new Uint32Array(target.get_data())[0] === 0xff0000ff;
                return [painted, pattern.get_surface().get_width()].join(',');
            })();
            "#,
            "globalThis.pattern = null; 'dropped';",
            "for (let i = 0; i < 6; i++) gc(); 'collected';",
        ],
    );

    assert_eq!(results[2], "true,2");

    let _lock = bridge.lock(Rc::new(NullSink));
    assert_eq!(bridge.finalizer().pending(), 0);
    assert_eq!(bridge.accountant().charged(), 0);
}

#[test]
fn test_memory_cap_is_an_error() {
    let bridge = leaked_bridge(BridgeConfig::default().with_max_external_memory(1000));
    let result = run(
        bridge,
        r#"
        const kept = new cairo.Surface(cairo.FORMAT_A8, 20, 20);
        let name;
        try { new cairo.Surface(cairo.FORMAT_ARGB32, 20, 20); } catch (e) { name = e.name; }
        name;
        "#,
    );

    assert_eq!(result, "Error");
    assert_eq!(bridge.accountant().charged(), 400);
}

#[test]
fn test_constants() {
    let bridge = leaked_bridge(BridgeConfig::default());
    let result = run(
        bridge,
        r#"
        [
            cairo.FORMAT_ARGB32, cairo.FORMAT_A8, cairo.FORMAT_RGB16_565,
            cairo.EXTEND_PAD, cairo.FILTER_BILINEAR,
            cairo.OPERATOR_DEST_OVER, cairo.FILL_RULE_EVEN_ODD,
            cairo.LINE_CAP_SQUARE, cairo.LINE_JOIN_BEVEL, cairo.ANTIALIAS_BEST,
        ].join(',');
        "#,
    );

    assert_eq!(result, "0,2,4,3,4,7,1,2,2,6");
}

use std::cell::Cell;
use std::rc::Rc;

use cairo_bridge_v8::gc::ExternalMemorySink;
use cairo_bridge_v8::{
    Bridge, BridgeConfig, Context, Format, ImageSurface, Materialization, Pattern,
};

#[derive(Default)]
struct RecordingSink {
    total: Cell<i64>,
}

impl ExternalMemorySink for RecordingSink {
    fn adjust_external_memory(&self, delta: i64) {
        self.total.set(self.total.get() + delta);
    }
}

#[test]
fn test_host_sees_every_byte_once() {
    let bridge = Bridge::new(BridgeConfig::default());
    let sink = Rc::new(RecordingSink::default());

    // Created outside any lock: reported when the host next locks.
    let early = ImageSurface::new(&bridge, Format::Argb32, 8, 8).unwrap();
    assert_eq!(sink.total.get(), 0);

    {
        let _lock = bridge.lock(sink.clone());
        assert_eq!(sink.total.get(), 256);

        let during = ImageSurface::new(&bridge, Format::A8, 4, 4).unwrap();
        assert_eq!(sink.total.get(), 272);
        drop(during);
        assert_eq!(sink.total.get(), 256);
    }

    drop(early);
    assert_eq!(sink.total.get(), 256);

    let _lock = bridge.lock(sink.clone());
    assert_eq!(sink.total.get(), 0);
    assert_eq!(bridge.accountant().charged(), 0);
}

#[test]
fn test_collector_thread_finalization_is_applied_on_next_lock() {
    let bridge = Bridge::new(BridgeConfig::default());
    let sink = Rc::new(RecordingSink::default());

    let surface = ImageSurface::new(&bridge, Format::Argb32, 4, 4).unwrap();
    let pattern = Pattern::create_for_surface(&surface).unwrap();
    let cr = Context::new(&surface).unwrap();
    let weak = surface.downgrade();
    drop(surface);

    {
        let _lock = bridge.lock(sink.clone());
        assert_eq!(sink.total.get(), 64);
    }

    let finalizer = bridge.finalizer();
    std::thread::spawn(move || {
        finalizer.defer(pattern);
        finalizer.defer(cr);
    })
    .join()
    .unwrap();

    assert!(weak.is_alive());
    assert_eq!(bridge.finalizer().pending(), 2);

    let _lock = bridge.lock(sink.clone());
    assert!(!weak.is_alive());
    assert_eq!(bridge.finalizer().pending(), 0);
    assert_eq!(sink.total.get(), 0);
}

#[test]
fn test_lazy_materialization_charges_on_demand() {
    let bridge = Bridge::new(BridgeConfig::default().with_materialization(Materialization::Lazy));
    let sink = Rc::new(RecordingSink::default());
    let _lock = bridge.lock(sink.clone());

    let surface = ImageSurface::new(&bridge, Format::Rgb24, 2, 2).unwrap();
    assert_eq!(sink.total.get(), 0);

    surface.data().unwrap();
    assert_eq!(sink.total.get(), 16);

    surface.finish().unwrap();
    assert_eq!(sink.total.get(), 0);
}

#[test]
fn test_config_from_json() {
    let config: BridgeConfig = serde_json::from_str(
        r#"{ "max_dimension": 1024, "materialization": "lazy", "max_external_memory": 1048576 }"#,
    )
    .unwrap();

    assert_eq!(config.max_dimension, 1024);
    assert_eq!(config.materialization, Materialization::Lazy);
    assert_eq!(config.max_external_memory, Some(1 << 20));

    let defaults: BridgeConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, BridgeConfig::default());
}

#[test]
fn test_dimension_limit_comes_from_config() {
    let bridge = Bridge::new(BridgeConfig::default().with_max_dimension(16));

    assert!(ImageSurface::new(&bridge, Format::A8, 16, 16).is_ok());
    assert!(ImageSurface::new(&bridge, Format::A8, 17, 1).is_err());
}

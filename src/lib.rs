pub mod bridge;
pub mod buffer_view;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod gc;
pub mod handle;
pub mod native;
pub mod pattern;
pub mod surface;

#[cfg(feature = "v8")]
pub mod bindings;

// Core API
pub use bridge::{Bridge, init_bridge};
pub use buffer_view::BufferView;
pub use config::{BridgeConfig, Materialization};
pub use context::{Context, Extents};
pub use error::{BridgeError, ErrorKind, Result};
pub use pattern::Pattern;
pub use surface::{ImageSurface, WeakSurface};

// Engine enumerations and values accepted by the wrappers
pub use native::{
    Antialias, ColorStop, Extend, FillRule, Filter, Format, LineCap, LineJoin, Matrix, Operator,
    PatternType, Status,
};

//! The native 2D engine: libcairo, linked through `cairo-sys-rs`.
//!
//! cairo hands out objects as raw pointers carrying one reference, counts
//! references itself and frees an object when the last one is destroyed.
//! Failures are recorded as a sticky status on the object rather than
//! returned, so every caller checks the status after a call that can fail.
//!
//! ```text
//! ┌──────────────┐  reference   ┌─────────────────┐
//! │   cairo_t    │─────────────▶│ cairo_surface_t │◀──┐
//! └──────┬───────┘   (target)   └─────────────────┘   │ reference
//!        │ reference (source)                         │
//!        ▼                                            │
//! ┌─────────────────┐─────────────────────────────────┘
//! │ cairo_pattern_t │
//! └─────────────────┘
//! ```
//!
//! This module only carries the typed tables shared with host code. Calls
//! go through [`ffi`] from the handle layer and the wrappers.

mod matrix;
mod types;

pub use cairo_sys as ffi;
pub use ffi::{cairo_pattern_t, cairo_surface_t, cairo_t};

pub use matrix::Matrix;
pub use types::{
    Antialias, ColorStop, Extend, FillRule, Filter, Format, LineCap, LineJoin, Operator,
    PatternType, Status, stride_for_width,
};

/// Largest width or height cairo accepts for an image surface.
pub const MAX_IMAGE_SIZE: i32 = 32767;

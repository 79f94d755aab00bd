//! Stable enumerations shared by the engine and its callers.
//!
//! Every value is cairo's own constant, so host code passes the same
//! integers it would pass to cairo.

use std::ffi::CStr;
use std::fmt;

use super::ffi;

macro_rules! native_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:path),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            /// Every variant, in numeric order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Convert a raw integer, `None` if it names no variant.
            pub fn from_raw(value: i32) -> Option<Self> {
                Self::ALL.iter().copied().find(|variant| variant.as_raw() == value)
            }

            pub fn as_raw(self) -> i32 {
                self as i32
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value.as_raw()
            }
        }
    };
}

native_enum! {
    /// Post-call result indicator, sticky on the object it describes.
    Status {
        Success = ffi::STATUS_SUCCESS,
        NoMemory = ffi::STATUS_NO_MEMORY,
        InvalidRestore = ffi::STATUS_INVALID_RESTORE,
        InvalidPopGroup = ffi::STATUS_INVALID_POP_GROUP,
        NoCurrentPoint = ffi::STATUS_NO_CURRENT_POINT,
        InvalidMatrix = ffi::STATUS_INVALID_MATRIX,
        InvalidStatus = ffi::STATUS_INVALID_STATUS,
        NullPointer = ffi::STATUS_NULL_POINTER,
        InvalidString = ffi::STATUS_INVALID_STRING,
        InvalidPathData = ffi::STATUS_INVALID_PATH_DATA,
        ReadError = ffi::STATUS_READ_ERROR,
        WriteError = ffi::STATUS_WRITE_ERROR,
        SurfaceFinished = ffi::STATUS_SURFACE_FINISHED,
        SurfaceTypeMismatch = ffi::STATUS_SURFACE_TYPE_MISMATCH,
        PatternTypeMismatch = ffi::STATUS_PATTERN_TYPE_MISMATCH,
        InvalidContent = ffi::STATUS_INVALID_CONTENT,
        InvalidFormat = ffi::STATUS_INVALID_FORMAT,
        InvalidVisual = ffi::STATUS_INVALID_VISUAL,
        FileNotFound = ffi::STATUS_FILE_NOT_FOUND,
        InvalidDash = ffi::STATUS_INVALID_DASH,
        InvalidDscComment = ffi::STATUS_INVALID_DSC_COMMENT,
        InvalidIndex = ffi::STATUS_INVALID_INDEX,
        ClipNotRepresentable = ffi::STATUS_CLIP_NOT_REPRESENTABLE,
        TempFileError = ffi::STATUS_TEMP_FILE_ERROR,
        InvalidStride = ffi::STATUS_INVALID_STRIDE,
        FontTypeMismatch = ffi::STATUS_FONT_TYPE_MISMATCH,
        UserFontImmutable = ffi::STATUS_USER_FONT_IMMUTABLE,
        UserFontError = ffi::STATUS_USER_FONT_ERROR,
        NegativeCount = ffi::STATUS_NEGATIVE_COUNT,
        InvalidClusters = ffi::STATUS_INVALID_CLUSTERS,
        InvalidSlant = ffi::STATUS_INVALID_SLANT,
        InvalidWeight = ffi::STATUS_INVALID_WEIGHT,
        InvalidSize = ffi::STATUS_INVALID_SIZE,
        UserFontNotImplemented = ffi::STATUS_USER_FONT_NOT_IMPLEMENTED,
        DeviceTypeMismatch = ffi::STATUS_DEVICE_TYPE_MISMATCH,
        DeviceError = ffi::STATUS_DEVICE_ERROR,
        InvalidMeshConstruction = ffi::STATUS_INVALID_MESH_CONSTRUCTION,
        DeviceFinished = ffi::STATUS_DEVICE_FINISHED,
        Jbig2GlobalMissing = ffi::STATUS_J_BIG2_GLOBAL_MISSING,
        PngError = ffi::STATUS_PNG_ERROR,
        FreetypeError = ffi::STATUS_FREETYPE_ERROR,
        Win32GdiError = ffi::STATUS_WIN32_GDI_ERROR,
        TagError = ffi::STATUS_TAG_ERROR,
        DwriteError = ffi::STATUS_DWRITE_ERROR,
    }
}

impl Status {
    /// Status reported by the engine. Codes newer than this table collapse
    /// to `InvalidStatus`.
    pub(crate) fn from_engine(raw: ffi::cairo_status_t) -> Self {
        Self::from_raw(raw).unwrap_or_else(|| {
            tracing::warn!("Unknown engine status {}", raw);
            Status::InvalidStatus
        })
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Human readable description from `cairo_status_to_string`.
    pub fn message(self) -> &'static str {
        // SAFETY: cairo returns a static, NUL terminated string for every
        // status value.
        let message = unsafe { CStr::from_ptr(ffi::cairo_status_to_string(self.as_raw())) };
        message.to_str().unwrap_or("unknown status")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

native_enum! {
    /// Pixel layout of an image surface.
    Format {
        Argb32 = ffi::FORMAT_A_RGB32,
        Rgb24 = ffi::FORMAT_RGB24,
        A8 = ffi::FORMAT_A8,
        A1 = ffi::FORMAT_A1,
        Rgb16_565 = ffi::FORMAT_RGB16_565,
        Rgb30 = ffi::FORMAT_RGB30,
    }
}

/// Row length in bytes for `width` pixels of `format`, as
/// `cairo_format_stride_for_width` computes it. `-1` for widths cairo
/// rejects.
pub fn stride_for_width(format: Format, width: i32) -> i32 {
    // SAFETY: pure function of its arguments.
    unsafe { ffi::cairo_format_stride_for_width(format.as_raw(), width) }
}

native_enum! {
    /// What a pattern paints outside its natural area.
    Extend {
        None = ffi::EXTEND_NONE,
        Repeat = ffi::EXTEND_REPEAT,
        Reflect = ffi::EXTEND_REFLECT,
        Pad = ffi::EXTEND_PAD,
    }
}

native_enum! {
    /// Sampling filter used when reading pattern pixels.
    Filter {
        Fast = ffi::FILTER_FAST,
        Good = ffi::FILTER_GOOD,
        Best = ffi::FILTER_BEST,
        Nearest = ffi::FILTER_NEAREST,
        Bilinear = ffi::FILTER_BILINEAR,
        Gaussian = ffi::FILTER_GAUSSIAN,
    }
}

native_enum! {
    PatternType {
        Solid = ffi::PATTERN_TYPE_SOLID,
        Surface = ffi::PATTERN_TYPE_SURFACE,
        Linear = ffi::PATTERN_TYPE_LINEAR_GRADIENT,
        Radial = ffi::PATTERN_TYPE_RADIAL_GRADIENT,
        Mesh = ffi::PATTERN_TYPE_MESH,
        RasterSource = ffi::PATTERN_TYPE_RASTER_SOURCE,
    }
}

native_enum! {
    /// Compositing operator.
    Operator {
        Clear = ffi::OPERATOR_CLEAR,
        Source = ffi::OPERATOR_SOURCE,
        Over = ffi::OPERATOR_OVER,
        In = ffi::OPERATOR_IN,
        Out = ffi::OPERATOR_OUT,
        Atop = ffi::OPERATOR_ATOP,
        Dest = ffi::OPERATOR_DEST,
        DestOver = ffi::OPERATOR_DEST_OVER,
        DestIn = ffi::OPERATOR_DEST_IN,
        DestOut = ffi::OPERATOR_DEST_OUT,
        DestAtop = ffi::OPERATOR_DEST_ATOP,
        Xor = ffi::OPERATOR_XOR,
        Add = ffi::OPERATOR_ADD,
        Saturate = ffi::OPERATOR_SATURATE,
        Multiply = ffi::OPERATOR_MULTIPLY,
        Screen = ffi::OPERATOR_SCREEN,
        Overlay = ffi::OPERATOR_OVERLAY,
        Darken = ffi::OPERATOR_DARKEN,
        Lighten = ffi::OPERATOR_LIGHTEN,
        ColorDodge = ffi::OPERATOR_COLOR_DODGE,
        ColorBurn = ffi::OPERATOR_COLOR_BURN,
        HardLight = ffi::OPERATOR_HARD_LIGHT,
        SoftLight = ffi::OPERATOR_SOFT_LIGHT,
        Difference = ffi::OPERATOR_DIFFERENCE,
        Exclusion = ffi::OPERATOR_EXCLUSION,
        HslHue = ffi::OPERATOR_HSL_HUE,
        HslSaturation = ffi::OPERATOR_HSL_SATURATION,
        HslColor = ffi::OPERATOR_HSL_COLOR,
        HslLuminosity = ffi::OPERATOR_HSL_LUMINOSITY,
    }
}

native_enum! {
    FillRule {
        Winding = ffi::FILL_RULE_WINDING,
        EvenOdd = ffi::FILL_RULE_EVEN_ODD,
    }
}

native_enum! {
    LineCap {
        Butt = ffi::LINE_CAP_BUTT,
        Round = ffi::LINE_CAP_ROUND,
        Square = ffi::LINE_CAP_SQUARE,
    }
}

native_enum! {
    LineJoin {
        Miter = ffi::LINE_JOIN_MITER,
        Round = ffi::LINE_JOIN_ROUND,
        Bevel = ffi::LINE_JOIN_BEVEL,
    }
}

native_enum! {
    Antialias {
        Default = ffi::ANTIALIAS_DEFAULT,
        None = ffi::ANTIALIAS_NONE,
        Gray = ffi::ANTIALIAS_GRAY,
        Subpixel = ffi::ANTIALIAS_SUBPIXEL,
        Fast = ffi::ANTIALIAS_FAST,
        Good = ffi::ANTIALIAS_GOOD,
        Best = ffi::ANTIALIAS_BEST,
    }
}

/// One color stop of a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

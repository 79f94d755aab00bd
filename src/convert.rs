//! Validation of raw integers coming from host code.
//!
//! Enumerated parameters are checked before any native call, so a rejected
//! value never changes object state.

use crate::error::BridgeError;
use crate::native::{Antialias, Extend, FillRule, Filter, Format, LineCap, LineJoin, Operator};

macro_rules! host_enum {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl TryFrom<i32> for $ty {
                type Error = BridgeError;

                fn try_from(value: i32) -> Result<Self, Self::Error> {
                    <$ty>::from_raw(value).ok_or_else(|| {
                        BridgeError::Range(format!("Must pass a valid '{}' integer", $name))
                    })
                }
            }
        )+
    };
}

host_enum! {
    Format => "format",
    Extend => "extend",
    Filter => "filter",
    Operator => "operator",
    FillRule => "fill_rule",
    LineCap => "line_cap",
    LineJoin => "line_join",
    Antialias => "antialias",
}

/// A host number as an `i32`, or `None` when it is not an integer in range.
pub fn integer(value: f64) -> Option<i32> {
    let in_range = value >= i32::MIN as f64 && value <= i32::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i32)
}

/// A host number as an enumerated value.
///
/// Not an integer is a `Type` error carrying `message`; an integer naming
/// no value is the `Range` error of the type's conversion.
pub fn enumeration<T>(value: f64, message: &str) -> Result<T, BridgeError>
where
    T: TryFrom<i32, Error = BridgeError>,
{
    let raw = integer(value).ok_or_else(|| BridgeError::Type(message.to_string()))?;
    T::try_from(raw)
}

//! Argument extraction. Each helper throws and returns `None` on failure.

use crate::convert::{self, integer};
use crate::error::BridgeError;
use crate::native::Matrix;

use super::host::{throw, throw_type_error};

/// The first `N` arguments as numbers, or a `TypeError` with `message`.
pub(super) fn numbers<const N: usize>(
    scope: &mut v8::PinScope,
    args: &v8::FunctionCallbackArguments,
    message: &str,
) -> Option<[f64; N]> {
    let mut out = [0.0; N];

    for (index, slot) in out.iter_mut().enumerate() {
        let value = args.get(index as i32);
        match value.is_number().then(|| value.number_value(scope)).flatten() {
            Some(number) => *slot = number,
            None => {
                throw_type_error(scope, message);
                return None;
            }
        }
    }

    Some(out)
}

/// The first `N` arguments as integers, or a `TypeError` with `message`.
pub(super) fn integers<const N: usize>(
    scope: &mut v8::PinScope,
    args: &v8::FunctionCallbackArguments,
    message: &str,
) -> Option<[i32; N]> {
    let numbers = numbers::<N>(scope, args, message)?;
    let mut out = [0; N];

    for (slot, number) in out.iter_mut().zip(numbers) {
        let Some(value) = integer(number) else {
            throw_type_error(scope, message);
            return None;
        };
        *slot = value;
    }

    Some(out)
}

/// An enumerated argument: `TypeError` when not an integer, `RangeError`
/// when it names no value.
pub(super) fn enumeration<T>(
    scope: &mut v8::PinScope,
    args: &v8::FunctionCallbackArguments,
    message: &str,
) -> Option<T>
where
    T: TryFrom<i32, Error = BridgeError>,
{
    let [raw] = numbers::<1>(scope, args, message)?;
    match convert::enumeration::<T>(raw, message) {
        Ok(value) => Some(value),
        Err(err) => {
            throw(scope, &err);
            None
        }
    }
}

/// A `{ xx, yx, xy, yy, x0, y0 }` object.
pub(super) fn matrix(scope: &mut v8::PinScope, value: v8::Local<v8::Value>) -> Option<Matrix> {
    const MESSAGE: &str =
        "Must pass `matrix`, an object with Number `xx`, `yx`, `xy`, `yy`, `x0` and `y0`";

    let Ok(object) = v8::Local::<v8::Object>::try_from(value) else {
        throw_type_error(scope, MESSAGE);
        return None;
    };

    let mut fields = [0.0; 6];
    for (slot, name) in fields.iter_mut().zip(["xx", "yx", "xy", "yy", "x0", "y0"]) {
        let key = v8::String::new(scope, name).unwrap();
        let number = object
            .get(scope, key.into())
            .filter(|field| field.is_number())
            .and_then(|field| field.number_value(scope));

        match number {
            Some(number) => *slot = number,
            None => {
                throw_type_error(scope, MESSAGE);
                return None;
            }
        }
    }

    let [xx, yx, xy, yy, x0, y0] = fields;
    Some(Matrix::new(xx, yx, xy, yy, x0, y0))
}

/// An Array of numbers.
pub(super) fn number_array(
    scope: &mut v8::PinScope,
    value: v8::Local<v8::Value>,
    message: &str,
) -> Option<Vec<f64>> {
    let Ok(array) = v8::Local::<v8::Array>::try_from(value) else {
        throw_type_error(scope, message);
        return None;
    };

    let mut out = Vec::with_capacity(array.length() as usize);
    for index in 0..array.length() {
        let number = array
            .get_index(scope, index)
            .filter(|item| item.is_number())
            .and_then(|item| item.number_value(scope));

        match number {
            Some(number) => out.push(number),
            None => {
                throw_type_error(scope, message);
                return None;
            }
        }
    }

    Some(out)
}

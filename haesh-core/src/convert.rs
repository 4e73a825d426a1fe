use indexmap::IndexMap;
use num_bigint::BigInt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::value::{Callable, Composite, CompositeData, Number, Value};

/// Conversion of Rust data into a raw [`Value`].
///
/// Can be derived for structs and enums with `#[derive(IntoValue)]`.
/// The result is not canonical until it goes through the engine.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &Value {
    fn into_value(self) -> Value {
        self.clone()
    }
}

impl IntoValue for Composite {
    fn into_value(self) -> Value {
        Value::Composite(self)
    }
}

impl IntoValue for CompositeData {
    fn into_value(self) -> Value {
        Value::Composite(Composite::new(self))
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::Number(Number::Int(self as i64))
                }
            }
        )*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        match i64::try_from(self) {
            Ok(n) => Value::Number(Number::Int(n)),
            Err(_) => Value::BigInt(BigInt::from(self)),
        }
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        (self as u64).into_value()
    }
}

impl IntoValue for i128 {
    fn into_value(self) -> Value {
        Value::BigInt(BigInt::from(self))
    }
}

impl IntoValue for u128 {
    fn into_value(self) -> Value {
        Value::BigInt(BigInt::from(self))
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Number(Number::Float(self as f64))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Number(Number::Float(self))
    }
}

impl IntoValue for Number {
    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

impl IntoValue for BigInt {
    fn into_value(self) -> Value {
        Value::BigInt(self)
    }
}

impl IntoValue for Callable {
    fn into_value(self) -> Value {
        Value::Callable(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(Arc::from(self))
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(Arc::from(self))
    }
}

impl IntoValue for Arc<str> {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::array(self)
    }
}

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn into_value(self) -> Value {
        Value::array(self)
    }
}

impl<K: Into<String>, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn into_value(self) -> Value {
        Value::object(self)
    }
}

impl<K: Into<String>, V: IntoValue, S> IntoValue for HashMap<K, V, S> {
    fn into_value(self) -> Value {
        Value::object(self)
    }
}

impl<K: Into<String>, V: IntoValue, S> IntoValue for IndexMap<K, V, S> {
    fn into_value(self) -> Value {
        Value::object(self)
    }
}

macro_rules! from_via_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    value.into_value()
                }
            }
        )*
    };
}

from_via_into_value!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, i128, u128, f32, f64, Number, BigInt,
    Callable, String, &str, Composite, CompositeData
);

//! Serde support for [`Value`].
//!
//! Serialization writes composites as maps and sequences, `Null` and
//! `Undefined` as unit, and big integers as decimal strings. Callables and
//! opaque handles have no data form and fail to serialize.
//!
//! Deserialization accepts any self-describing format and produces raw
//! (non-canonical) composites, ready to be handed to the engine.

use indexmap::IndexMap;
use num_bigint::BigInt;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

use crate::convert::IntoValue;
use crate::value::{Composite, CompositeData, Number, Value};

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Undefined => serializer.serialize_unit(),
            Value::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            Value::Number(Number::Float(n)) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::BigInt(b) => serializer.collect_str(b),
            Value::Composite(c) => c.serialize(serializer),
            Value::Callable(_) => Err(ser::Error::custom("callable values cannot be serialized")),
            Value::Opaque(_) => Err(ser::Error::custom("opaque values cannot be serialized")),
        }
    }
}

impl Serialize for Composite {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.data() {
            CompositeData::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            CompositeData::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a null, boolean, number, string, sequence or map")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(Number::Int(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(v.into_value())
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Value, E> {
        Ok(match i64::try_from(v) {
            Ok(n) => Value::Number(Number::Int(n)),
            Err(_) => Value::BigInt(BigInt::from(v)),
        })
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Value, E> {
        Ok(match i64::try_from(v) {
            Ok(n) => Value::Number(Number::Int(n)),
            Err(_) => Value::BigInt(BigInt::from(v)),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(Number::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(v.into_value())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(v.into_value())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(CompositeData::Array(items).into_value())
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.insert(key, value);
        }
        Ok(CompositeData::Object(entries).into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Callable, Kind};

    #[test]
    fn json_into_raw_composites() {
        let value: Value =
            serde_json::from_str(r#"{"a": [1, 2.5, "x", true, null], "b": {}}"#).unwrap();
        let root = value.as_composite().unwrap();
        assert!(root.is_object());
        let a = root.get("a").unwrap().as_composite().unwrap();
        assert_eq!(a.len(), 5);
        assert_eq!(a.at(0).and_then(Value::as_i64), Some(1));
        assert_eq!(a.at(1).and_then(Value::as_f64), Some(2.5));
        assert_eq!(a.at(2).and_then(Value::as_str), Some("x"));
        assert_eq!(a.at(4).map(Value::kind), Some(Kind::Null));
    }

    #[test]
    fn large_unsigned_becomes_bigint() {
        let value: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(value.kind(), Kind::BigInt);
    }

    #[test]
    fn serialize_preserves_key_order() {
        let value = Value::object([("z", 1), ("a", 2)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn bigint_serializes_as_string() {
        let big: BigInt = "123456789012345678901234567890".parse().unwrap();
        let json = serde_json::to_string(&Value::array([big])).unwrap();
        assert_eq!(json, r#"["123456789012345678901234567890"]"#);
    }

    #[test]
    fn callables_refuse_to_serialize() {
        let value = Value::array([Callable::from_source("() => 1")]);
        assert!(serde_json::to_string(&value).is_err());
    }
}

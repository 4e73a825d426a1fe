use indexmap::IndexMap;
use num_bigint::BigInt;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::convert::IntoValue;

/// A value that can be handed to the engine.
///
/// Primitives are compared by value. Composites are compared by identity:
/// two [`Composite`]s are "the same" only if they share one allocation.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Undefined,
    Number(Number),
    String(Arc<str>),
    Boolean(bool),
    BigInt(BigInt),
    Callable(Callable),
    Composite(Composite),
    /// A symbol-like handle. Accepted by the value model but rejected by the engine.
    Opaque(Opaque),
}

/// Numeric primitive. Integers and floats never share a token.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Runtime category of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Undefined,
    Number,
    String,
    Boolean,
    BigInt,
    Callable,
    Object,
    Array,
    Opaque,
}

impl Kind {
    /// Returns true for objects and arrays.
    pub fn is_composite(self) -> bool {
        matches!(self, Kind::Object | Kind::Array)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Undefined => "undefined",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Boolean => "boolean",
            Kind::BigInt => "bigint",
            Kind::Callable => "callable",
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// Determines the runtime category of a value.
pub fn classify(value: &Value) -> Kind {
    match value {
        Value::Null => Kind::Null,
        Value::Undefined => Kind::Undefined,
        Value::Number(_) => Kind::Number,
        Value::String(_) => Kind::String,
        Value::Boolean(_) => Kind::Boolean,
        Value::BigInt(_) => Kind::BigInt,
        Value::Callable(_) => Kind::Callable,
        Value::Composite(c) => match c.data() {
            CompositeData::Object(_) => Kind::Object,
            CompositeData::Array(_) => Kind::Array,
        },
        Value::Opaque(_) => Kind::Opaque,
    }
}

impl Value {
    /// Builds a raw (not yet canonical) object from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Value
    where
        K: Into<String>,
        V: IntoValue,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into_value()))
            .collect();
        Value::Composite(Composite::new(CompositeData::Object(map)))
    }

    /// Builds a raw (not yet canonical) array.
    pub fn array<V, I>(items: I) -> Value
    where
        V: IntoValue,
        I: IntoIterator<Item = V>,
    {
        let items = items.into_iter().map(IntoValue::into_value).collect();
        Value::Composite(Composite::new(CompositeData::Array(items)))
    }

    pub fn kind(&self) -> Kind {
        classify(self)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Value::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(Number::Float(n)) => Some(*n),
            Value::Number(Number::Int(n)) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Identity comparison: composites by allocation, primitives by value.
    ///
    /// Callables compare by source text and opaque handles by their id.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Number(Number::Int(a)), Value::Number(Number::Int(b))) => a == b,
            (Value::Number(Number::Float(a)), Value::Number(Number::Float(b))) => {
                a.to_bits() == b.to_bits()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.source() == b.source(),
            (Value::Composite(a), Value::Composite(b)) => Composite::ptr_eq(a, b),
            (Value::Opaque(a), Value::Opaque(b)) => a.id == b.id,
            _ => false,
        }
    }
}

type Body = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A callable value, identified by its source text.
///
/// Two callables with the same source are the same value for canonicalization,
/// even when their bodies are distinct closures.
#[derive(Clone)]
pub struct Callable {
    source: Arc<str>,
    body: Option<Body>,
}

impl Callable {
    /// Creates a callable with source text only.
    pub fn from_source(source: impl Into<Arc<str>>) -> Self {
        Callable {
            source: source.into(),
            body: None,
        }
    }

    /// Creates a callable with source text and an invocable body.
    pub fn new<F>(source: impl Into<Arc<str>>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Callable {
            source: source.into(),
            body: Some(Arc::new(body)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Invokes the body, if there is one.
    pub fn call(&self, args: &[Value]) -> Option<Value> {
        self.body.as_ref().map(|body| body(args))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("source", &self.source)
            .field("invocable", &self.body.is_some())
            .finish()
    }
}

static NEXT_OPAQUE_ID: AtomicU64 = AtomicU64::new(0);

/// A unique handle, like a symbol. Every `Opaque::new` call yields a distinct value.
#[derive(Clone, Debug)]
pub struct Opaque {
    id: u64,
    description: Arc<str>,
}

impl Opaque {
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Opaque {
            id: NEXT_OPAQUE_ID.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Contents of an object or array.
#[derive(Clone, Debug)]
pub enum CompositeData {
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
}

impl CompositeData {
    pub fn len(&self) -> usize {
        match self {
            CompositeData::Object(map) => map.len(),
            CompositeData::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A shared, immutable object or array.
///
/// There is no mutable access to the contents: once a composite is handed out
/// by the engine, no alias can write through it. [`Composite::to_data`] gives
/// an owned copy to build a modified value from.
#[derive(Clone)]
pub struct Composite(Arc<CompositeData>);

impl Composite {
    pub fn new(data: CompositeData) -> Self {
        Composite(Arc::new(data))
    }

    pub fn data(&self) -> &CompositeData {
        &self.0
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(a: &Composite, b: &Composite) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Clones the contents into an owned, editable copy.
    pub fn to_data(&self) -> CompositeData {
        (*self.0).clone()
    }

    pub fn is_object(&self) -> bool {
        matches!(*self.0, CompositeData::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(*self.0, CompositeData::Array(_))
    }

    /// Looks up an object field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match &*self.0 {
            CompositeData::Object(map) => map.get(key),
            CompositeData::Array(_) => None,
        }
    }

    /// Looks up an array element.
    pub fn at(&self, index: usize) -> Option<&Value> {
        match &*self.0 {
            CompositeData::Array(items) => items.get(index),
            CompositeData::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn downgrade(&self) -> Weak<CompositeData> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn as_ptr(&self) -> *const CompositeData {
        Arc::as_ptr(&self.0)
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            CompositeData::Object(map) => f.debug_map().entries(map.iter()).finish(),
            CompositeData::Array(items) => f.debug_list().entries(items.iter()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_distinguishes_null_undefined_object_array() {
        assert_eq!(classify(&Value::Null), Kind::Null);
        assert_eq!(classify(&Value::Undefined), Kind::Undefined);
        assert_eq!(classify(&Value::object([("a", 1)])), Kind::Object);
        assert_eq!(classify(&Value::array([1, 2])), Kind::Array);
        assert_eq!(classify(&Value::Opaque(Opaque::new("sym"))), Kind::Opaque);
    }

    #[test]
    fn composite_clones_share_identity() {
        let value = Value::array([1, 2, 3]);
        let a = value.as_composite().unwrap().clone();
        let b = a.clone();
        assert!(Composite::ptr_eq(&a, &b));

        let other = Value::array([1, 2, 3]);
        assert!(!Composite::ptr_eq(&a, other.as_composite().unwrap()));
    }

    #[test]
    fn to_data_is_detached_copy() {
        let value = Value::object([("a", 1)]);
        let original = value.as_composite().unwrap();
        let mut copy = original.to_data();
        if let CompositeData::Object(map) = &mut copy {
            map.insert("a".to_string(), Value::Number(Number::Int(2)));
        }
        assert_eq!(original.get("a").and_then(Value::as_i64), Some(1));
    }

    #[test]
    fn opaque_handles_are_unique() {
        let a = Value::Opaque(Opaque::new("x"));
        let b = Value::Opaque(Opaque::new("x"));
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn callable_invocation() {
        let double = Callable::new("(x) => x * 2", |args: &[Value]| match args.first() {
            Some(Value::Number(Number::Int(n))) => Value::Number(Number::Int(n * 2)),
            _ => Value::Undefined,
        });
        let out = double.call(&[Value::Number(Number::Int(21))]);
        assert_eq!(out.and_then(|v| v.as_i64()), Some(42));
        assert!(Callable::from_source("() => {}").call(&[]).is_none());
    }
}

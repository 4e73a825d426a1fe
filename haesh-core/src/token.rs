//! Primitive tokens.
//!
//! Every primitive reduces to a short string that stands in for it inside a
//! composite's signature. Strings and callables are interned: the first
//! occurrence of a piece of text gets the next free number, later occurrences
//! reuse it. The tables only grow; they are emptied on teardown.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::{Number, Value};

pub(crate) const NULL_TOKEN: &str = "n";
pub(crate) const UNDEFINED_TOKEN: &str = "";
pub(crate) const TRUE_TOKEN: &str = "t";
pub(crate) const FALSE_TOKEN: &str = "f";

/// String and callable interning tables.
#[derive(Debug, Default)]
pub struct TokenTables {
    strings: HashMap<Arc<str>, Arc<str>>,
    callables: HashMap<Arc<str>, Arc<str>>,
}

impl TokenTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token for a primitive, or `None` for composites and opaque values.
    pub fn primitive(&mut self, value: &Value) -> Option<Arc<str>> {
        let token = match value {
            Value::Null => Arc::from(NULL_TOKEN),
            Value::Undefined => Arc::from(UNDEFINED_TOKEN),
            Value::Boolean(true) => Arc::from(TRUE_TOKEN),
            Value::Boolean(false) => Arc::from(FALSE_TOKEN),
            Value::Number(n) => Arc::from(number_token(*n)),
            Value::BigInt(b) => Arc::from(format!("B{b}")),
            Value::String(s) => self.string(s),
            Value::Callable(c) => self.callable(c.source()),
            Value::Composite(_) | Value::Opaque(_) => return None,
        };
        Some(token)
    }

    /// Looks up or assigns the token for a string.
    pub fn string(&mut self, text: &Arc<str>) -> Arc<str> {
        intern(&mut self.strings, 's', text)
    }

    /// Looks up or assigns the token for a callable's source text.
    pub fn callable(&mut self, source: &str) -> Arc<str> {
        intern(&mut self.callables, 'c', &Arc::from(source))
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn callable_count(&self) -> usize {
        self.callables.len()
    }

    pub fn clear(&mut self) {
        self.strings.clear();
        self.callables.clear();
    }
}

fn intern(table: &mut HashMap<Arc<str>, Arc<str>>, prefix: char, text: &Arc<str>) -> Arc<str> {
    if let Some(token) = table.get(text) {
        return token.clone();
    }
    let token: Arc<str> = Arc::from(format!("{prefix}{}", table.len()));
    table.insert(text.clone(), token.clone());
    token
}

/// Integers and floats use different prefixes, so `1` and `1.0` never share a
/// token. Floats use the shortest round-trip form, which keeps the sign of zero.
fn number_token(n: Number) -> String {
    match n {
        Number::Int(i) => format!("i{i}"),
        Number::Float(f) => format!("d{f:?}"),
    }
}

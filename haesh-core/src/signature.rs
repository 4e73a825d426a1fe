use std::fmt;

/// A 32-byte BLAKE3 digest of a canonical signature.
///
/// The reference cache and TTL registry are keyed by this, and a canonical
/// composite appears as `#<hex>` inside its parent's signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key([u8; 32]);

impl Key {
    /// Computes the key of the given data.
    pub fn from_data(data: &[u8]) -> Self {
        Key(*blake3::hash(data).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Token used for this composite inside an enclosing signature.
    pub(crate) fn token(&self) -> String {
        format!("#{self}")
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Canonical signature of a composite.
///
/// Arrays render as `[<len>;<tokens>]` with element tokens sorted, objects as
/// `{<key>:<token>,...}` with keys sorted. The string is an in-process cache
/// key only.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Builds an array signature. Element order does not matter.
    pub fn array<T: AsRef<str>>(mut tokens: Vec<T>) -> Self {
        if tokens.len() > 1 {
            tokens.sort_unstable_by(|a, b| a.as_ref().cmp(b.as_ref()));
        }
        let mut out = String::new();
        out.push('[');
        out.push_str(&tokens.len().to_string());
        out.push(';');
        join_into(&mut out, tokens.iter().map(AsRef::as_ref));
        out.push(']');
        Signature(out)
    }

    /// Builds an object signature from `(key, token)` pairs. Key order does not matter.
    pub fn object<K: AsRef<str>, T: AsRef<str>>(mut pairs: Vec<(K, T)>) -> Self {
        if pairs.len() > 1 {
            pairs.sort_unstable_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
        }
        let mut out = String::from("{");
        for (i, (key, token)) in pairs.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            escape_key_into(&mut out, key.as_ref());
            out.push(':');
            out.push_str(token.as_ref());
        }
        out.push('}');
        Signature(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self) -> Key {
        Key::from_data(self.0.as_bytes())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn join_into<'a>(out: &mut String, parts: impl Iterator<Item = &'a str>) {
    for (i, part) in parts.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(part);
    }
}

/// Backslash-escapes every character with structural meaning in a signature.
fn escape_key_into(out: &mut String, key: &str) {
    for ch in key.chars() {
        if matches!(ch, '\\' | ':' | ',' | ';' | '{' | '}' | '[' | ']' | '#') {
            out.push('\\');
        }
        out.push(ch);
    }
}

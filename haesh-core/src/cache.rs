use std::collections::HashMap;
use std::sync::Weak;

use crate::signature::Key;
use crate::value::{Composite, CompositeData};

/// Owning table from signature key to the one canonical instance for it.
///
/// Holds a strong reference to every entry; only the TTL sweep or teardown
/// removes entries.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    entries: HashMap<Key, Composite>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &Key) -> Option<&Composite> {
        self.entries.get(key)
    }

    /// Registers `instance` under `key` and returns the canonical instance.
    ///
    /// If an entry already exists it wins and `instance` is dropped, so at most
    /// one canonical instance per key is ever live in the cache.
    pub fn store(&mut self, key: Key, instance: Composite) -> Composite {
        self.entries.entry(key).or_insert(instance).clone()
    }

    pub fn remove(&mut self, key: &Key) -> Option<Composite> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Non-owning index from a live canonical instance back to its key.
///
/// Entries are keyed by allocation address and hold a `Weak`, which pins the
/// allocation so the address cannot be reused while the entry exists. Entries
/// whose instance has been dropped are pruned by [`IdentityIndex::prune`].
#[derive(Debug, Default)]
pub struct IdentityIndex {
    entries: HashMap<usize, (Weak<CompositeData>, Key)>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: &Composite, key: Key) {
        self.entries
            .insert(instance.as_ptr() as usize, (instance.downgrade(), key));
    }

    /// Returns the key of `instance` if it was handed out by this engine.
    pub fn lookup(&self, instance: &Composite) -> Option<Key> {
        let (weak, key) = self.entries.get(&(instance.as_ptr() as usize))?;
        std::ptr::eq(weak.as_ptr(), instance.as_ptr()).then_some(*key)
    }

    /// Drops entries whose instance is no longer alive anywhere.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn composite(value: Value) -> Composite {
        value.as_composite().unwrap().clone()
    }

    #[test]
    fn first_writer_wins() {
        let mut cache = ReferenceCache::new();
        let key = Key::from_data(b"[1;i1]");
        let first = composite(Value::array([1]));
        let second = composite(Value::array([1]));

        let stored = cache.store(key, first.clone());
        let again = cache.store(key, second.clone());

        assert!(Composite::ptr_eq(&stored, &first));
        assert!(Composite::ptr_eq(&again, &first));
        assert!(!Composite::ptr_eq(&again, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_drops_entry() {
        let mut cache = ReferenceCache::new();
        let key = Key::from_data(b"k");
        cache.store(key, composite(Value::array([1])));
        assert!(cache.lookup(&key).is_some());
        assert!(cache.remove(&key).is_some());
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn identity_lookup_is_by_instance() {
        let mut index = IdentityIndex::new();
        let key = Key::from_data(b"k");
        let known = composite(Value::array([1]));
        let lookalike = composite(Value::array([1]));

        index.insert(&known, key);

        assert_eq!(index.lookup(&known), Some(key));
        assert_eq!(index.lookup(&known.clone()), Some(key));
        assert_eq!(index.lookup(&lookalike), None);
    }

    #[test]
    fn prune_drops_dead_instances_only() {
        let mut index = IdentityIndex::new();
        let alive = composite(Value::array([1]));
        index.insert(&alive, Key::from_data(b"a"));
        {
            let dead = composite(Value::array([2]));
            index.insert(&dead, Key::from_data(b"b"));
        }
        assert_eq!(index.len(), 2);
        assert_eq!(index.prune(), 1);
        assert_eq!(index.len(), 1);
        assert!(index.lookup(&alive).is_some());
    }
}

use indexmap::IndexMap;
use log::{debug, trace};
use std::sync::Arc;

use crate::cache::{IdentityIndex, ReferenceCache};
use crate::config::{EngineConfig, Options};
use crate::signature::{Key, Signature};
use crate::state::{StateSnapshot, StateView};
use crate::token::TokenTables;
use crate::ttl::{Clock, Lifetime, SweepScheduler, TtlRegistry};
use crate::value::{Composite, CompositeData, Kind, Value, classify};

/// Error type for canonicalization.
#[derive(Debug, thiserror::Error)]
pub enum HaeshError {
    #[error("unsupported value type: {kind}")]
    UnsupportedType { kind: Kind },
    #[error("nested composite at depth {depth} was not obtained from this engine")]
    NotInterned { depth: usize },
    /// The cache lost an instance it had just produced. Always a bug.
    #[error("reference is missing in memory: {key}")]
    MissingReference { key: Key },
    #[error("composite nesting exceeds the limit of {limit}")]
    DepthExceeded { limit: usize },
}

/// Canonicalizing cache for composite values.
///
/// Structurally equal objects and arrays come back as the same shared
/// instance, so callers can detect change by identity
/// ([`Composite::ptr_eq`]) instead of deep comparison.
///
/// - Object key order and array element order do not affect identity.
/// - In strict mode (the default) nested composites must already have been
///   canonicalized by this engine; in permissive mode they are canonicalized
///   on the way in.
/// - Entries given a finite [`Lifetime`] are evicted by a deferred sweep once
///   they have not been used for that long.
///
/// # Example
///
/// ```
/// use haesh_core::{Composite, Haesh, Value};
///
/// let mut engine = Haesh::new();
/// let a = engine.canonicalize(&Value::object([("x", 1), ("y", 2)])).unwrap();
/// let b = engine.canonicalize(&Value::object([("y", 2), ("x", 1)])).unwrap();
/// assert!(Composite::ptr_eq(a.as_composite().unwrap(), b.as_composite().unwrap()));
/// ```
///
/// Teardown via [`Haesh::destroy`] leaves the engine equivalent to a freshly
/// constructed one with the same options.
pub struct Haesh {
    strict: bool,
    max_depth: usize,
    tokens: TokenTables,
    cache: ReferenceCache,
    identities: IdentityIndex,
    ttl: TtlRegistry,
    scheduler: Box<dyn SweepScheduler>,
    clock: Box<dyn Clock>,
    view: StateView,
}

impl Haesh {
    /// Creates a strict engine with an idle-backed sweep.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_options(Options::from(config))
    }

    pub fn with_options(options: Options) -> Self {
        let engine = Haesh {
            strict: options.strict,
            max_depth: options.max_depth,
            tokens: TokenTables::new(),
            cache: ReferenceCache::new(),
            identities: IdentityIndex::new(),
            ttl: TtlRegistry::new(),
            scheduler: options.scheduler,
            clock: options.clock,
            view: StateView::new(),
        };
        if let Some(on_state_ready) = options.on_state_ready {
            on_state_ready(engine.state_view());
        }
        engine
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Canonicalizes `value` with no expiry.
    pub fn canonicalize(&mut self, value: &Value) -> Result<Value, HaeshError> {
        self.canonicalize_for(value, Lifetime::Infinite)
    }

    /// Canonicalizes `value`, keeping its cache entry for `lifetime` after this use.
    ///
    /// Primitives, `Null` and `Undefined` are returned as they are. A due sweep
    /// runs before anything else.
    pub fn canonicalize_for(
        &mut self,
        value: &Value,
        lifetime: impl Into<Lifetime>,
    ) -> Result<Value, HaeshError> {
        let lifetime = lifetime.into();
        self.poll();
        let result = self.canonicalize_value(value, lifetime);
        self.publish();
        result
    }

    fn canonicalize_value(
        &mut self,
        value: &Value,
        lifetime: Lifetime,
    ) -> Result<Value, HaeshError> {
        match value {
            Value::Composite(composite) => {
                let (canonical, _) = self.intern(composite, lifetime, 0)?;
                if lifetime.is_finite() {
                    self.schedule_sweep();
                }
                Ok(Value::Composite(canonical))
            }
            Value::Opaque(_) => Err(HaeshError::UnsupportedType {
                kind: classify(value),
            }),
            primitive => Ok(primitive.clone()),
        }
    }

    /// Returns true if `value` is a composite this engine handed out.
    pub fn is_canonical(&self, value: &Value) -> bool {
        value
            .as_composite()
            .is_some_and(|c| self.identities.lookup(c).is_some())
    }

    fn intern(
        &mut self,
        composite: &Composite,
        lifetime: Lifetime,
        depth: usize,
    ) -> Result<(Composite, Key), HaeshError> {
        if depth > self.max_depth {
            return Err(HaeshError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        if let Some(key) = self.identities.lookup(composite) {
            return Ok((self.reinstate(composite, key, lifetime), key));
        }

        let (signature, copy) = match composite.data() {
            CompositeData::Object(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                let mut copy = IndexMap::with_capacity(map.len());
                for (name, child) in map {
                    let (token, slot) = self.reduce(child, depth)?;
                    pairs.push((name.as_str(), token));
                    copy.insert(name.clone(), slot);
                }
                (Signature::object(pairs), CompositeData::Object(copy))
            }
            CompositeData::Array(items) => {
                let mut tokens = Vec::with_capacity(items.len());
                let mut copy = Vec::with_capacity(items.len());
                for child in items {
                    let (token, slot) = self.reduce(child, depth)?;
                    tokens.push(token);
                    copy.push(slot);
                }
                (Signature::array(tokens), CompositeData::Array(copy))
            }
        };

        let key = signature.key();
        self.ttl.touch(key, lifetime, self.clock.now());

        if let Some(existing) = self.cache.lookup(&key) {
            trace!("cache hit for {signature}");
            return Ok((existing.clone(), key));
        }

        let instance = self.cache.store(key, Composite::new(copy));
        self.identities.insert(&instance, key);
        debug!("stored canonical entry {key} for {signature}");
        Ok((instance, key))
    }

    /// Reduces one child of a composite to its token and the value for the
    /// canonical copy's slot.
    fn reduce(&mut self, child: &Value, depth: usize) -> Result<(Arc<str>, Value), HaeshError> {
        match child {
            Value::Composite(nested) => {
                let (canonical, key) = match self.identities.lookup(nested) {
                    Some(key) => (nested.clone(), key),
                    None if self.strict => {
                        return Err(HaeshError::NotInterned { depth: depth + 1 });
                    }
                    None => {
                        let (canonical, key) = self.intern(nested, Lifetime::Infinite, depth + 1)?;
                        if self.identities.lookup(&canonical) != Some(key) {
                            return Err(HaeshError::MissingReference { key });
                        }
                        (canonical, key)
                    }
                };
                Ok((Arc::from(key.token()), Value::Composite(canonical)))
            }
            primitive => {
                let token = self
                    .tokens
                    .primitive(primitive)
                    .ok_or(HaeshError::UnsupportedType {
                        kind: classify(primitive),
                    })?;
                Ok((token, primitive.clone()))
            }
        }
    }

    /// Handles a composite this engine already handed out.
    ///
    /// Normally that instance is still the cache entry and comes back as is.
    /// If its entry was swept, it becomes the entry again, unless another
    /// instance took the signature in the meantime; then that one is returned.
    fn reinstate(&mut self, composite: &Composite, key: Key, lifetime: Lifetime) -> Composite {
        self.ttl.touch(key, lifetime, self.clock.now());
        match self.cache.lookup(&key) {
            Some(existing) => existing.clone(),
            None => {
                debug!("reinstating swept entry {key}");
                self.cache.store(key, composite.clone())
            }
        }
    }

    fn schedule_sweep(&mut self) {
        if self.scheduler.schedule(self.clock.now()) {
            trace!("sweep scheduled");
        }
    }

    /// Cooperative turn: runs the pending sweep if it is due.
    ///
    /// Returns the number of entries evicted.
    pub fn poll(&mut self) -> usize {
        self.run_pending(false)
    }

    /// Signals spare capacity. An idle-backed pending sweep runs now.
    pub fn idle(&mut self) -> usize {
        self.run_pending(true)
    }

    fn run_pending(&mut self, idle: bool) -> usize {
        let now = self.clock.now();
        if !self.scheduler.is_due(now, idle) {
            return 0;
        }
        self.scheduler.cancel();
        let evicted = self.sweep_due();
        if !self.ttl.is_empty() {
            self.schedule_sweep();
            self.publish();
        }
        evicted
    }

    /// Evicts every entry whose expiry has passed, regardless of scheduling.
    ///
    /// Idempotent. Identity records of instances that are gone everywhere are
    /// dropped as well.
    pub fn sweep_due(&mut self) -> usize {
        let expired = self.ttl.take_expired(self.clock.now());
        for key in &expired {
            self.cache.remove(key);
        }
        let pruned = self.identities.prune();
        if !expired.is_empty() || pruned > 0 {
            debug!(
                "sweep evicted {} entries, pruned {} identities",
                expired.len(),
                pruned
            );
        }
        self.publish();
        expired.len()
    }

    /// Cancels the pending sweep, if any.
    pub fn cancel_pending(&mut self) {
        self.scheduler.cancel();
        self.publish();
    }

    /// Cancels the pending sweep and empties every table.
    ///
    /// Instances already handed out stay valid but are no longer recognized.
    pub fn destroy(&mut self) {
        self.cancel_pending();
        self.tokens.clear();
        self.cache.clear();
        self.identities.clear();
        self.ttl.clear();
        self.publish();
        debug!("engine torn down");
    }

    pub fn state(&self) -> StateSnapshot {
        StateSnapshot {
            strings: self.tokens.string_count(),
            callables: self.tokens.callable_count(),
            entries: self.cache.len(),
            ttl_records: self.ttl.len(),
            identities: self.identities.len(),
            sweep_pending: self.scheduler.is_pending(),
        }
    }

    /// Returns a handle that keeps reflecting this engine's table sizes.
    pub fn state_view(&self) -> StateView {
        self.view.clone()
    }

    fn publish(&self) {
        self.view.publish(self.state());
    }
}

impl Default for Haesh {
    fn default() -> Self {
        Self::new()
    }
}

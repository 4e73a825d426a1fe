//! Table sizes, as a point-in-time snapshot or a live shared view.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Sizes of the engine's tables at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSnapshot {
    pub strings: usize,
    pub callables: usize,
    pub entries: usize,
    pub ttl_records: usize,
    pub identities: usize,
    pub sweep_pending: bool,
}

impl StateSnapshot {
    /// True when every table is empty and no sweep is pending.
    pub fn is_empty(&self) -> bool {
        self.strings == 0
            && self.callables == 0
            && self.entries == 0
            && self.ttl_records == 0
            && self.identities == 0
            && !self.sweep_pending
    }
}

#[derive(Debug, Default)]
struct Counters {
    strings: AtomicUsize,
    callables: AtomicUsize,
    entries: AtomicUsize,
    ttl_records: AtomicUsize,
    identities: AtomicUsize,
    sweep_pending: AtomicBool,
}

/// Read-only handle on an engine's live table sizes.
///
/// Clones share the same counters, and the engine republishes them at the end
/// of every operation, so a handle obtained at construction keeps tracking
/// the engine for its whole life. Counters are read one at a time; a snapshot
/// taken from another thread mid-operation may mix two states.
#[derive(Debug, Clone, Default)]
pub struct StateView {
    counters: Arc<Counters>,
}

impl StateView {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, state: StateSnapshot) {
        let c = &self.counters;
        c.strings.store(state.strings, Ordering::Relaxed);
        c.callables.store(state.callables, Ordering::Relaxed);
        c.entries.store(state.entries, Ordering::Relaxed);
        c.ttl_records.store(state.ttl_records, Ordering::Relaxed);
        c.identities.store(state.identities, Ordering::Relaxed);
        c.sweep_pending.store(state.sweep_pending, Ordering::Release);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let c = &self.counters;
        let sweep_pending = c.sweep_pending.load(Ordering::Acquire);
        StateSnapshot {
            strings: c.strings.load(Ordering::Relaxed),
            callables: c.callables.load(Ordering::Relaxed),
            entries: c.entries.load(Ordering::Relaxed),
            ttl_records: c.ttl_records.load(Ordering::Relaxed),
            identities: c.identities.load(Ordering::Relaxed),
            sweep_pending,
        }
    }

    pub fn entries(&self) -> usize {
        self.counters.entries.load(Ordering::Relaxed)
    }
}

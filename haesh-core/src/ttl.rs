//! Expiry bookkeeping and deferred sweep scheduling.
//!
//! The engine is single-threaded and cooperative: nothing runs in the
//! background. A scheduler only records that a sweep is pending and decides
//! when it is due; the engine runs it at its next turn (`poll`, `idle`, or the
//! start of a `canonicalize` call), never in parallel with other operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::signature::Key;

/// Default deferral for both scheduler backends.
pub const DEFAULT_SWEEP_DELAY: Duration = Duration::from_millis(1000);

/// How long a canonical entry stays in the cache after its last use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Lifetime {
    #[default]
    Infinite,
    Finite(Duration),
}

impl Lifetime {
    pub fn is_finite(self) -> bool {
        matches!(self, Lifetime::Finite(_))
    }
}

impl From<Duration> for Lifetime {
    fn from(d: Duration) -> Self {
        Lifetime::Finite(d)
    }
}

impl From<Option<Duration>> for Lifetime {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Lifetime::Infinite, Lifetime::Finite)
    }
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            origin: Instant::now(),
            offset_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// Absolute expiry per signature key. No record means no expiry.
#[derive(Debug, Default)]
pub struct TtlRegistry {
    expiries: HashMap<Key, Instant>,
}

impl TtlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes the expiry of `key`. An infinite lifetime removes the record,
    /// and so does a finite one too long to represent as an instant.
    pub fn touch(&mut self, key: Key, lifetime: Lifetime, now: Instant) {
        let died_at = match lifetime {
            Lifetime::Infinite => None,
            Lifetime::Finite(d) => now.checked_add(d),
        };
        match died_at {
            Some(died_at) => {
                self.expiries.insert(key, died_at);
            }
            None => {
                self.expiries.remove(&key);
            }
        }
    }

    #[cfg(test)]
    pub fn expiry(&self, key: &Key) -> Option<Instant> {
        self.expiries.get(key).copied()
    }

    /// Removes and returns every key whose expiry is strictly before `now`.
    pub fn take_expired(&mut self, now: Instant) -> Vec<Key> {
        let expired: Vec<Key> = self
            .expiries
            .iter()
            .filter(|(_, died_at)| **died_at < now)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            self.expiries.remove(key);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    pub fn clear(&mut self) {
        self.expiries.clear();
    }
}

/// Decides when a deferred sweep runs. At most one sweep is pending.
pub trait SweepScheduler: Send {
    /// Arms a sweep unless one is already pending. Returns true if newly armed.
    fn schedule(&mut self, now: Instant) -> bool;

    fn is_pending(&self) -> bool;

    /// Whether the pending sweep should run now. `idle` is true when the host
    /// has signalled spare capacity.
    fn is_due(&self, now: Instant, idle: bool) -> bool;

    /// Forgets the pending sweep, either because it ran or on teardown.
    fn cancel(&mut self);
}

/// Runs the sweep when the host reports idle time, or after `max_deferral`
/// at the latest.
#[derive(Debug, Clone)]
pub struct IdleScheduler {
    max_deferral: Duration,
    armed_at: Option<Instant>,
}

impl IdleScheduler {
    pub fn new(max_deferral: Duration) -> Self {
        IdleScheduler {
            max_deferral,
            armed_at: None,
        }
    }
}

impl Default for IdleScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_DELAY)
    }
}

impl SweepScheduler for IdleScheduler {
    fn schedule(&mut self, now: Instant) -> bool {
        if self.armed_at.is_some() {
            return false;
        }
        self.armed_at = Some(now);
        true
    }

    fn is_pending(&self) -> bool {
        self.armed_at.is_some()
    }

    fn is_due(&self, now: Instant, idle: bool) -> bool {
        match self.armed_at {
            Some(armed_at) => idle || deadline_passed(armed_at, self.max_deferral, now),
            None => false,
        }
    }

    fn cancel(&mut self) {
        self.armed_at = None;
    }
}

/// Runs the sweep once a fixed delay has passed. Idle signals are ignored.
#[derive(Debug, Clone)]
pub struct TimerScheduler {
    delay: Duration,
    armed_at: Option<Instant>,
}

impl TimerScheduler {
    pub fn new(delay: Duration) -> Self {
        TimerScheduler {
            delay,
            armed_at: None,
        }
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_DELAY)
    }
}

impl SweepScheduler for TimerScheduler {
    fn schedule(&mut self, now: Instant) -> bool {
        if self.armed_at.is_some() {
            return false;
        }
        self.armed_at = Some(now);
        true
    }

    fn is_pending(&self) -> bool {
        self.armed_at.is_some()
    }

    fn is_due(&self, now: Instant, _idle: bool) -> bool {
        self.armed_at
            .is_some_and(|armed_at| deadline_passed(armed_at, self.delay, now))
    }

    fn cancel(&mut self) {
        self.armed_at = None;
    }
}

/// A deadline past the representable range never passes.
fn deadline_passed(armed_at: Instant, delay: Duration, now: Instant) -> bool {
    armed_at.checked_add(delay).is_some_and(|deadline| now >= deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn touch_refreshes_instead_of_accumulating() {
        let clock = ManualClock::new();
        let mut ttl = TtlRegistry::new();
        let key = Key::from_data(b"k");

        ttl.touch(key, Lifetime::Finite(10 * MS), clock.now());
        clock.advance(5 * MS);
        ttl.touch(key, Lifetime::Finite(10 * MS), clock.now());

        assert_eq!(ttl.expiry(&key), Some(clock.now() + 10 * MS));
    }

    #[test]
    fn infinite_touch_removes_record() {
        let clock = ManualClock::new();
        let mut ttl = TtlRegistry::new();
        let key = Key::from_data(b"k");

        ttl.touch(key, Lifetime::Finite(10 * MS), clock.now());
        ttl.touch(key, Lifetime::Infinite, clock.now());

        assert!(ttl.expiry(&key).is_none());
        assert!(ttl.is_empty());
    }

    #[test]
    fn unrepresentable_expiry_is_no_expiry() {
        let clock = ManualClock::new();
        let mut ttl = TtlRegistry::new();
        let key = Key::from_data(b"k");

        ttl.touch(key, Lifetime::Finite(10 * MS), clock.now());
        ttl.touch(key, Lifetime::Finite(Duration::MAX), clock.now());
        assert!(ttl.expiry(&key).is_none());
        assert!(ttl.is_empty());
    }

    #[test]
    fn schedulers_tolerate_huge_delays() {
        let clock = ManualClock::new();
        let mut timer = TimerScheduler::new(Duration::MAX);
        let mut idle = IdleScheduler::new(Duration::MAX);
        timer.schedule(clock.now());
        idle.schedule(clock.now());

        clock.advance(Duration::from_secs(3600));
        assert!(!timer.is_due(clock.now(), true));
        assert!(!idle.is_due(clock.now(), false));
        assert!(idle.is_due(clock.now(), true));
    }

    #[test]
    fn take_expired_is_strict_and_idempotent() {
        let clock = ManualClock::new();
        let mut ttl = TtlRegistry::new();
        let key = Key::from_data(b"k");
        ttl.touch(key, Lifetime::Finite(10 * MS), clock.now());

        clock.advance(10 * MS);
        assert!(ttl.take_expired(clock.now()).is_empty());

        clock.advance(MS);
        assert_eq!(ttl.take_expired(clock.now()), vec![key]);
        assert!(ttl.take_expired(clock.now()).is_empty());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        let start = b.now();
        a.advance(3 * MS);
        assert_eq!(b.now() - start, 3 * MS);
    }

    #[test]
    fn timer_scheduler_holds_one_pending_sweep() {
        let clock = ManualClock::new();
        let mut timer = TimerScheduler::new(100 * MS);

        assert!(timer.schedule(clock.now()));
        clock.advance(50 * MS);
        assert!(!timer.schedule(clock.now()));
        assert!(!timer.is_due(clock.now(), true));

        clock.advance(50 * MS);
        assert!(timer.is_due(clock.now(), false));

        timer.cancel();
        assert!(!timer.is_pending());
        assert!(!timer.is_due(clock.now(), true));
    }

    #[test]
    fn idle_scheduler_runs_on_idle_or_deadline() {
        let clock = ManualClock::new();
        let mut idle = IdleScheduler::new(100 * MS);

        assert!(!idle.is_due(clock.now(), true));
        idle.schedule(clock.now());
        assert!(idle.is_due(clock.now(), true));
        assert!(!idle.is_due(clock.now(), false));

        clock.advance(100 * MS);
        assert!(idle.is_due(clock.now(), false));
    }

    #[test]
    fn lifetime_conversions() {
        assert_eq!(Lifetime::from(5 * MS), Lifetime::Finite(5 * MS));
        assert_eq!(Lifetime::from(None), Lifetime::Infinite);
        assert!(!Lifetime::default().is_finite());
    }
}

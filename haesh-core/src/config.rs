use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::state::StateView;
use crate::ttl::{Clock, IdleScheduler, SweepScheduler, SystemClock, TimerScheduler};

/// Default bound on composite nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Declarative engine settings, loadable from any serde format.
///
/// ```
/// let config: haesh_core::EngineConfig =
///     serde_json::from_str(r#"{ "strict": false, "sweep": { "backend": "timer" } }"#).unwrap();
/// assert!(!config.strict);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Require nested composites to be canonical already.
    pub strict: bool,
    pub max_depth: usize,
    pub sweep: SweepConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            strict: true,
            max_depth: DEFAULT_MAX_DEPTH,
            sweep: SweepConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub backend: SweepBackend,
    /// Timer delay, or the longest an idle sweep may be deferred.
    pub delay_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            backend: SweepBackend::Idle,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepBackend {
    #[default]
    Idle,
    Timer,
}

type StateCallback = Box<dyn FnOnce(StateView) + Send>;

/// Programmatic engine options.
pub struct Options {
    pub(crate) strict: bool,
    pub(crate) max_depth: usize,
    pub(crate) scheduler: Box<dyn SweepScheduler>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) on_state_ready: Option<StateCallback>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn scheduler(mut self, scheduler: impl SweepScheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Called once, during construction, with a live view of the engine's
    /// table sizes. The view stays current as the engine is used.
    pub fn on_state_ready(mut self, f: impl FnOnce(StateView) + Send + 'static) -> Self {
        self.on_state_ready = Some(Box::new(f));
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for Options {
    fn from(config: &EngineConfig) -> Self {
        let delay = Duration::from_millis(config.sweep.delay_ms);
        let scheduler: Box<dyn SweepScheduler> = match config.sweep.backend {
            SweepBackend::Idle => Box::new(IdleScheduler::new(delay)),
            SweepBackend::Timer => Box::new(TimerScheduler::new(delay)),
        };
        Options {
            strict: config.strict,
            max_depth: config.max_depth,
            scheduler,
            clock: Box::new(SystemClock),
            on_state_ready: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("strict", &self.strict)
            .field("max_depth", &self.max_depth)
            .field("on_state_ready", &self.on_state_ready.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_idle() {
        let config = EngineConfig::default();
        assert!(config.strict);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.sweep.backend, SweepBackend::Idle);
        assert_eq!(config.sweep.delay_ms, 1000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "sweep": { "backend": "timer", "delay_ms": 50 } }"#).unwrap();
        assert!(config.strict);
        assert_eq!(config.sweep.backend, SweepBackend::Timer);
        assert_eq!(config.sweep.delay_ms, 50);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<EngineConfig>(r#"{ "stric": false }"#);
        assert!(result.is_err());
    }

    #[test]
    fn options_from_config() {
        let config = EngineConfig {
            strict: false,
            max_depth: 8,
            ..EngineConfig::default()
        };
        let options = Options::from(&config);
        assert!(!options.strict);
        assert_eq!(options.max_depth, 8);
        assert!(!options.scheduler.is_pending());
    }
}

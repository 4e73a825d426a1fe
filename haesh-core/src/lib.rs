//! Haesh canonicalizes composite values so that structurally equal objects
//! and arrays resolve to one shared instance.
//!
//! Core concepts:
//! - **Value**: a primitive, or a composite (object or array) of values
//! - **Token**: the short string a primitive reduces to inside a signature
//! - **Signature**: an order-independent description of a composite's shape
//!   and content, condensed into a BLAKE3 **Key**
//! - **Haesh**: the engine; maps each key to one frozen canonical instance and
//!   evicts entries whose lifetime has run out
//!
//! # Example
//!
//! ```
//! use haesh_core::{Haesh, Options, Value};
//!
//! let mut engine = Haesh::with_options(Options::new().strict(false));
//!
//! let a = engine.canonicalize(&Value::object([("tags", Value::array(["x", "y"]))])).unwrap();
//! let b = engine.canonicalize(&Value::object([("tags", Value::array(["y", "x"]))])).unwrap();
//! assert!(a.same(&b));
//! ```
//!
//! # Strict mode
//!
//! By default nested composites must be canonical before they are embedded:
//!
//! ```
//! use haesh_core::{Haesh, HaeshError, Value};
//!
//! let mut engine = Haesh::new();
//! let raw = Value::object([("inner", Value::array([1, 2]))]);
//! assert!(matches!(engine.canonicalize(&raw), Err(HaeshError::NotInterned { .. })));
//!
//! let inner = engine.canonicalize(&Value::array([1, 2])).unwrap();
//! assert!(engine.canonicalize(&Value::object([("inner", inner)])).is_ok());
//! ```
//!
//! # Limitations
//!
//! String and callable token tables grow for the life of an engine and are
//! only emptied by [`Haesh::destroy`].

mod cache;
mod config;
mod convert;
mod engine;
mod serde_impls;
mod signature;
mod state;
mod token;
mod ttl;
mod value;

pub use config::{DEFAULT_MAX_DEPTH, EngineConfig, Options, SweepBackend, SweepConfig};
pub use convert::IntoValue;
pub use engine::{Haesh, HaeshError};
pub use signature::{Key, Signature};
pub use state::{StateSnapshot, StateView};
pub use ttl::{
    Clock, DEFAULT_SWEEP_DELAY, IdleScheduler, Lifetime, ManualClock, SweepScheduler,
    SystemClock, TimerScheduler,
};
pub use value::{Callable, Composite, CompositeData, Kind, Number, Opaque, Value, classify};

pub use num_bigint::{BigInt, ParseBigIntError};

#[cfg(feature = "derive")]
pub use haesh_derive::IntoValue;

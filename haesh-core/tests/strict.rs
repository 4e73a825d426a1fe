//! Strict mode: nested composites must be interned bottom-up.

use haesh_core::{EngineConfig, Haesh, HaeshError, Options, Value};

fn raw_nested(items: Vec<i32>) -> Value {
    Value::object([("a", Value::object([("b", Value::array(items))]))])
}

fn interned_nested(engine: &mut Haesh, items: Vec<i32>) -> Result<Value, HaeshError> {
    let arr = engine.canonicalize(&Value::array(items))?;
    let b = engine.canonicalize(&Value::object([("b", arr)]))?;
    engine.canonicalize(&Value::object([("a", b)]))
}

#[test]
fn strict_is_the_default() {
    assert!(Haesh::new().is_strict());
    assert!(Haesh::from_config(&EngineConfig::default()).is_strict());
}

#[test]
fn raw_nesting_is_rejected() {
    let mut e = Haesh::new();
    assert!(matches!(
        e.canonicalize(&raw_nested(vec![1, 2, 3])),
        Err(HaeshError::NotInterned { .. })
    ));
    assert!(e.canonicalize(&Value::array([3, 2, 1])).is_ok());
}

#[test]
fn bottom_up_interning_succeeds() {
    let mut e = Haesh::new();
    let arr = e.canonicalize(&Value::array([3, 2, 1])).unwrap();
    assert!(e.canonicalize(&Value::object([("b", arr)])).is_ok());

    for items in [vec![1, 2, 3], vec![1, 2, 4], vec![1, 2, 3, 4], vec![1, 2, 3, 5]] {
        assert!(e.canonicalize(&raw_nested(items.clone())).is_err());
        assert!(interned_nested(&mut e, items).is_ok());
    }
}

#[test]
fn rejection_applies_at_any_depth() {
    let mut e = Haesh::new();
    let inner_raw = Value::object([(
        "c",
        Value::object([
            ("d", Value::from("3")),
            ("e", Value::from(true)),
            ("f", Value::array([Value::from(1.1), Value::Null, Value::from(false)])),
        ]),
    )]);
    let outer = Value::object([(
        "a",
        Value::object([("b", Value::array([Value::from(1), Value::from(2), inner_raw]))]),
    )]);
    assert!(e.canonicalize(&outer).is_err());
}

#[test]
fn not_interned_reports_depth() {
    let mut e = Haesh::new();
    let arr = e.canonicalize(&Value::array([1])).unwrap();
    // The raw object sits at depth 1 under the outer array.
    let value = Value::array([arr, Value::object([("x", 1)])]);
    let err = e.canonicalize(&value).unwrap_err();
    assert!(matches!(err, HaeshError::NotInterned { depth: 1 }));
    assert_eq!(
        err.to_string(),
        "nested composite at depth 1 was not obtained from this engine"
    );
}

#[test]
fn failed_call_leaves_no_entry() {
    let mut e = Haesh::new();
    let before = e.state().entries;
    assert!(e.canonicalize(&raw_nested(vec![9])).is_err());
    assert_eq!(e.state().entries, before);
}

#[test]
fn instances_from_another_engine_are_not_interned() {
    let mut a = Haesh::new();
    let mut b = Haesh::new();
    let foreign = a.canonicalize(&Value::array([1])).unwrap();
    assert!(matches!(
        b.canonicalize(&Value::object([("x", foreign)])),
        Err(HaeshError::NotInterned { .. })
    ));
}

#[test]
fn permissive_accepts_raw_nesting_and_matches_bottom_up() {
    let mut e = Haesh::with_options(Options::new().strict(false));
    let auto = e.canonicalize(&raw_nested(vec![1, 2, 3])).unwrap();
    let manual = interned_nested(&mut e, vec![3, 2, 1]).unwrap();
    assert!(auto.same(&manual));
}

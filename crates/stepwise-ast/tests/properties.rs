//! Property tests for the data model invariants `stepwise-ast` exposes to
//! every crate built on top of it: `NodeId` round-tripping and `Value`
//! truthiness/display coercion.

use proptest::prelude::*;

use stepwise_ast::{NodeId, Value};

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<String>().prop_map(Value::String),
        any::<f64>().prop_filter("no NaN", |n| !n.is_nan()).prop_map(Value::Number),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

proptest! {
    #[test]
    fn node_id_round_trips_through_u32(raw in any::<u32>()) {
        let id = NodeId::from(raw);
        prop_assert_eq!(id.get(), raw);
        prop_assert_eq!(id.as_usize(), raw as usize);
    }

    #[test]
    fn node_id_round_trips_through_usize(raw in 0u32..u32::MAX) {
        let id = NodeId::from(raw as usize);
        prop_assert_eq!(id.as_usize(), raw as usize);
    }

    #[test]
    fn node_id_ordering_matches_the_wrapped_integer(a in any::<u32>(), b in any::<u32>()) {
        prop_assert_eq!(NodeId::from(a) < NodeId::from(b), a < b);
    }

    #[test]
    fn empty_string_and_zero_and_null_and_false_are_never_truthy(v in arb_value()) {
        let falsy = matches!(
            &v,
            Value::String(s) if s.is_empty()
        ) || matches!(v, Value::Number(n) if n == 0.0)
            || matches!(v, Value::Bool(false))
            || matches!(v, Value::Null);
        prop_assert_eq!(v.is_truthy(), !falsy);
    }

    #[test]
    fn display_never_panics_and_is_stable(v in arb_value()) {
        let once = v.to_string();
        let twice = v.to_string();
        prop_assert_eq!(once, twice);
    }
}

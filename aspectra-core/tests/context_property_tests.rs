//! Property-Based Tests for Invocation Contexts
//!
//! **Property 1: Fingerprint Stability**
//!
//! For any argument list, two contexts built from the same arguments SHALL
//! produce identical fingerprints, AND fingerprints SHALL preserve argument
//! order.
//!
//! **Property 2: Bounded Rendering**
//!
//! For any text and cap, the rendering SHALL contain at most `cap` characters
//! of the original plus the truncation marker.

use aspectra_core::{truncate, Argument, InvocationContext};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,40}".prop_map(Value::from),
        ("[a-z]{1,8}", any::<i32>()).prop_map(|(k, v)| {
            let mut map = Map::new();
            map.insert(k, Value::from(v));
            Value::Object(map)
        }),
        Just(Value::Null),
    ]
}

fn arb_argument() -> impl Strategy<Value = Argument> {
    (proptest::option::of("[a-z]{1,6}"), arb_value()).prop_map(|(name, value)| match name {
        Some(name) => Argument::named(name, value),
        None => Argument::positional(value),
    })
}

fn context_with(args: &[Argument]) -> InvocationContext {
    args.iter()
        .cloned()
        .fold(InvocationContext::builder("op", "target"), |b, a| {
            b.argument(a)
        })
        .build()
}

proptest! {
    #[test]
    fn prop_equal_arguments_equal_fingerprints(args in prop::collection::vec(arb_argument(), 0..6)) {
        let a = context_with(&args);
        let b = context_with(&args);
        prop_assert_eq!(a.arg_fingerprints(), b.arg_fingerprints());
    }

    #[test]
    fn prop_fingerprints_preserve_order(args in prop::collection::vec(arb_argument(), 0..6)) {
        let ctx = context_with(&args);
        let expected: Vec<String> = args.iter().map(Argument::fingerprint).collect();
        prop_assert_eq!(ctx.arg_fingerprints(), expected);
    }

    #[test]
    fn prop_truncate_is_bounded(text in "\\PC{0,120}", cap in 1usize..80) {
        let out = truncate(&text, cap);
        let original_len = text.chars().count();
        if original_len <= cap {
            prop_assert_eq!(out, text);
        } else {
            prop_assert_eq!(out.chars().count(), cap + 3);
            prop_assert!(out.ends_with("..."));
        }
    }
}

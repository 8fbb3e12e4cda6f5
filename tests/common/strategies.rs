use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for key segments without glob metacharacters
pub fn key_segment_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,16}"
}

/// Strategy for key segments that may contain glob metacharacters
pub fn glob_heavy_segment_strategy() -> impl Strategy<Value = String> {
    r"[a-c*?\[\]\\^-]{1,12}"
}

/// Strategy for `entity:view:id` style cache keys
pub fn cache_key_strategy() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["metrics", "benchmarks", "sources"]),
        key_segment_strategy(),
        key_segment_strategy(),
    )
        .prop_map(|(entity, view, id)| format!("{entity}:{view}:{id}"))
}

/// Strategy for JSON values shaped like cached query results
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 .,:/]{0,64}".prop_map(Value::String),
    ];

    leaf.prop_recursive(3, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,12}", inner, 0..8)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Strategy for filter/pagination parameter objects
pub fn query_params_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map(
        "[a-z_]{1,10}",
        prop_oneof![
            Just(Value::Null),
            (0u32..1000).prop_map(|n| json!(n)),
            "[a-z]{1,8}".prop_map(Value::String),
        ],
        0..6,
    )
    .prop_map(|map| map.into_iter().collect())
}

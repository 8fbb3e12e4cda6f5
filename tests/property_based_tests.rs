mod common;

use common::strategies::*;
use metrics_cache::cache::{
    escape_glob, generate_key, glob_match, related_pattern, CompressionCodec, VersionTracker,
};
use metrics_cache::{CacheService, CacheSettings, MemoryStore};
use proptest::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Query parameters serialized as a map in exactly the given field order
struct OrderedParams(Vec<(String, Value)>);

impl Serialize for OrderedParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

proptest! {
    /// Property: codec decode inverts encode for any payload and threshold
    #[test]
    fn codec_round_trips_any_payload(payload in ".{0,4096}", threshold in 1usize..2048) {
        let codec = CompressionCodec::new(threshold);
        let (stored, compressed) = codec.encode(&payload, true).unwrap();
        prop_assert_eq!(compressed, payload.len() > threshold);
        prop_assert_eq!(codec.decode(&stored, compressed).unwrap(), payload);
    }

    /// Property: parameter order never changes the generated key
    #[test]
    fn generated_keys_ignore_parameter_order(params in query_params_strategy()) {
        let mut reversed = params.clone();
        reversed.reverse();
        let forward = OrderedParams(params.clone());
        let backward = OrderedParams(reversed);

        // The two inputs really do serialize their fields in different orders
        if params.len() >= 2 {
            prop_assert_ne!(
                serde_json::to_string(&forward).unwrap(),
                serde_json::to_string(&backward).unwrap()
            );
        }

        let a = generate_key("metrics", "list", &forward).unwrap();
        let b = generate_key("metrics", "list", &backward).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert!(a.starts_with("metrics:list"));

        // Null fields are dropped as if never set
        let set_only = OrderedParams(params.into_iter().filter(|(_, v)| !v.is_null()).collect());
        prop_assert_eq!(generate_key("metrics", "list", &set_only).unwrap(), a);
    }

    /// Property: a related pattern matches the key's children literally
    #[test]
    fn related_patterns_treat_metacharacters_literally(
        base in cache_key_strategy(),
        segment in glob_heavy_segment_strategy(),
        other in glob_heavy_segment_strategy(),
    ) {
        let key = format!("{base}:{segment}");
        let pattern = related_pattern(&key);
        let history_key = format!("{key}:history");
        prop_assert!(glob_match(&pattern, &history_key));
        prop_assert!(!glob_match(&pattern, &key));
        if other != segment {
            let other_history_key = format!("{base}:{other}:history");
            prop_assert!(!glob_match(&pattern, &other_history_key));
        }
        prop_assert!(glob_match(&escape_glob(&key), &key));
    }

    /// Property: an entity pattern matches every key of that entity and no other
    #[test]
    fn entity_patterns_match_only_their_entity(key in cache_key_strategy()) {
        let entity = key.split(':').next().unwrap();
        let entity_pattern = format!("{entity}:*");
        prop_assert!(glob_match(&entity_pattern, &key));
        for other in ["metrics", "benchmarks", "sources"] {
            if other != entity {
                let other_pattern = format!("{other}:*");
                prop_assert!(!glob_match(&other_pattern, &key));
            }
        }
        prop_assert!(glob_match(&key, &key));
        prop_assert!(glob_match("*", &key));
    }

    /// Property: the version for a key equals the number of writes to it
    #[test]
    fn versions_count_writes(writes in prop::collection::vec(0usize..4, 1..64)) {
        let tracker = VersionTracker::new();
        let mut expected = [0u64; 4];
        for key in writes {
            expected[key] += 1;
            prop_assert_eq!(tracker.next_version(&format!("k{key}")), expected[key]);
        }
    }

    /// Property: set followed by get returns the same value
    #[test]
    fn service_round_trips_json_values(key in cache_key_strategy(), value in json_value_strategy()) {
        let cache = CacheService::with_settings(MemoryStore::new(), &CacheSettings::for_test());
        let read: Option<Value> = tokio_test::block_on(async {
            cache.set(&key, &value, None).await.unwrap();
            cache.get(&key).await
        });
        prop_assert_eq!(read, Some(value));
    }
}

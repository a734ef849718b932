//! Conflict resolution between a new default config and activated data.
//!
//! # Responsibilities
//! - Define what happens to the Activated slot when a new default is
//!   declared while Activated already holds fetched data
//! - Implement the recursive structural merge used by the Merge strategy
//!
//! # Design Decisions
//! - `high` (the current activated document) always wins on conflict;
//!   `low` (the superseded default) only fills gaps
//! - Arrays concatenate, high elements first, no de-duplication. Downstream
//!   consumers rely on this, so it must not be "fixed" into replacement
//! - The merge is deterministic and order-stable but not commutative

use serde_json::Value;

/// What to do with the Activated slot when a new default collides with
/// activated data that did not originate from that default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MigrationStrategy {
    /// Keep Activated untouched.
    #[default]
    ActivatedOnly,
    /// Merge the new default underneath the activated document.
    Merge,
}

/// Merge `low` into `high`, returning the combined document.
///
/// For every key of `low`: a key absent from `high` is copied; two
/// object values recurse; two array values concatenate with `high`'s
/// elements first; anything else keeps `high`'s value. Non-object inputs
/// are returned as `high` unchanged.
pub fn merge(low: &Value, high: &Value) -> Value {
    let mut out = high.clone();
    merge_into(low, &mut out);
    out
}

fn merge_into(low: &Value, high: &mut Value) {
    let (Value::Object(low_map), Value::Object(high_map)) = (low, high) else {
        return;
    };

    for (key, low_value) in low_map {
        match high_map.get_mut(key) {
            None => {
                high_map.insert(key.clone(), low_value.clone());
            }
            Some(high_value) => match (low_value, high_value) {
                (Value::Object(_), nested @ Value::Object(_)) => {
                    merge_into(low_value, nested);
                }
                (Value::Array(low_items), Value::Array(high_items)) => {
                    high_items.extend(low_items.iter().cloned());
                }
                // Type mismatch or scalar conflict: high wins.
                _ => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conflict_high_wins() {
        let low = json!({"k1": "low1", "k2": "low2"});
        let high = json!({"k1": "high1"});

        let merged = merge(&low, &high);
        assert_eq!(merged, json!({"k1": "high1", "k2": "low2"}));
    }

    #[test]
    fn test_missing_keys_copied_from_low() {
        let low = json!({"a": 1, "b": {"c": 2}});
        let high = json!({});

        assert_eq!(merge(&low, &high), low);
    }

    #[test]
    fn test_nested_objects_recurse() {
        let low = json!({"outer": {"kept": "low", "shared": "low"}});
        let high = json!({"outer": {"shared": "high"}});

        let merged = merge(&low, &high);
        assert_eq!(merged, json!({"outer": {"kept": "low", "shared": "high"}}));
    }

    #[test]
    fn test_type_mismatch_discards_low() {
        let low = json!({"k3": {"s": "low-s"}});
        let high = json!({"k3": "high-scalar"});

        let merged = merge(&low, &high);
        assert_eq!(merged, json!({"k3": "high-scalar"}));
    }

    #[test]
    fn test_arrays_concatenate_high_first() {
        let low = json!({"k2": ["L1", "L2"]});
        let high = json!({"k2": ["H1", "H2"]});

        let merged = merge(&low, &high);
        // Concatenation, not replacement: neither operand's array alone.
        assert_ne!(merged, high);
        assert_ne!(merged, low);
        assert_eq!(merged, json!({"k2": ["H1", "H2", "L1", "L2"]}));
    }

    #[test]
    fn test_not_commutative() {
        let a = json!({"k": "a"});
        let b = json!({"k": "b"});

        assert_eq!(merge(&a, &b), b);
        assert_eq!(merge(&b, &a), a);
    }

    #[test]
    fn test_non_object_inputs_return_high() {
        let low = json!(["low"]);
        let high = json!({"k": 1});
        assert_eq!(merge(&low, &high), high);

        let scalar_high = json!("high");
        assert_eq!(merge(&json!({"k": 1}), &scalar_high), scalar_high);
    }
}

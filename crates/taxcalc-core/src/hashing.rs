//! Deterministic content hashing over a canonical JSON projection.
//!
//! The same normalization backs version-store content hashes and the
//! calculation-cache fingerprint: two inputs with equal hashes must yield
//! identical computation.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{TaxError, TaxResult};

/// Normalize a JSON value: objects get lexicographically sorted keys at
/// every level; arrays keep their order; numbers keep serde_json's shortest
/// representation (no trailing zeros beyond the value's precision).
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), normalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

/// Render a normalized value as compact JSON (no insignificant whitespace).
pub fn canonical_json(value: &Value) -> String {
    // serde_json preserves insertion order for Map; normalize() inserted
    // keys in sorted order, so compact serialization is canonical.
    serde_json::to_string(&normalize(value)).unwrap_or_default()
}

/// SHA-256 of the canonical JSON projection, hex-encoded.
pub fn content_hash(value: &Value) -> String {
    let canonical = canonical_json(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash any serializable model through its canonical JSON projection.
pub fn hash_model<T: Serialize>(model: &T) -> TaxResult<String> {
    let value = serde_json::to_value(model).map_err(|e| TaxError::Serialization(e.to_string()))?;
    Ok(content_hash(&value))
}

/// SHA-256 over a list of fields joined with `:`. Used for version
/// integrity hashes where field order is part of the contract.
pub fn chained_hash(fields: &[&str]) -> String {
    let joined = fields.join(":");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_hash() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 3}});
        let b = json!({"a": {"x": 3, "y": 2}, "b": 1});
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn array_order_affects_hash() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn normalization_is_idempotent() {
        let v = json!({"z": [1, {"b": 2, "a": 3}], "a": null});
        let once = normalize(&v);
        let twice = normalize(&once);
        assert_eq!(once, twice);
        assert_eq!(content_hash(&v), content_hash(&once));
    }

    #[test]
    fn canonical_json_is_compact_and_sorted() {
        let v = json!({"b": 1, "a": [true, null]});
        assert_eq!(canonical_json(&v), r#"{"a":[true,null],"b":1}"#);
    }

    #[test]
    fn value_change_changes_hash() {
        let a = json!({"wages": 200000});
        let b = json!({"wages": 200000.01});
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn chained_hash_is_order_sensitive() {
        assert_ne!(chained_hash(&["a", "b"]), chained_hash(&["b", "a"]));
        assert_eq!(chained_hash(&["a", "b"]), chained_hash(&["a", "b"]));
    }
}

//! Deterministic hashing helpers. Per spec §9, caching and idempotency keys
//! are built from `(compute, memoize)` wrappers keyed by stable hashes over
//! sorted-keys JSON, never over struct `Debug` output or field order.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hashes a value by first serializing it to JSON with keys sorted at every
/// level, then SHA-256-ing the canonical bytes. Used for `content_hash`,
/// `query_hash`, agent `inputs_hash`, and cache keys.
pub fn stable_hash<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_value(value).expect("value must serialize");
    let canonical = canonicalize(&json);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashes a tuple of heterogeneous parts by hashing each part's canonical
/// JSON representation in order. This is how multi-field keys like the agent
/// `inputs_hash` and `cache_key` are constructed without needing a single
/// combined struct type at every call site.
pub fn stable_hash_parts(parts: &[serde_json::Value]) -> String {
    stable_hash(&parts.to_vec())
}

pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

fn canonicalize(value: &serde_json::Value) -> String {
    fn sort(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut sorted = serde_json::Map::new();
                for (k, v) in entries {
                    sorted.insert(k.clone(), sort(v));
                }
                serde_json::Value::Object(sorted)
            }
            serde_json::Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(sort).collect())
            }
            other => other.clone(),
        }
    }
    sort(value).to_string()
}

/// Minimal hex encoder so this crate doesn't need a separate `hex` dependency
/// pulled in just for `sha2` output formatting.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for byte in bytes.as_ref() {
            write!(out, "{byte:02x}").expect("writing to a String never fails");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stable_hash_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn stable_hash_differs_on_content_change() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn sha256_hex_is_deterministic() {
        assert_eq!(sha256_hex("hello"), sha256_hex("hello"));
        assert_ne!(sha256_hex("hello"), sha256_hex("world"));
    }
}

use serde::Serialize;
use serde_json::Value;

use crate::model::ListingRecord;
use crate::store::content_hash;

/// Prefix length of the short record id.
pub const SHORT_ID_LEN: usize = 8;
/// Prefix length of the listing sink key.
pub const KEY_LEN: usize = 12;

/// Deterministic, truncated SHA-256 over a canonical JSON rendering of a
/// record. Probabilistic: two different records may share a prefix.
pub struct IdentityFactory {
    len: usize,
}

impl IdentityFactory {
    pub fn new(len: usize) -> Self {
        IdentityFactory { len: len.clamp(1, 64) }
    }

    pub fn short() -> Self {
        Self::new(SHORT_ID_LEN)
    }

    pub fn key() -> Self {
        Self::new(KEY_LEN)
    }

    pub fn identity(&self, record: &ListingRecord) -> serde_json::Result<String> {
        self.identity_of(record)
    }

    /// Same scheme for anything serializable; used for imported rows that
    /// only exist as JSON.
    pub fn identity_of<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        let canonical = canonical_json(&serde_json::to_value(value)?);
        let mut hash = content_hash(canonical.as_bytes());
        hash.truncate(self.len);
        Ok(hash)
    }
}

/// JSON text with object keys sorted at every level, independent of how the
/// map type underneath orders them.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

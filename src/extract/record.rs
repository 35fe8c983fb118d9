use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Provenance attached to a record when metadata is requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub schema: String,

    /// 1-based page number within a paginated run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// One extracted item: field name to JSON value, plus optional `_meta`
///
/// Serializes as a single flat object so it can be written as one NDJSON
/// line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RecordMeta>,

    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { meta: None, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// The caller-supplied `id` field, if present and scalar
    ///
    /// Strings are returned as-is (blank strings count as absent), numbers
    /// in their JSON form.
    pub fn id(&self) -> Option<String> {
        match self.fields.get("id")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn with_meta(mut self, meta: RecordMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// SHA-256 hex digest over the fields, ignoring `_meta`
    ///
    /// Keys are serialized in sorted order at every level, so the digest
    /// does not depend on insertion order.
    pub fn content_hash(&self) -> String {
        hash_value(&Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ))
    }

    /// Digest over only the listed fields; absent fields hash as null
    pub fn key_hash(&self, key_fields: &[String]) -> String {
        let subset: serde_json::Map<String, Value> = key_fields
            .iter()
            .map(|k| (k.clone(), self.fields.get(k).cloned().unwrap_or(Value::Null)))
            .collect();
        hash_value(&Value::Object(subset))
    }
}

fn hash_value(value: &Value) -> String {
    let canonical = canonicalize(value).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Rebuilds objects through a `BTreeMap` so key order is always sorted
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_hash_ignores_meta_and_key_order() {
        let a = record(json!({"id": "1", "title": "Hello", "tags": {"b": 2, "a": 1}}));
        let mut b = record(json!({"tags": {"a": 1, "b": 2}, "title": "Hello", "id": "1"}));
        b.meta = Some(RecordMeta {
            url: "https://example.com/".to_string(),
            fetched_at: Utc::now(),
            schema: "news".to_string(),
            page: Some(2),
        });

        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn test_hash_differs_on_content() {
        let a = record(json!({"id": "1", "title": "Hello"}));
        let b = record(json!({"id": "1", "title": "Goodbye"}));
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_key_hash_missing_fields() {
        let a = record(json!({"id": 1, "name": "Alice"}));
        let b = record(json!({"id": 1, "name": "Different"}));
        let keys = vec!["id".to_string(), "missing".to_string()];
        assert_eq!(a.key_hash(&keys), b.key_hash(&keys));
    }

    #[test]
    fn test_id() {
        assert_eq!(record(json!({"id": "abc"})).id(), Some("abc".to_string()));
        assert_eq!(record(json!({"id": 42})).id(), Some("42".to_string()));
        assert_eq!(record(json!({"id": "  "})).id(), None);
        assert_eq!(record(json!({"id": null})).id(), None);
        assert_eq!(record(json!({"title": "x"})).id(), None);
    }

    #[test]
    fn test_serializes_flat_with_meta() {
        let mut rec = record(json!({"title": "Hello"}));
        rec.meta = Some(RecordMeta {
            url: "https://example.com/list".to_string(),
            fetched_at: Utc::now(),
            schema: "news".to_string(),
            page: None,
        });

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["_meta"]["schema"], "news");
        assert!(value["_meta"].get("page").is_none());

        let plain = serde_json::to_value(record(json!({"title": "Hello"}))).unwrap();
        assert!(plain.get("_meta").is_none());
    }

    #[test]
    fn test_deserialize_round_trips_meta() {
        let line = r#"{"title":"Hi","_meta":{"url":"https://a.test/","fetched_at":"2024-01-01T00:00:00Z","schema":"s","page":3}}"#;
        let rec: Record = serde_json::from_str(line).unwrap();
        assert_eq!(rec.get("title"), Some(&json!("Hi")));
        assert_eq!(rec.meta.unwrap().page, Some(3));
        assert!(!rec.fields.contains_key("_meta"));
    }
}

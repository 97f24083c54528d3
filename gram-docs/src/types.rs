use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{DocsError, DocsResult};

/// Field every mapped record carries the store identifier under.
pub const ID_FIELD: &str = "id";

/// Store-assigned document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Generate a new random document ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored document: identifier plus schemaless fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Map into a typed record: every stored field, plus `id`.
    ///
    /// The store identifier wins over a stored field also named `id`.
    pub fn to_record<R: DeserializeOwned>(&self) -> DocsResult<R> {
        let mut fields = self.data.clone();
        fields.insert(ID_FIELD.to_string(), Value::String(self.id.0.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| DocsError::mapping(self.id.as_str(), e))
    }
}

/// Ordered, immutable view of a collection at one moment
pub type Snapshot = Arc<[Document]>;

/// Fields to insert. Server timestamp fields are filled by the store at write time.
#[derive(Debug, Clone, Default)]
pub struct DocumentWrite {
    pub fields: Map<String, Value>,
    pub server_timestamps: Vec<String>,
    rejected: Option<String>,
}

impl DocumentWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. A value that cannot be serialized poisons the write:
    /// the first such failure is kept and [`check`](Self::check) reports it.
    pub fn set<K: Into<String>, V: Serialize>(mut self, key: K, value: V) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(key, value);
            }
            Err(e) => {
                if self.rejected.is_none() {
                    self.rejected = Some(format!("Field '{}' could not be serialized: {}", key, e));
                }
            }
        }
        self
    }

    /// Ask the store to stamp `field` with its own clock
    pub fn server_timestamp<K: Into<String>>(mut self, field: K) -> Self {
        self.server_timestamps.push(field.into());
        self
    }

    /// Fails with the first serialization error recorded by [`set`](Self::set).
    pub fn check(&self) -> DocsResult<()> {
        match &self.rejected {
            Some(message) => Err(DocsError::invalid(message.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A live query: one collection, optionally ordered by one field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn collection<S: Into<String>>(name: S) -> Self {
        Self {
            collection: name.into(),
            order_by: None,
        }
    }

    pub fn order_by<S: Into<String>>(mut self, field: S, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn validate(&self) -> DocsResult<()> {
        if self.collection.trim().is_empty() {
            return Err(DocsError::invalid("Collection name must not be empty"));
        }
        if let Some(order) = &self.order_by {
            if order.field.trim().is_empty() {
                return Err(DocsError::invalid("Order field must not be empty"));
            }
        }
        Ok(())
    }
}

/// Wire form of a timestamp. Fixed width, so lexical order is chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over field values: by type first, then by value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Tagged {
        id: String,
        tag: String,
    }

    #[test]
    fn record_carries_fields_and_id() {
        let mut data = Map::new();
        data.insert("tag".into(), json!("sunset"));
        data.insert("id".into(), json!("stale"));
        let doc = Document {
            id: DocumentId::from_string("abc".into()),
            data,
        };

        let rec: Tagged = doc.to_record().unwrap();
        assert_eq!(rec.id, "abc");
        assert_eq!(rec.tag, "sunset");
    }

    #[test]
    fn record_mapping_errors_name_the_document() {
        let doc = Document {
            id: DocumentId::from_string("broken".into()),
            data: Map::new(),
        };
        let err = doc.to_record::<Tagged>().unwrap_err();
        assert!(matches!(err, DocsError::Mapping { ref id, .. } if id == "broken"));
    }

    #[test]
    fn values_order_by_type_then_value() {
        assert_eq!(compare_values(&json!(1), &json!(2)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(99), &json!("1")), Ordering::Less);
    }

    #[test]
    fn timestamps_sort_lexically() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z").unwrap().with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2024-01-01T10:00:00.5Z").unwrap().with_timezone(&Utc);
        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(format_timestamp(early), "2024-01-01T09:00:00.000000Z");
    }

    #[test]
    fn unserializable_value_poisons_the_write() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "tuple keys are not strings");

        let write = DocumentWrite::new().set("url", "u").set("meta", bad).set("n", 1);
        assert!(!write.fields.contains_key("meta"));
        assert!(matches!(write.check(), Err(DocsError::Invalid { ref message }) if message.contains("meta")));

        assert!(DocumentWrite::new().set("url", "u").check().is_ok());
    }

    #[test]
    fn blank_queries_are_invalid() {
        assert!(Query::collection(" ").validate().is_err());
        assert!(Query::collection("images").order_by("", Direction::Descending).validate().is_err());
        assert!(Query::collection("images").validate().is_ok());
    }
}

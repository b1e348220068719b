use serde_json::{Map, Value};

/// Queries, write payloads and stored records all share this shape.
pub type Document = Map<String, Value>;

/// Truthiness used when deciding whether a visibility exception field is "set".
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Equality match: every query key must be present in the record with an equal value.
pub fn matches_query(record: &Document, query: &Document) -> bool {
    query
        .iter()
        .all(|(key, expected)| record.get(key) == Some(expected))
}

use std::cmp::Ordering;

use chrono::{SecondsFormat, Utc};
use scopegate_core::document::Document;
use serde_json::Value;

pub type Record = Document;

pub const ID_FIELD: &str = "id";
pub const CREATED_FIELD: &str = "created_date";
pub const UPDATED_FIELD: &str = "updated_date";

const STORE_MANAGED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_FIELD, UPDATED_FIELD];

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn strip_store_managed(mut data: Document) -> Document {
    for field in STORE_MANAGED_FIELDS {
        data.remove(field);
    }
    data
}

/// Builds a fresh record from client data, assigning id and timestamps.
pub fn new_record(data: Document) -> Record {
    let mut record = strip_store_managed(data);
    let now = now_timestamp();
    record.insert(
        ID_FIELD.to_string(),
        Value::String(uuid::Uuid::new_v4().to_string()),
    );
    record.insert(CREATED_FIELD.to_string(), Value::String(now.clone()));
    record.insert(UPDATED_FIELD.to_string(), Value::String(now));
    record
}

/// Shallow patch applied on update; store-managed fields are dropped and
/// `updated_date` is refreshed.
pub fn update_patch(data: Document) -> Document {
    let mut patch = strip_store_managed(data);
    patch.insert(UPDATED_FIELD.to_string(), Value::String(now_timestamp()));
    patch
}

pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw.strip_prefix('+').unwrap_or(raw), false),
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            descending,
        })
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = compare_values(a.get(&self.field), b.get(&self.field));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

// Missing and null sort first; values of different JSON types order by type.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x @ Value::Array(_)), Some(y @ Value::Array(_)))
        | (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => {
            x.to_string().cmp(&y.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

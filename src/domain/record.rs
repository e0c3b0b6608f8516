use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::store::Document;

/// Trait that any domain record must implement to be read from the store.
///
/// Decoding is tolerant: historical documents use other field names and may miss fields,
/// so `from_document` fills defaults instead of failing wherever a sane default exists.
pub trait Record: Clone + Send + Sync + 'static {
    /// Collection the record lives in.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Decode a stored document. `None` means the document cannot represent this record
    /// at all and readers should skip it.
    fn from_document(doc: &Document) -> Option<Self>;
}

/// Accepts epoch milliseconds or a `{ "seconds": n }` object.
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::Object(map) => {
            let seconds = map.get("seconds").and_then(Value::as_i64)?;
            Utc.timestamp_opt(seconds, 0).single()
        }
        _ => None,
    }
}

pub fn timestamp_to_value(at: DateTime<Utc>) -> Value {
    json!(at.timestamp_millis())
}

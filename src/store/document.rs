//! Document, snapshot and write-set types shared by the store actor and its clients.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

pub const PRODUCTS: &str = "products";
pub const INVENTORY: &str = "inventory";
pub const ORDERS: &str = "orders";
pub const USERS: &str = "users";

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// A stored document as seen by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub version: u64,
}

impl Document {
    /// First field present among `keys`, so canonical names can be listed before legacy ones.
    pub fn field(&self, keys: &[&str]) -> Option<&Value> {
        first_of(&self.fields, keys)
    }

    pub fn str_field(&self, keys: &[&str]) -> Option<&str> {
        self.field(keys).and_then(Value::as_str)
    }

    pub fn decimal_field(&self, keys: &[&str]) -> Option<Decimal> {
        self.field(keys).and_then(value_to_decimal)
    }

    pub fn bool_field(&self, keys: &[&str]) -> Option<bool> {
        self.field(keys).and_then(Value::as_bool)
    }
}

/// Full contents of one collection at a given revision, in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub collection: String,
    pub revision: u64,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn empty(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            revision: 0,
            documents: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Version of a document observed inside a transaction. `None` records that it was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadStamp {
    pub collection: String,
    pub id: String,
    pub version: Option<u64>,
}

/// A buffered transactional write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// New document with a store-assigned id.
    Create { collection: String, fields: Fields },
    /// New document at a caller-chosen id. Fails the commit if the id is taken.
    Insert { collection: String, id: String, fields: Fields },
    Update { collection: String, id: String, fields: Fields },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Insert { collection, .. }
            | WriteOp::Update { collection, .. } => collection,
        }
    }
}

/// Ids assigned to the `Create` writes of a commit, in write order. `Insert` ids are
/// already known to the caller and are not repeated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub created: Vec<String>,
}

pub fn first_of<'a>(fields: &'a Fields, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

/// Numbers may arrive as JSON numbers or numeric strings in older records.
pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

pub fn decimal_to_value(amount: Decimal) -> Value {
    let normalized = amount.normalize();
    if normalized.scale() == 0 {
        if let Some(i) = normalized.to_i64() {
            return Value::Number(Number::from(i));
        }
    }
    normalized
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Build a field map from `(key, value)` pairs.
pub fn fields<I, K>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

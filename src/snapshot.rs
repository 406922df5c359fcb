//! Read-only snapshots of reply and event payloads.
//!
//! Every payload handed to a continuation or an event subscriber is copied
//! out of the transport message into a [`Snapshot`]. Two levels are frozen:
//!
//! - the top-level fields of an object payload, and
//! - the fields of each record in a top-level field holding an array of
//!   objects.
//!
//! Anything deeper is an ordinary owned [`serde_json::Value`]. Because the
//! snapshot is a copy, nothing a consumer does to it can reach the live
//! message.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{BridgeError, Result};

/// Frozen view of a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    root: Root,
}

#[derive(Debug, Clone, PartialEq)]
enum Root {
    Object(BTreeMap<String, Field>),
    Other(Value),
}

/// A frozen top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Scalar, object or mixed array, carried as-is.
    Value(Value),
    /// Array whose every element is an object; each element frozen shallowly.
    Records(Vec<Record>),
}

/// A frozen element of an array-of-objects field.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Snapshot {
    /// Copy `value` into a snapshot.
    pub fn freeze(value: &Value) -> Self {
        // ---
        let root = match value {
            Value::Object(map) => Root::Object(
                map.iter()
                    .map(|(key, field)| (key.clone(), Field::freeze(field)))
                    .collect(),
            ),
            other => Root::Other(other.clone()),
        };
        Self { root }
    }

    /// Snapshot of `null`, used for replies without a payload.
    pub fn empty() -> Self {
        Self {
            root: Root::Other(Value::Null),
        }
    }

    /// True when the payload was a JSON object.
    pub fn is_object(&self) -> bool {
        matches!(self.root, Root::Object(_))
    }

    /// Look up a top-level field.
    pub fn field(&self, key: &str) -> Option<&Field> {
        match &self.root {
            Root::Object(fields) => fields.get(key),
            Root::Other(_) => None,
        }
    }

    /// Look up a top-level field that is not an array of records.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.field(key)? {
            Field::Value(value) => Some(value),
            Field::Records(_) => None,
        }
    }

    /// Look up a top-level array-of-records field.
    pub fn records(&self, key: &str) -> Option<&[Record]> {
        match self.field(key)? {
            Field::Records(records) => Some(records),
            Field::Value(_) => None,
        }
    }

    /// Top-level field names, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let fields = match &self.root {
            Root::Object(fields) => Some(fields),
            Root::Other(_) => None,
        };
        fields.into_iter().flat_map(|f| f.keys().map(String::as_str))
    }

    /// Number of top-level fields (0 for non-object payloads).
    pub fn len(&self) -> usize {
        match &self.root {
            Root::Object(fields) => fields.len(),
            Root::Other(_) => 0,
        }
    }

    /// Whether there are no top-level fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempt to overwrite a top-level field.
    ///
    /// Always fails with [`BridgeError::ReadOnly`].
    pub fn set(&mut self, key: &str, _value: Value) -> Result<()> {
        Err(BridgeError::ReadOnly(key.to_string()))
    }

    /// Rebuild an owned, mutable JSON value equal to the original payload.
    pub fn to_value(&self) -> Value {
        match &self.root {
            Root::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, field)| (key.clone(), field.to_value()))
                    .collect(),
            ),
            Root::Other(value) => value.clone(),
        }
    }

    /// Deserialize the payload into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_value())?)
    }
}

impl Field {
    fn freeze(value: &Value) -> Self {
        match value {
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                Field::Records(items.iter().filter_map(Record::freeze).collect())
            }
            other => Field::Value(other.clone()),
        }
    }

    /// Owned JSON copy of this field.
    pub fn to_value(&self) -> Value {
        match self {
            Field::Value(value) => value.clone(),
            Field::Records(records) => Value::Array(records.iter().map(Record::to_value).collect()),
        }
    }
}

impl Record {
    fn freeze(value: &Value) -> Option<Self> {
        value.as_object().map(|fields| Self {
            fields: fields.clone(),
        })
    }

    /// Field value by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field names, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Attempt to overwrite a record field; always [`BridgeError::ReadOnly`].
    pub fn set(&mut self, key: &str, _value: Value) -> Result<()> {
        Err(BridgeError::ReadOnly(key.to_string()))
    }

    /// Owned JSON copy of this record.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl PartialEq<Value> for Snapshot {
    fn eq(&self, other: &Value) -> bool {
        self.to_value() == *other
    }
}

impl From<&Value> for Snapshot {
    fn from(value: &Value) -> Self {
        Snapshot::freeze(value)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

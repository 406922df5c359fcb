use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation identifier linking an outbound command to its reply.
///
/// Ids are plain counters starting at 0. On the wire they travel either as a
/// JSON string (`"_promise_id": "7"`) or as a JSON number
/// (`"asyncCallId": 7`), depending on [`IdFormat`]; deserialization accepts
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wrap a raw counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Encode this id as a JSON value in the requested wire format.
    pub fn to_wire(self, format: IdFormat) -> serde_json::Value {
        match format {
            IdFormat::String => serde_json::Value::String(self.0.to_string()),
            IdFormat::Number => serde_json::Value::from(self.0),
        }
    }

    /// Decode an id from either wire format.
    ///
    /// Returns `None` for anything that is not a non-negative integer or a
    /// string holding one.
    pub fn from_wire(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().map(Self),
            serde_json::Value::String(s) => s.trim().parse().ok().map(Self),
            _ => None,
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CorrelationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // ---
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = CorrelationId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or a string holding one")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(CorrelationId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(CorrelationId)
                    .map_err(|_| E::custom("negative correlation id"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.trim().parse().map(CorrelationId).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Wire encoding of correlation ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdFormat {
    /// Decimal string, e.g. `"3"`.
    #[default]
    String,
    /// JSON integer, e.g. `3`.
    Number,
}

/// Monotonic id source owned by one bridge.
///
/// Never resets and never hands out the same value twice. Overflow after
/// 2^64 allocations is not handled.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allocate_strictly_increasing() {
        // ---
        let ids = IdAllocator::new();
        let first: Vec<u64> = (0..100).map(|_| ids.allocate()).collect();

        assert_eq!(first[0], 0);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_wire_formats() {
        // ---
        let id = CorrelationId::new(42);
        assert_eq!(id.to_wire(IdFormat::String), json!("42"));
        assert_eq!(id.to_wire(IdFormat::Number), json!(42));
    }

    #[test]
    fn test_from_wire_accepts_both() {
        // ---
        assert_eq!(CorrelationId::from_wire(&json!("7")), Some(CorrelationId::new(7)));
        assert_eq!(CorrelationId::from_wire(&json!(7)), Some(CorrelationId::new(7)));
        assert_eq!(CorrelationId::from_wire(&json!(-1)), None);
        assert_eq!(CorrelationId::from_wire(&json!("abc")), None);
        assert_eq!(CorrelationId::from_wire(&json!(null)), None);
    }

    #[test]
    fn test_deserialize_string_or_number() {
        // ---
        let a: CorrelationId = serde_json::from_str("\"12\"").unwrap();
        let b: CorrelationId = serde_json::from_str("12").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<CorrelationId>("-3").is_err());
    }
}

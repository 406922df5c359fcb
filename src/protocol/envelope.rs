use serde_json::{Map, Value};

use crate::protocol::WireFormat;
use crate::{BridgeError, CorrelationId, Result};

/// Outbound command.
///
/// Serializes to one flat JSON object: the command field, the correlation
/// field (request-style commands only) and the payload fields side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    /// Symbolic operation name.
    pub command: String,

    /// Present on request-style commands; absent on fire-and-forget ones
    /// such as event activation.
    pub correlation_id: Option<CorrelationId>,

    /// Command-specific fields.
    pub payload: Map<String, Value>,
}

impl CommandEnvelope {
    /// Create a correlated request.
    pub fn request(
        command: impl Into<String>,
        correlation_id: CorrelationId,
        payload: Map<String, Value>,
    ) -> Self {
        // ---
        Self {
            command: command.into(),
            correlation_id: Some(correlation_id),
            payload,
        }
    }

    /// Create an uncorrelated command.
    pub fn notification(command: impl Into<String>, payload: Map<String, Value>) -> Self {
        // ---
        Self {
            command: command.into(),
            correlation_id: None,
            payload,
        }
    }

    /// Render the JSON text handed to the transport.
    ///
    /// The command and correlation fields overwrite payload fields of the
    /// same name.
    pub fn to_wire(&self, wire: &WireFormat) -> Result<String> {
        // ---
        let mut object = self.payload.clone();
        object.insert(wire.command_field.clone(), Value::String(self.command.clone()));
        if let Some(id) = self.correlation_id {
            object.insert(wire.correlation_field.clone(), id.to_wire(wire.id_format));
        }
        Ok(serde_json::to_string(&Value::Object(object))?)
    }
}

/// Classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Reply to a pending request.
    Reply {
        correlation_id: CorrelationId,
        /// `Ok(payload)` or `Err(error value)`.
        outcome: std::result::Result<Value, Value>,
    },

    /// Unsolicited notification; `body` is the whole message.
    Event { event_name: String, body: Value },

    /// Uncorrelated error report from the native side.
    Fault { error: Value },
}

impl Inbound {
    /// Parse and classify inbound text.
    ///
    /// Classification order:
    /// 1. a correlation field makes it a [`Inbound::Reply`]; a truthy
    ///    top-level error or a truthy error inside the payload rejects it,
    /// 2. otherwise a truthy error field makes it a [`Inbound::Fault`], even
    ///    when an event name is present,
    /// 3. otherwise a string event field makes it an [`Inbound::Event`].
    ///
    /// Anything else is a [`BridgeError::MalformedEnvelope`].
    pub fn parse(text: &str, wire: &WireFormat) -> Result<Self> {
        // ---
        let value: Value = serde_json::from_str(text)
            .map_err(|e| BridgeError::MalformedEnvelope(format!("invalid JSON: {e}")))?;

        let Value::Object(mut object) = value else {
            return Err(BridgeError::MalformedEnvelope(
                "message is not a JSON object".into(),
            ));
        };

        if let Some(raw_id) = object.remove(&wire.correlation_field) {
            let correlation_id = CorrelationId::from_wire(&raw_id).ok_or_else(|| {
                BridgeError::MalformedEnvelope(format!("bad correlation id: {raw_id}"))
            })?;
            return Ok(Inbound::Reply {
                correlation_id,
                outcome: reply_outcome(object, wire),
            });
        }

        if let Some(error) = object.get(&wire.error_field).filter(|error| is_truthy(error)) {
            return Ok(Inbound::Fault {
                error: error.clone(),
            });
        }

        let event_name = match object.get(&wire.event_field) {
            Some(Value::String(event_name)) => event_name.clone(),
            _ => {
                return Err(BridgeError::MalformedEnvelope(
                    "not a reply, event or error report".into(),
                ))
            }
        };

        Ok(Inbound::Event {
            event_name,
            body: Value::Object(object),
        })
    }
}

fn reply_outcome(mut object: Map<String, Value>, wire: &WireFormat) -> std::result::Result<Value, Value> {
    // ---
    if let Some(error) = object.remove(&wire.error_field) {
        if is_truthy(&error) {
            return Err(error);
        }
    }

    let data = object.remove(&wire.data_field).unwrap_or(Value::Null);
    match data.get(&wire.error_field) {
        Some(error) if is_truthy(error) => Err(error.clone()),
        _ => Ok(data),
    }
}

// Error markers follow JavaScript truthiness: null, false, 0 and "" mean
// "no error".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::IdFormat;
    use serde_json::json;

    fn wire() -> WireFormat {
        WireFormat::default()
    }

    #[test]
    fn test_request_to_wire() {
        // ---
        let mut payload = Map::new();
        payload.insert("contactId".into(), json!("c-1"));
        let env = CommandEnvelope::request("remove", CorrelationId::new(3), payload);

        let text = env.to_wire(&wire()).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"cmd": "remove", "_promise_id": "3", "contactId": "c-1"}));
    }

    #[test]
    fn test_numeric_ids_on_wire() {
        // ---
        let wire = WireFormat {
            correlation_field: "asyncCallId".into(),
            id_format: IdFormat::Number,
            ..WireFormat::default()
        };
        let env = CommandEnvelope::request("takeoff", CorrelationId::new(9), Map::new());
        let parsed: Value = serde_json::from_str(&env.to_wire(&wire).unwrap()).unwrap();
        assert_eq!(parsed, json!({"cmd": "takeoff", "asyncCallId": 9}));
    }

    #[test]
    fn test_envelope_fields_win_over_payload() {
        // ---
        let mut payload = Map::new();
        payload.insert("cmd".into(), json!("spoofed"));
        let env = CommandEnvelope::notification("addEventListener", payload);
        let parsed: Value = serde_json::from_str(&env.to_wire(&wire()).unwrap()).unwrap();
        assert_eq!(parsed["cmd"], json!("addEventListener"));
        assert!(parsed.get("_promise_id").is_none());
    }

    #[test]
    fn test_parse_success_reply() {
        // ---
        let inbound = Inbound::parse(r#"{"_promise_id":"4","data":{"numOfProcessors":4}}"#, &wire()).unwrap();
        assert_eq!(
            inbound,
            Inbound::Reply {
                correlation_id: CorrelationId::new(4),
                outcome: Ok(json!({"numOfProcessors": 4})),
            }
        );
    }

    #[test]
    fn test_parse_error_inside_data() {
        // ---
        let inbound = Inbound::parse(r#"{"_promise_id":"1","data":{"error":"not connected"}}"#, &wire()).unwrap();
        assert!(matches!(
            inbound,
            Inbound::Reply { outcome: Err(ref e), .. } if *e == json!("not connected")
        ));
    }

    #[test]
    fn test_parse_top_level_error_with_id() {
        // ---
        let inbound = Inbound::parse(r#"{"_promise_id":1,"error":{"code":5}}"#, &wire()).unwrap();
        assert!(matches!(
            inbound,
            Inbound::Reply { outcome: Err(ref e), .. } if *e == json!({"code": 5})
        ));
    }

    #[test]
    fn test_falsy_error_is_success() {
        // ---
        let inbound = Inbound::parse(r#"{"_promise_id":"2","data":{"error":"","ok":true}}"#, &wire()).unwrap();
        assert!(matches!(inbound, Inbound::Reply { outcome: Ok(_), .. }));
    }

    #[test]
    fn test_reply_without_data_resolves_null() {
        // ---
        let inbound = Inbound::parse(r#"{"_promise_id":"2"}"#, &wire()).unwrap();
        assert!(matches!(inbound, Inbound::Reply { outcome: Ok(Value::Null), .. }));
    }

    #[test]
    fn test_parse_event() {
        // ---
        let text = r#"{"reply":"attachStorage","eventName":"onattach","id":"sdcard"}"#;
        match Inbound::parse(text, &wire()).unwrap() {
            Inbound::Event { event_name, body } => {
                assert_eq!(event_name, "onattach");
                assert_eq!(body["id"], json!("sdcard"));
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fault() {
        // ---
        let inbound = Inbound::parse(r#"{"error":"org.json.JSONException"}"#, &wire()).unwrap();
        assert_eq!(inbound, Inbound::Fault { error: json!("org.json.JSONException") });
    }

    #[test]
    fn test_error_report_wins_over_event_name() {
        // ---
        let text = r#"{"error":"org.json.JSONException","eventName":"onattach","reply":"attachStorage"}"#;
        let inbound = Inbound::parse(text, &wire()).unwrap();
        assert_eq!(inbound, Inbound::Fault { error: json!("org.json.JSONException") });

        let text = r#"{"error":false,"eventName":"onattach"}"#;
        assert!(matches!(
            Inbound::parse(text, &wire()).unwrap(),
            Inbound::Event { ref event_name, .. } if event_name == "onattach"
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        // ---
        for text in ["not json", "[1,2]", "{}", r#"{"_promise_id":"x"}"#, r#"{"eventName":7}"#] {
            assert!(
                matches!(Inbound::parse(text, &wire()), Err(BridgeError::MalformedEnvelope(_))),
                "accepted {text}"
            );
        }
    }
}

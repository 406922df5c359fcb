use serde::Deserialize;

use crate::IdFormat;

/// Field names and id encoding used by one extension's JSON messages.
///
/// The defaults match the device-capabilities extension:
/// `{"cmd": "getCPUInfo", "_promise_id": "0"}` out,
/// `{"_promise_id": "0", "data": {...}}` back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WireFormat {
    /// Field carrying the command name.
    pub command_field: String,

    /// Field carrying the correlation id, echoed by replies.
    pub correlation_field: String,

    /// How correlation ids are encoded.
    pub id_format: IdFormat,

    /// Reply field holding the payload.
    pub data_field: String,

    /// Field holding an error, either inside the payload or at the top level.
    pub error_field: String,

    /// Field naming the event on notifications and activation commands.
    pub event_field: String,
}

impl Default for WireFormat {
    fn default() -> Self {
        Self {
            command_field: "cmd".into(),
            correlation_field: "_promise_id".into(),
            id_format: IdFormat::String,
            data_field: "data".into(),
            error_field: "error".into(),
            event_field: "eventName".into(),
        }
    }
}

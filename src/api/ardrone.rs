//! `navigator.ardrone` flight control.

use crate::{Bridge, BridgeConfig, PendingReply, Result, TransportPtr};

/// Flight commands for an AR.Drone.
///
/// Uses numeric ids in `asyncCallId`.
#[derive(Debug, Clone)]
pub struct ArDrone {
    bridge: Bridge,
}

impl ArDrone {
    /// Bridge over `transport` with the `navigator.ardrone` preset.
    pub fn new(transport: TransportPtr) -> Result<Self> {
        Ok(Self::with_bridge(Bridge::new(transport, BridgeConfig::ardrone())?))
    }

    /// Wrap an existing bridge, e.g. one built with custom framing.
    pub fn with_bridge(bridge: Bridge) -> Self {
        Self { bridge }
    }

    /// Underlying bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Connect to the drone.
    pub fn connect(&self) -> PendingReply {
        self.bridge.send("connect", ())
    }

    /// Take off; rejects with `"not connected"` before `connect` succeeded.
    pub fn takeoff(&self) -> PendingReply {
        self.bridge.send("takeoff", ())
    }

    /// Land.
    pub fn landing(&self) -> PendingReply {
        self.bridge.send("landing", ())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{create_memory_transport, BridgeError};
    use serde_json::json;

    #[tokio::test]
    async fn test_numeric_ids() {
        // ---
        let (transport, host) = create_memory_transport("drone");
        let drone = ArDrone::new(transport).unwrap();

        let connect = drone.connect();
        let takeoff = drone.takeoff();
        assert_eq!(
            host.posted_json(),
            vec![
                json!({"cmd": "connect", "asyncCallId": 0}),
                json!({"cmd": "takeoff", "asyncCallId": 1}),
            ]
        );

        host.deliver(r#"{"asyncCallId": 1, "data": {"error": "not connected"}}"#).unwrap();
        host.deliver(r#"{"asyncCallId": 0, "data": {}}"#).unwrap();

        assert!(connect.await.unwrap().is_empty());
        match takeoff.await {
            Err(BridgeError::Remote(value)) => assert_eq!(value, json!("not connected")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

// tests/transport_channel.rs

use serde_json::json;
use tokio::time::{timeout, Duration};

use extension_bridge::{
    // ---
    create_channel_transport,
    ArDrone,
    Bridge,
    BridgeConfig,
    BridgeError,
    NativeEndpoint,
};

/// Answer every drone command; `takeoff` fails until `connect` succeeded.
async fn run_drone(mut endpoint: NativeEndpoint) {
    // ---
    let wire = BridgeConfig::ardrone().wire;
    let mut connected = false;

    while let Some(Ok(request)) = endpoint.recv_json().await {
        let result = match request["cmd"].as_str() {
            Some("connect") => {
                connected = true;
                endpoint.reply(&request, &wire, json!({}))
            }
            Some("takeoff") if !connected => endpoint.reply_error(&request, &wire, json!("not connected")),
            Some(_) => endpoint.reply(&request, &wire, json!({})),
            None => Ok(()),
        };
        if result.is_err() {
            break;
        }
    }
}

#[tokio::test]
async fn channel_round_trip_through_native_task() {
    // ---
    // Arrange
    // ---
    let (transport, endpoint) = create_channel_transport("drone");
    let drone = ArDrone::new(transport).expect("failed to create drone bridge");
    let native = tokio::spawn(run_drone(endpoint));

    // ---
    // Act
    // ---
    let early = timeout(Duration::from_secs(1), drone.takeoff())
        .await
        .expect("timed out waiting for takeoff");
    let connect = timeout(Duration::from_secs(1), drone.connect())
        .await
        .expect("timed out waiting for connect");
    let takeoff = timeout(Duration::from_secs(1), drone.takeoff())
        .await
        .expect("timed out waiting for takeoff");

    // ---
    // Assert
    // ---
    match early {
        Err(BridgeError::Remote(value)) => assert_eq!(value, json!("not connected")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(connect.expect("connect failed").is_empty());
    assert!(takeoff.is_ok());
    assert_eq!(drone.bridge().pending_count(), 0);

    drop(drone);
    timeout(Duration::from_secs(1), native)
        .await
        .expect("native task did not stop")
        .expect("native task panicked");
}

#[tokio::test]
async fn channel_events_reach_subscribers() {
    // ---
    let (transport, mut endpoint) = create_channel_transport("system");
    let bridge = Bridge::new(transport, BridgeConfig::device_capabilities()).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    bridge
        .subscribe("onconnect", move |snap| {
            let _ = tx.send(snap.to_value());
        })
        .unwrap();

    let activation = endpoint.recv_json().await.unwrap().unwrap();
    assert_eq!(activation, json!({"cmd": "addEventListener", "eventName": "onconnect"}));

    endpoint
        .post_json(&json!({"eventName": "onconnect", "id": "hdmi-1"}))
        .unwrap();

    let event = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed");
    assert_eq!(event["id"], "hdmi-1");
}

#[tokio::test]
async fn channel_post_fails_once_endpoint_is_gone() {
    // ---
    let (transport, endpoint) = create_channel_transport("gone");
    let bridge = Bridge::new(transport, BridgeConfig::default()).unwrap();
    drop(endpoint);

    let outcome = bridge.send("ping", ()).await;
    assert!(matches!(outcome, Err(BridgeError::Transport(_))));
}

#[test]
fn channel_listener_requires_runtime() {
    // ---
    let (transport, _endpoint) = create_channel_transport("no-runtime");
    let result = Bridge::new(transport, BridgeConfig::default());
    assert!(matches!(result, Err(BridgeError::Transport(_))));
}

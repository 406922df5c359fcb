//! AR.Drone flight over the channel transport.
//!
//! A spawned task plays the native extension on the far end of the channel,
//! answering each command after a short delay.
//!
//! Run with: RUST_LOG=extension_bridge=trace cargo run --example ardrone_channel

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::panic_in_result_fn
)]

use std::time::Duration;

use extension_bridge::{create_channel_transport, ArDrone, BridgeConfig, NativeEndpoint, Result};
use serde_json::json;
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

async fn native_drone(mut endpoint: NativeEndpoint) -> Result<()> {
    // ---
    let wire = BridgeConfig::ardrone().wire;

    while let Some(request) = endpoint.recv_json().await {
        let request = request?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        match request["cmd"].as_str() {
            Some("connect") | Some("takeoff") | Some("landing") => endpoint.reply(&request, &wire, json!({}))?,
            _ => endpoint.reply_error(&request, &wire, json!("unknown command"))?,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let (transport, endpoint) = create_channel_transport("navigator.ardrone");
    let native = tokio::spawn(native_drone(endpoint));

    let drone = ArDrone::new(transport)?;

    drone.connect().await?;
    println!("connected");

    drone.takeoff().await?;
    println!("airborne");

    tokio::time::sleep(Duration::from_millis(200)).await;

    drone.landing().await?;
    println!("landed");

    drop(drone);
    native.await.expect("native task panicked")?;
    Ok(())
}

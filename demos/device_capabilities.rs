//! Device capability queries over the in-memory transport.
//!
//! The main task plays both sides: it issues queries through the
//! `DeviceCapabilities` facade, then answers them as the native extension
//! would, including one hot-plug notification.
//!
//! Run with: RUST_LOG=extension_bridge=debug cargo run --example device_capabilities

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::panic_in_result_fn
)]

use extension_bridge::{create_memory_transport, DeviceCapabilities, MemoryHost, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CpuInfo {
    num_of_processors: u32,
    arch_name: String,
    load: f64,
}

/// Answer every request posted so far, the way the native side does.
fn answer_pending(host: &MemoryHost) -> Result<()> {
    // ---
    for request in host.take_posted() {
        let request: Value = serde_json::from_str(&request)?;
        let Some(id) = request.get("_promise_id") else {
            continue;
        };

        let data = match request["cmd"].as_str() {
            Some("getCPUInfo") => json!({"numOfProcessors": 4, "archName": "armv7l", "load": 0.12}),
            Some("getStorageInfo") => json!({
                "storages": [
                    {"id": "0", "name": "Internal", "type": "fixed", "capacity": 16_000_000_000_u64},
                    {"id": "1", "name": "SD card", "type": "removable", "capacity": 8_000_000_000_u64},
                ]
            }),
            _ => json!({"error": "unsupported"}),
        };
        host.deliver_json(&json!({"_promise_id": id, "data": data}))?;
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

    let (transport, host) = create_memory_transport("navigator.system");
    let system = DeviceCapabilities::new(transport)?;

    system.add_event_listener(DeviceCapabilities::ON_ATTACH, |storage| {
        println!("storage attached: {}", storage.to_value());
    })?;

    let cpu = system.get_cpu_info();
    let storage = system.get_storage_info();
    let memory = system.get_memory_info();

    answer_pending(&host)?;

    let cpu: CpuInfo = cpu.decode().await?;
    println!("cpu: {cpu:?}");

    let storage = storage.await?;
    for unit in storage.records("storages").unwrap_or_default() {
        println!("storage {}: {}", unit.get("name").unwrap_or(&Value::Null), unit.get("capacity").unwrap_or(&Value::Null));
    }

    match memory.await {
        Ok(info) => println!("memory: {}", info.to_value()),
        Err(e) => println!("memory query failed: {e}"),
    }

    host.deliver_json(&json!({
        "eventName": DeviceCapabilities::ON_ATTACH,
        "id": "2",
        "name": "USB stick",
        "type": "removable",
    }))?;

    Ok(())
}

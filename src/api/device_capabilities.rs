//! `navigator.system` device capability queries.

use crate::{Bridge, BridgeConfig, PendingReply, Result, Snapshot, SubscriptionId, TransportPtr};

/// Device capability queries and hot-plug notifications.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    bridge: Bridge,
}

impl DeviceCapabilities {
    /// Storage unit attached.
    pub const ON_ATTACH: &'static str = "onattach";
    /// Storage unit detached.
    pub const ON_DETACH: &'static str = "ondetach";
    /// Display connected.
    pub const ON_CONNECT: &'static str = "onconnect";
    /// Display disconnected.
    pub const ON_DISCONNECT: &'static str = "ondisconnect";

    /// Bridge over `transport` with the `navigator.system` preset.
    pub fn new(transport: TransportPtr) -> Result<Self> {
        Ok(Self::with_bridge(Bridge::new(transport, BridgeConfig::device_capabilities())?))
    }

    /// Wrap an existing bridge.
    pub fn with_bridge(bridge: Bridge) -> Self {
        Self { bridge }
    }

    /// Underlying bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Processor count, architecture and load.
    pub fn get_cpu_info(&self) -> PendingReply {
        self.bridge.send("getCPUInfo", ())
    }

    /// Supported audio and video codecs.
    pub fn get_codecs_info(&self) -> PendingReply {
        self.bridge.send("getCodecsInfo", ())
    }

    /// Attached displays.
    pub fn get_display_info(&self) -> PendingReply {
        self.bridge.send("getDisplayInfo", ())
    }

    /// Total and available memory.
    pub fn get_memory_info(&self) -> PendingReply {
        self.bridge.send("getMemoryInfo", ())
    }

    /// Resolves with `{"storages": [...]}`; each storage unit is a record.
    pub fn get_storage_info(&self) -> PendingReply {
        self.bridge.send("getStorageInfo", ())
    }

    /// Subscribe to one of the `ON_*` notifications.
    pub fn add_event_listener<F>(&self, event_name: &str, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.bridge.subscribe(event_name, callback)
    }

    /// Drop a listener added with [`add_event_listener`](Self::add_event_listener).
    pub fn remove_event_listener(&self, id: SubscriptionId) -> bool {
        self.bridge.unsubscribe(id)
    }
}

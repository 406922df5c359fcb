//! Capability facades.
//!
//! Typed wrappers over a single [`Bridge`](crate::Bridge), one per native
//! extension. Each method maps to one command; payload schemas are left to
//! the caller as `serde_json::Value`.

mod ardrone;
mod contacts;
mod device_capabilities;

pub use ardrone::ArDrone;
pub use contacts::Contacts;
pub use device_capabilities::DeviceCapabilities;

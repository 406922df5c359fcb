//! Transport implementations.
//!
//! Concrete implementations of the domain-level `HostTransport` trait,
//! exposed only through constructor functions and their native-side handles.
//!
//! Domain code must not depend on transport-specific types.

mod channel;
mod memory;
mod runner;

pub use channel::{create_transport as create_channel_transport, NativeEndpoint};
pub use memory::{create_transport as create_memory_transport, MemoryHost, SyncResponder};

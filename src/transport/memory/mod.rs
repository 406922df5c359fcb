// src/transport/memory/mod.rs

//! In-memory transport implementation.
//!
//! A pure in-process stand-in for the embedding runtime's extension channel,
//! used by tests, demos, and as the reference for transport semantics:
//!
//! - `post_message()` only records; it never calls back into the bridge.
//! - Inbound delivery happens when the host side calls
//!   [`MemoryHost::deliver`], synchronously on that thread.
//! - Nothing is dropped, reordered or delayed.

mod transport;

pub use transport::{create_transport, MemoryHost, SyncResponder};

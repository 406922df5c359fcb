//! Domain layer public interface.
//!
//! Abstractions that are independent of any concrete host runtime. All
//! consumers import these symbols via this module, not by referencing
//! individual files directly.

mod transport;

pub use transport::{
    //
    HostTransport,
    MessageListener,
    TransportBase,
    TransportPtr,
};

//! Wire protocol between the bridge and a native extension.
//!
//! Outbound traffic is a flat JSON object ([`CommandEnvelope`]); inbound text
//! is classified once, at the transport boundary, into an [`Inbound`] value.
mod envelope;
mod wire;

pub use envelope::{CommandEnvelope, Inbound};
pub use wire::WireFormat;

//! Realtime delivery
//!
//! Domain mutations publish [`nexus_core::events::DomainEvent`]s through
//! the [`RealtimeHub`]; WebSocket sessions subscribe and forward the
//! frames their client is addressed by.

pub mod hub;
pub mod ws;

pub use hub::{RealtimeHub, RelayFrame};
pub use ws::ws_handler;

//! EventBus - broadcast of analysis events to realtime subscribers.
//!
//! Workers publish here after persisting an analysis; a websocket hub or
//! any internal listener subscribes.

/// Core event bus implementation (broadcast channel).
pub mod bus;
/// Event type definitions.
pub mod types;

pub use bus::EventBus;
pub use types::AnalysisEvent;

#[cfg(test)]
mod tests;

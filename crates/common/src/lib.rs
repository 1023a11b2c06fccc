//! Shared identifier types used across the order command system.

pub mod types;

pub use types::{CommandId, EventId, OrderId};

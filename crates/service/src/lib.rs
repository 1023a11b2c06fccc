//! Application layer for the order command system.
//!
//! Composes the deduplicator, the order factory, and the ledger into an
//! atomic command path, and runs the background relay that drains the
//! outbox to the message bus.

pub mod commands;
pub mod dedup;
pub mod error;
pub mod publisher;
pub mod relay;

pub use commands::OrderCommandService;
pub use dedup::{Admission, CommandDeduplicator};
pub use error::{CommandError, PublishError};
pub use publisher::{EventPublisher, InMemoryPublisher};
pub use relay::{OutboxRelay, RelayConfig, RelayHandle};

//! Transactional ledger for the order command system.
//!
//! Three co-located tables — orders, processed commands, and pending
//! outbox events — written in a single atomic commit so the order record
//! and the event describing it can never exist without each other.

pub mod command;
pub mod error;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod store;

pub use command::ProcessedCommand;
pub use error::{LedgerError, Result};
pub use memory::InMemoryLedger;
pub use outbox::{BusMessage, OutboxEvent};
pub use postgres::PostgresLedger;
pub use store::LedgerStore;

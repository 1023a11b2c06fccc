use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CommandId, EventId, OrderId};
use domain::Order;

use crate::{OutboxEvent, ProcessedCommand, Result};

/// Storage contract for the order ledger.
///
/// All implementations must be thread-safe (Send + Sync). Correctness
/// under concurrent duplicate submissions comes from the unique key on
/// the command id, not from application-level locking: losers of the
/// race get [`LedgerError::DuplicateCommand`](crate::LedgerError) and
/// re-read the winner's record.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Retrieves an order by id.
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves the processed-command record for an idempotency key.
    async fn find_processed_command(
        &self,
        command_id: CommandId,
    ) -> Result<Option<ProcessedCommand>>;

    /// Atomically writes the order, its processed-command record, and the
    /// pending outbox event.
    ///
    /// The three writes share one transaction: either all rows exist
    /// afterwards or none do. Fails with
    /// [`LedgerError::DuplicateCommand`](crate::LedgerError) when another
    /// caller committed the same command id first.
    async fn commit_new_order(
        &self,
        order: &Order,
        command: &ProcessedCommand,
        event: &OutboxEvent,
    ) -> Result<()>;

    /// Claims up to `limit` undelivered events, oldest first.
    ///
    /// Claimed rows are leased for `lease`; rows already leased or locked
    /// by a concurrent worker are skipped, never waited on. An event whose
    /// lease expired without being marked delivered becomes claimable
    /// again on the next call.
    async fn claim_pending_events(&self, limit: u32, lease: Duration) -> Result<Vec<OutboxEvent>>;

    /// Marks an event delivered after the bus acknowledged it.
    ///
    /// Once set, the delivered flag is never reset; calling this for an
    /// already-delivered event is a no-op.
    async fn mark_delivered(&self, event_id: EventId, delivered_at: DateTime<Utc>) -> Result<()>;
}

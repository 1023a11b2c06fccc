//! Command orchestration: admission, factory, atomic commit.

use common::{CommandId, OrderId};
use domain::{Order, OrderItem, UserId};
use ledger::{LedgerError, LedgerStore, OutboxEvent, ProcessedCommand};

use crate::dedup::{Admission, CommandDeduplicator};
use crate::error::CommandError;

/// Service handling order-creation commands exactly once per command id.
///
/// The order row, the processed-command record, and the pending outbox
/// event are committed in one ledger transaction, so the order and the
/// event describing it can never exist without each other.
pub struct OrderCommandService<L> {
    ledger: L,
    dedup: CommandDeduplicator<L>,
}

impl<L: LedgerStore + Clone> OrderCommandService<L> {
    /// Creates a new command service over the given ledger.
    pub fn new(ledger: L) -> Self {
        Self {
            dedup: CommandDeduplicator::new(ledger.clone()),
            ledger,
        }
    }

    /// Creates an order, or returns the prior order id for a replay.
    ///
    /// Validation failures propagate before anything is written. A
    /// commit-time collision on the command id gets exactly one narrow
    /// retry that re-reads the winning record; the factory never runs a
    /// second time for the same call.
    #[tracing::instrument(skip(self, items))]
    pub async fn create_order(
        &self,
        command_id: CommandId,
        user_id: UserId,
        items: Vec<OrderItem>,
    ) -> Result<OrderId, CommandError> {
        if let Admission::Replay(order_id) = self.dedup.admit(command_id).await? {
            tracing::debug!(%order_id, "replaying previously processed command");
            metrics::counter!("commands_replayed").increment(1);
            return Ok(order_id);
        }

        let order = Order::place(user_id, items)?;
        let command = ProcessedCommand::new(command_id, order.id());
        let event = OutboxEvent::order_created(&order).map_err(LedgerError::Serialization)?;

        match self.ledger.commit_new_order(&order, &command, &event).await {
            Ok(()) => {
                tracing::info!(order_id = %order.id(), "order created");
                metrics::counter!("orders_created").increment(1);
                Ok(order.id())
            }
            Err(LedgerError::DuplicateCommand(_)) => {
                // Lost the race to a concurrent identical submission;
                // converge on the winner's order id.
                match self.dedup.admit(command_id).await? {
                    Admission::Replay(order_id) => {
                        metrics::counter!("commands_replayed").increment(1);
                        Ok(order_id)
                    }
                    Admission::NotSeen => Err(CommandError::UnresolvedConflict(command_id)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Retrieves a previously created order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, CommandError> {
        Ok(self.ledger.find_order(order_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use common::EventId;
    use domain::{Money, OrderError, ProductId};
    use ledger::InMemoryLedger;

    fn items(quantity: u32, cents: i64) -> Vec<OrderItem> {
        vec![OrderItem::new(ProductId::new(), quantity, Money::from_cents(cents))]
    }

    #[tokio::test]
    async fn test_create_order_commits_all_three_rows() {
        let ledger = InMemoryLedger::new();
        let service = OrderCommandService::new(ledger.clone());

        let order_id = service
            .create_order(CommandId::new(), UserId::new(), items(2, 10000))
            .await
            .unwrap();

        assert_eq!(ledger.order_count().await, 1);
        assert_eq!(ledger.command_count().await, 1);
        assert_eq!(ledger.outbox_count().await, 1);

        let order = service.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.total_amount(), Money::from_cents(20000));
    }

    #[tokio::test]
    async fn test_replay_returns_same_order_without_new_rows() {
        let ledger = InMemoryLedger::new();
        let service = OrderCommandService::new(ledger.clone());
        let command_id = CommandId::new();
        let user_id = UserId::new();

        let first = service
            .create_order(command_id, user_id, items(1, 5000))
            .await
            .unwrap();
        // A retry may even carry a different item list; the original
        // outcome still wins.
        let second = service
            .create_order(command_id, user_id, items(3, 9999))
            .await
            .unwrap();

        assert_eq!(second, first);
        assert_eq!(ledger.order_count().await, 1);
        assert_eq!(ledger.command_count().await, 1);
        assert_eq!(ledger.outbox_count().await, 1);
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let ledger = InMemoryLedger::new();
        let service = OrderCommandService::new(ledger.clone());

        let empty = service
            .create_order(CommandId::new(), UserId::new(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(empty, CommandError::Validation(OrderError::NoItems)));

        let zero_quantity = service
            .create_order(CommandId::new(), UserId::new(), items(0, 100))
            .await
            .unwrap_err();
        assert!(matches!(
            zero_quantity,
            CommandError::Validation(OrderError::InvalidQuantity { .. })
        ));

        let negative_price = service
            .create_order(CommandId::new(), UserId::new(), items(1, -1))
            .await
            .unwrap_err();
        assert!(matches!(
            negative_price,
            CommandError::Validation(OrderError::NegativePrice { .. })
        ));

        assert_eq!(ledger.order_count().await, 0);
        assert_eq!(ledger.command_count().await, 0);
        assert_eq!(ledger.outbox_count().await, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_fails_the_whole_command() {
        let ledger = InMemoryLedger::new();
        let service = OrderCommandService::new(ledger.clone());
        ledger.set_fail_commits(true).await;

        let err = service
            .create_order(CommandId::new(), UserId::new(), items(1, 100))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::Ledger(LedgerError::Unavailable(_))
        ));
        assert_eq!(ledger.order_count().await, 0);
        assert_eq!(ledger.outbox_count().await, 0);
    }

    /// Ledger wrapper that hides processed commands from the first
    /// `hidden_reads` lookups, forcing the orchestrator down the
    /// commit-collision path deterministically.
    #[derive(Clone)]
    struct RacingLedger {
        inner: InMemoryLedger,
        hidden_reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LedgerStore for RacingLedger {
        async fn find_order(&self, order_id: OrderId) -> ledger::Result<Option<Order>> {
            self.inner.find_order(order_id).await
        }

        async fn find_processed_command(
            &self,
            command_id: CommandId,
        ) -> ledger::Result<Option<ProcessedCommand>> {
            if self.hidden_reads.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok()
            {
                return Ok(None);
            }
            self.inner.find_processed_command(command_id).await
        }

        async fn commit_new_order(
            &self,
            order: &Order,
            command: &ProcessedCommand,
            event: &OutboxEvent,
        ) -> ledger::Result<()> {
            self.inner.commit_new_order(order, command, event).await
        }

        async fn claim_pending_events(
            &self,
            limit: u32,
            lease: Duration,
        ) -> ledger::Result<Vec<OutboxEvent>> {
            self.inner.claim_pending_events(limit, lease).await
        }

        async fn mark_delivered(
            &self,
            event_id: EventId,
            delivered_at: DateTime<Utc>,
        ) -> ledger::Result<()> {
            self.inner.mark_delivered(event_id, delivered_at).await
        }
    }

    #[tokio::test]
    async fn test_commit_collision_resolves_to_the_winning_order() {
        let inner = InMemoryLedger::new();
        let command_id = CommandId::new();
        let user_id = UserId::new();

        // The "winner": a concurrent submission that committed between
        // this caller's admission check and its own commit.
        let winner = OrderCommandService::new(inner.clone());
        let winning_id = winner
            .create_order(command_id, user_id, items(1, 100))
            .await
            .unwrap();

        let racing = RacingLedger {
            inner: inner.clone(),
            hidden_reads: Arc::new(AtomicUsize::new(1)),
        };
        let loser = OrderCommandService::new(racing);
        let resolved = loser
            .create_order(command_id, user_id, items(1, 100))
            .await
            .unwrap();

        assert_eq!(resolved, winning_id);
        // The losing attempt left no extra rows behind.
        assert_eq!(inner.order_count().await, 1);
        assert_eq!(inner.outbox_count().await, 1);
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CommandId, EventId, OrderId};
use domain::Order;
use tokio::sync::RwLock;

use crate::{LedgerError, LedgerStore, OutboxEvent, ProcessedCommand, Result};

#[derive(Debug, Clone)]
struct StoredEvent {
    event: OutboxEvent,
    claimed_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    orders: HashMap<OrderId, Order>,
    commands: HashMap<CommandId, ProcessedCommand>,
    outbox: Vec<StoredEvent>,
    fail_commits: bool,
}

/// In-memory ledger implementation for testing.
///
/// Provides the same interface and semantics as the PostgreSQL
/// implementation: the three-row commit is atomic (one lock), duplicate
/// command ids are rejected the way the unique key rejects them, and
/// claims respect leases.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of processed-command records.
    pub async fn command_count(&self) -> usize {
        self.state.read().await.commands.len()
    }

    /// Returns the total number of outbox events, delivered or not.
    pub async fn outbox_count(&self) -> usize {
        self.state.read().await.outbox.len()
    }

    /// Returns the number of undelivered outbox events.
    pub async fn pending_count(&self) -> usize {
        self.state
            .read()
            .await
            .outbox
            .iter()
            .filter(|e| !e.event.delivered)
            .count()
    }

    /// Returns a snapshot of every outbox event.
    pub async fn all_events(&self) -> Vec<OutboxEvent> {
        self.state
            .read()
            .await
            .outbox
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    /// Configures commits to fail as if the store were unreachable.
    pub async fn set_fail_commits(&self, fail: bool) {
        self.state.write().await.fail_commits = fail;
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn find_processed_command(
        &self,
        command_id: CommandId,
    ) -> Result<Option<ProcessedCommand>> {
        Ok(self.state.read().await.commands.get(&command_id).cloned())
    }

    async fn commit_new_order(
        &self,
        order: &Order,
        command: &ProcessedCommand,
        event: &OutboxEvent,
    ) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_commits {
            return Err(LedgerError::Unavailable("ledger offline".to_string()));
        }

        // Mirrors the unique-key constraint on command_id.
        if state.commands.contains_key(&command.command_id) {
            return Err(LedgerError::DuplicateCommand(command.command_id));
        }

        state.orders.insert(order.id(), order.clone());
        state.commands.insert(command.command_id, command.clone());
        state.outbox.push(StoredEvent {
            event: event.clone(),
            claimed_until: None,
        });

        Ok(())
    }

    async fn claim_pending_events(&self, limit: u32, lease: Duration) -> Result<Vec<OutboxEvent>> {
        let now = Utc::now();
        let leased_until = now + lease;
        let mut state = self.state.write().await;

        let mut claimable: Vec<usize> = state
            .outbox
            .iter()
            .enumerate()
            .filter(|(_, stored)| {
                !stored.event.delivered && stored.claimed_until.is_none_or(|t| t < now)
            })
            .map(|(i, _)| i)
            .collect();
        claimable.sort_by_key(|&i| state.outbox[i].event.created_at);
        claimable.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(claimable.len());
        for i in claimable {
            state.outbox[i].claimed_until = Some(leased_until);
            claimed.push(state.outbox[i].event.clone());
        }

        Ok(claimed)
    }

    async fn mark_delivered(&self, event_id: EventId, delivered_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;

        if let Some(stored) = state
            .outbox
            .iter_mut()
            .find(|e| e.event.event_id == event_id)
            && !stored.event.delivered
        {
            stored.event.delivered = true;
            stored.event.delivered_at = Some(delivered_at);
            stored.claimed_until = None;
        }

        Ok(())
    }
}

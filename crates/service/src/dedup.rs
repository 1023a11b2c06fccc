//! Idempotent command admission.

use common::{CommandId, OrderId};
use ledger::LedgerStore;

use crate::error::CommandError;

/// Outcome of admitting a command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The command was already executed; the caller gets the prior
    /// outcome without re-running any side effects.
    Replay(OrderId),

    /// First sighting of this command id.
    NotSeen,
}

/// Decides whether a command id has already been admitted.
///
/// The lookup here is a fast path; the authoritative check is the unique
/// key the ledger enforces at commit time. When two callers race past
/// this lookup, the loser's commit collides and the orchestrator calls
/// [`admit`](CommandDeduplicator::admit) again to pick up the winner's
/// record.
pub struct CommandDeduplicator<L> {
    ledger: L,
}

impl<L: LedgerStore> CommandDeduplicator<L> {
    /// Creates a deduplicator over the given ledger.
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Returns the prior outcome for `command_id`, or `NotSeen`.
    pub async fn admit(&self, command_id: CommandId) -> Result<Admission, CommandError> {
        match self.ledger.find_processed_command(command_id).await? {
            Some(record) => Ok(Admission::Replay(record.order_id)),
            None => Ok(Admission::NotSeen),
        }
    }
}

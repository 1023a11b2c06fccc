//! Processed-command records backing idempotent admission.

use chrono::{DateTime, Utc};
use common::{CommandId, OrderId};

/// Record of an admitted command, keyed by its idempotency id.
///
/// The mapping from command id to order id is one-to-one and, once
/// written, never changes. The row is committed in the same transaction
/// as the order it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedCommand {
    /// The caller-supplied idempotency key.
    pub command_id: CommandId,

    /// The order this command created.
    pub order_id: OrderId,

    /// When the command was admitted.
    pub processed_at: DateTime<Utc>,
}

impl ProcessedCommand {
    /// Creates a record for a command admitted now.
    pub fn new(command_id: CommandId, order_id: OrderId) -> Self {
        Self {
            command_id,
            order_id,
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_binds_command_to_order() {
        let command_id = CommandId::new();
        let order_id = OrderId::new();

        let record = ProcessedCommand::new(command_id, order_id);

        assert_eq!(record.command_id, command_id);
        assert_eq!(record.order_id, order_id);
    }
}

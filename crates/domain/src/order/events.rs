//! Event payloads describing order state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, Order, OrderItem, OrderStatus, UserId};

/// Snapshot payload written to the outbox when an order is created.
///
/// Carries everything a downstream consumer needs to reconstruct the
/// order without calling back into this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// The user who placed the order.
    pub user_id: UserId,

    /// Line items in their original order.
    pub items: Vec<OrderItem>,

    /// Total amount across all items.
    pub total_amount: Money,

    /// Status at creation time (always `New`).
    pub status: OrderStatus,

    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

impl OrderCreated {
    /// Event type tag used on the outbox row and the bus message.
    pub const EVENT_TYPE: &'static str = "OrderCreated";
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            user_id: order.user_id(),
            items: order.items().to_vec(),
            total_amount: order.total_amount(),
            status: order.status(),
            created_at: order.created_at(),
        }
    }
}

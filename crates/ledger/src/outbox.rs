//! Pending outbox events and the bus message shape they publish as.

use chrono::{DateTime, Utc};
use common::{EventId, OrderId};
use domain::{Order, OrderCreated};
use serde::{Deserialize, Serialize};

/// A pending (or delivered) event row in the outbox table.
///
/// Created in the same transaction as the state change it describes;
/// the relay is the only writer afterwards, and it only ever flips
/// `delivered` from false to true.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEvent {
    /// Unique event id; consumers deduplicate deliveries by it.
    pub event_id: EventId,

    /// The order this event belongs to.
    pub aggregate_id: OrderId,

    /// Event type tag, e.g. `"OrderCreated"`.
    pub event_type: String,

    /// JSON snapshot sufficient for downstream reconstruction.
    pub payload: serde_json::Value,

    /// Whether the bus has acknowledged this event.
    pub delivered: bool,

    /// When the event row was created.
    pub created_at: DateTime<Utc>,

    /// Set only on confirmed publish.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// Builds the pending event for a freshly placed order.
    pub fn order_created(order: &Order) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self {
            event_id: EventId::new(),
            aggregate_id: order.id(),
            event_type: OrderCreated::EVENT_TYPE.to_string(),
            payload: serde_json::to_value(OrderCreated::from(order))?,
            delivered: false,
            created_at: Utc::now(),
            delivered_at: None,
        })
    }

    /// Returns the wire message published for this event.
    pub fn to_message(&self) -> BusMessage {
        BusMessage {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            event_type: self.event_type.clone(),
            payload: self.payload.clone(),
            occurred_at: self.created_at,
        }
    }
}

/// The message shape delivered to the order-events channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub event_id: EventId,
    pub aggregate_id: OrderId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, OrderItem, ProductId, UserId};

    fn placed_order() -> Order {
        Order::place(
            UserId::new(),
            vec![OrderItem::new(ProductId::new(), 2, Money::from_cents(10000))],
        )
        .unwrap()
    }

    #[test]
    fn test_order_created_starts_pending() {
        let order = placed_order();
        let event = OutboxEvent::order_created(&order).unwrap();

        assert_eq!(event.aggregate_id, order.id());
        assert_eq!(event.event_type, "OrderCreated");
        assert!(!event.delivered);
        assert!(event.delivered_at.is_none());
    }

    #[test]
    fn test_payload_carries_the_snapshot() {
        let order = placed_order();
        let event = OutboxEvent::order_created(&order).unwrap();

        let payload: OrderCreated = serde_json::from_value(event.payload).unwrap();
        assert_eq!(payload.user_id, order.user_id());
        assert_eq!(payload.total_amount, Money::from_cents(20000));
    }

    #[test]
    fn test_to_message_keeps_ids_and_timestamp() {
        let order = placed_order();
        let event = OutboxEvent::order_created(&order).unwrap();

        let message = event.to_message();

        assert_eq!(message.event_id, event.event_id);
        assert_eq!(message.aggregate_id, order.id());
        assert_eq!(message.event_type, event.event_type);
        assert_eq!(message.occurred_at, event.created_at);
    }
}

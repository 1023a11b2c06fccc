//! Order aggregate and its factory.

use chrono::{DateTime, Utc};
use common::OrderId;

use super::{Money, OrderError, OrderItem, OrderStatus, UserId};

/// Order aggregate root.
///
/// Built exactly once by [`Order::place`]; this core never mutates an
/// order after it has been persisted. The total amount always equals the
/// fixed-point sum of `quantity * unit_price` over the items, in item
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    total_amount: Money,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Validates the items and builds a new order with a fresh id.
    ///
    /// The item list must be non-empty, every quantity must be greater
    /// than zero, and no unit price may be negative. Validation happens
    /// before any write, so a rejected command leaves no state behind.
    pub fn place(user_id: UserId, items: Vec<OrderItem>) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }

        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderError::NegativePrice {
                    product_id: item.product_id,
                    cents: item.unit_price.cents(),
                });
            }
        }

        let mut total_amount = Money::zero();
        for item in &items {
            total_amount += item.total_price();
        }

        Ok(Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::New,
            total_amount,
            items,
            created_at: Utc::now(),
        })
    }

    /// Rebuilds an order from its persisted representation.
    ///
    /// Used by the storage layer when reading an order back; performs no
    /// validation since the row was validated when it was written.
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        total_amount: Money,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            total_amount,
            items,
            created_at,
        }
    }

    /// Returns the order id.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the owning user id.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the total amount.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the items in insertion order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns when the order was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//! Order aggregate and related types.

mod aggregate;
mod events;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use events::OrderCreated;
pub use status::{OrderStatus, UnknownStatus};
pub use value_objects::{Money, OrderItem, ProductId, UserId};

use thiserror::Error;

/// Validation errors raised while building an order.
///
/// All of these are rejected before any write happens, so a failing
/// command leaves no trace in storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// An order must contain at least one item.
    #[error("order has no items")]
    NoItems,

    /// Item quantity must be greater than zero.
    #[error("invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Item unit price must not be negative.
    #[error("negative unit price {cents} cents for product {product_id}")]
    NegativePrice { product_id: ProductId, cents: i64 },
}

//! Domain layer for the order command system.
//!
//! Holds the order aggregate, its value objects, and the validation rules
//! applied before anything is written to storage.

pub mod order;

pub use order::{
    Money, Order, OrderCreated, OrderError, OrderItem, OrderStatus, ProductId, UnknownStatus,
    UserId,
};

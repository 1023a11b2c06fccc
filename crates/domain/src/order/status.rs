//! Order lifecycle states.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The state of an order in its lifecycle.
///
/// This core only ever creates orders in the `New` state; the later
/// transitions belong to reservation, payment, and fulfillment logic
/// that lives outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order has been created and not yet picked up by fulfillment.
    #[default]
    New,

    /// Stock reservation is in progress.
    ReservingStock,

    /// Awaiting payment.
    PendingPayment,

    /// Payment confirmed.
    Paid,

    /// Order confirmed (terminal).
    Confirmed,

    /// Order canceled (terminal).
    Canceled,
}

/// Error returned when a persisted status string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::ReservingStock => "ReservingStock",
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::Paid => "Paid",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(OrderStatus::New),
            "ReservingStock" => Ok(OrderStatus::ReservingStock),
            "PendingPayment" => Ok(OrderStatus::PendingPayment),
            "Paid" => Ok(OrderStatus::Paid),
            "Confirmed" => Ok(OrderStatus::Confirmed),
            "Canceled" => Ok(OrderStatus::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

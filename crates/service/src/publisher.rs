//! Message-bus publisher trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::EventId;
use ledger::BusMessage;

use crate::error::PublishError;

/// Trait for publishing order events to the message bus.
///
/// The transport itself lives outside this system; implementations wrap
/// whatever client the deployment uses. Returning `Ok` means the bus
/// acknowledged the message — only then may the relay mark the event
/// delivered.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes a message to the order-events channel.
    async fn publish(&self, message: &BusMessage) -> Result<(), PublishError>;
}

#[derive(Debug, Default)]
struct InMemoryBusState {
    messages: Vec<BusMessage>,
    fail_publishes: bool,
}

/// In-memory publisher for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    state: Arc<RwLock<InMemoryBusState>>,
}

impl InMemoryPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail as if the bus were unreachable.
    pub fn set_fail_publishes(&self, fail: bool) {
        self.state.write().unwrap().fail_publishes = fail;
    }

    /// Returns the number of acknowledged messages.
    pub fn published_count(&self) -> usize {
        self.state.read().unwrap().messages.len()
    }

    /// Returns every acknowledged message in publish order.
    pub fn messages(&self) -> Vec<BusMessage> {
        self.state.read().unwrap().messages.clone()
    }

    /// Returns how many times an event id was published.
    ///
    /// Delivery is at-least-once, so counts above one are legal.
    pub fn publish_count_for(&self, event_id: EventId) -> usize {
        self.state
            .read()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.event_id == event_id)
            .count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, message: &BusMessage) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap();

        if state.fail_publishes {
            return Err(PublishError::Unavailable("bus offline".to_string()));
        }

        state.messages.push(message.clone());
        Ok(())
    }
}

//! Background relay that drains the outbox to the message bus.

use std::time::Duration;

use chrono::Utc;
use ledger::{LedgerError, LedgerStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::publisher::EventPublisher;

/// Tuning knobs for the outbox relay.
///
/// These affect latency and throughput only, never correctness.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How often the relay polls for pending events.
    pub poll_interval: Duration,

    /// Maximum events claimed per cycle.
    pub batch_size: u32,

    /// Lease applied to claimed rows; an expired lease releases the
    /// claim so a crashed worker needs no explicit cleanup.
    pub claim_lease: Duration,

    /// Upper bound on a single publish attempt, so a stalled bus cannot
    /// starve the relay.
    pub publish_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
            claim_lease: Duration::from_secs(30),
            publish_timeout: Duration::from_secs(5),
        }
    }
}

/// Periodically claims pending outbox events, publishes them, and marks
/// them delivered once the bus acknowledges.
///
/// Multiple relay instances may run against the same ledger: claims are
/// lease-based and skip rows held by other workers, so no two workers
/// process the same row at the same time. Delivery is at-least-once —
/// a crash between bus acknowledgment and the delivered mark re-publishes
/// the event on a later cycle, and consumers deduplicate by event id.
pub struct OutboxRelay<L, P> {
    ledger: L,
    publisher: P,
    config: RelayConfig,
}

impl<L, P> OutboxRelay<L, P>
where
    L: LedgerStore + 'static,
    P: EventPublisher + 'static,
{
    /// Creates a relay over the given ledger and publisher.
    pub fn new(ledger: L, publisher: P, config: RelayConfig) -> Self {
        Self {
            ledger,
            publisher,
            config,
        }
    }

    /// Runs one claim-publish-mark cycle.
    ///
    /// Returns the number of events delivered. Events whose publish
    /// fails or times out stay pending; they are retried on a later
    /// cycle once their lease expires. No event is marked delivered
    /// without positive acknowledgment from the bus.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> Result<usize, LedgerError> {
        let events = self
            .ledger
            .claim_pending_events(self.config.batch_size, self.config.claim_lease)
            .await?;

        let mut delivered = 0;
        for event in events {
            let message = event.to_message();

            match tokio::time::timeout(
                self.config.publish_timeout,
                self.publisher.publish(&message),
            )
            .await
            {
                Ok(Ok(())) => {
                    self.ledger
                        .mark_delivered(event.event_id, Utc::now())
                        .await?;
                    delivered += 1;
                    metrics::counter!("outbox_events_delivered").increment(1);
                    tracing::debug!(event_id = %event.event_id, "outbox event delivered");
                }
                Ok(Err(e)) => {
                    metrics::counter!("outbox_publish_failures").increment(1);
                    tracing::warn!(
                        event_id = %event.event_id,
                        error = %e,
                        "publish failed, event stays pending"
                    );
                }
                Err(_) => {
                    metrics::counter!("outbox_publish_failures").increment(1);
                    tracing::warn!(
                        event_id = %event.event_id,
                        timeout = ?self.config.publish_timeout,
                        "publish timed out, event stays pending"
                    );
                }
            }
        }

        Ok(delivered)
    }

    /// Starts the relay loop, ticking every `poll_interval` until the
    /// returned handle is shut down.
    pub fn start(self) -> RelayHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.run_once().await {
                            tracing::error!(error = %e, "outbox relay cycle failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("outbox relay stopping");
                        break;
                    }
                }
            }
        });

        RelayHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle for stopping a running relay.
///
/// Shutdown lands between cycles: the in-flight cycle finishes first, so
/// a publish that was never acknowledged is never marked delivered.
pub struct RelayHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Signals the relay to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

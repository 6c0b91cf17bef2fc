//! Typed publish/consume on top of a [`MessageBroker`].

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use serde::Serialize;
use serde::de::DeserializeOwned;

use payment_types::{BrokerConnector, BrokerError, Delivery, MessageBroker, Settlement, Subscription};

use crate::retry::{ConnectRetry, connect_with_retry};

/// Maximum number of unsettled deliveries per consumer. One keeps handling
/// strictly sequential.
pub const PREFETCH: u16 = 1;

/// Pause after a failed receive before asking the broker again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Handles decoded events from a queue.
///
/// Returning `Ok` acknowledges the delivery; returning `Err` rejects it so
/// the broker redelivers it.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    async fn handle(&self, event: E) -> anyhow::Result<()>;
}

/// JSON event bus over a connected broker.
///
/// Queues are declared durable before first use and remembered, so the
/// declaration round trip happens once per queue per process.
pub struct EventBus<B: MessageBroker> {
    broker: B,
    declared: DashSet<String>,
}

impl<B: MessageBroker> EventBus<B> {
    /// Wraps an already connected broker.
    pub fn new(broker: B) -> Self {
        Self {
            broker,
            declared: DashSet::new(),
        }
    }

    /// Connects through `connector`, retrying per `retry`.
    pub async fn connect<C>(connector: &C, retry: &ConnectRetry) -> Result<Self, BrokerError>
    where
        C: BrokerConnector<Broker = B>,
    {
        let broker = connect_with_retry(connector, retry).await?;
        Ok(Self::new(broker))
    }

    async fn ensure_queue(&self, queue: &str) -> Result<(), BrokerError> {
        if self.declared.contains(queue) {
            return Ok(());
        }
        self.broker.declare_queue(queue).await?;
        self.declared.insert(queue.to_string());
        tracing::debug!(queue, "Declared durable queue");
        Ok(())
    }

    /// Publishes `event` as a persistent JSON message on a durable queue.
    ///
    /// Returns once the broker accepted the message.
    pub async fn publish<E>(&self, queue: &str, event: &E) -> Result<(), BrokerError>
    where
        E: Serialize + Sync,
    {
        let body =
            serde_json::to_vec(event).map_err(|e| BrokerError::Serialization(e.to_string()))?;
        self.ensure_queue(queue).await?;
        self.broker.publish(queue, body).await?;
        tracing::debug!(queue, "Published event");
        Ok(())
    }

    /// Fire-and-forget publish: a failure is logged and otherwise ignored.
    pub async fn publish_or_log<E>(&self, queue: &str, event: &E)
    where
        E: Serialize + Sync,
    {
        if let Err(err) = self.publish(queue, event).await {
            tracing::error!(queue, error = %err, "Failed to publish event");
        }
    }

    /// Consumes `queue` until the subscription ends.
    ///
    /// Every delivery is settled exactly once: acknowledged when it decodes
    /// and `handler` succeeds, rejected otherwise. Receive errors are logged
    /// and the loop keeps going.
    pub async fn consume<E, H>(&self, queue: &str, handler: &H) -> Result<(), BrokerError>
    where
        E: DeserializeOwned + Send + 'static,
        H: EventHandler<E>,
    {
        self.ensure_queue(queue).await?;
        let mut subscription = self.broker.subscribe(queue, PREFETCH).await?;

        tracing::info!(queue, prefetch = PREFETCH, "Starting to consume");

        loop {
            let delivery = match subscription.next().await {
                Ok(Some(delivery)) => delivery,
                Ok(None) => {
                    tracing::info!(queue, "Subscription closed");
                    return Ok(());
                }
                Err(err) => {
                    tracing::error!(queue, error = %err, "Failed to receive message");
                    tokio::time::sleep(RECEIVE_BACKOFF).await;
                    continue;
                }
            };

            let settlement = Self::dispatch(&delivery, handler).await;
            let tag = delivery.tag();

            if let Err(err) = subscription.settle(delivery, settlement).await {
                tracing::warn!(
                    queue,
                    partition = tag.partition,
                    offset = tag.offset,
                    error = %err,
                    "Failed to settle delivery (message may be redelivered)"
                );
            }
        }
    }

    async fn dispatch<E, H>(delivery: &Delivery, handler: &H) -> Settlement
    where
        E: DeserializeOwned + Send + 'static,
        H: EventHandler<E>,
    {
        let event: E = match serde_json::from_slice(delivery.body()) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(
                    queue = delivery.queue(),
                    error = %err,
                    "Error processing message: undecodable body"
                );
                return Settlement::Reject;
            }
        };

        match handler.handle(event).await {
            Ok(()) => Settlement::Ack,
            Err(err) => {
                tracing::error!(
                    queue = delivery.queue(),
                    redelivered = delivery.redelivered(),
                    error = %err,
                    "Error processing message"
                );
                Settlement::Reject
            }
        }
    }
}

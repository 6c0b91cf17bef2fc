//! Message broker port traits.
//!
//! Queues are durable and messages persistent. Consumption is at-least-once:
//! a delivery leaves the queue only once it has been acknowledged.

use crate::error::BrokerError;

/// Broker-specific position of a delivery, used to settle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTag {
    pub partition: i32,
    pub offset: i64,
}

/// A message handed to a consumer and not yet settled.
///
/// Settling consumes the delivery, so each one moves from pending to
/// acked or rejected exactly once.
#[derive(Debug)]
pub struct Delivery {
    queue: String,
    body: Vec<u8>,
    tag: DeliveryTag,
    redelivered: bool,
}

impl Delivery {
    pub fn new(queue: impl Into<String>, body: Vec<u8>, tag: DeliveryTag, redelivered: bool) -> Self {
        Self {
            queue: queue.into(),
            body,
            tag,
            redelivered,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn tag(&self) -> DeliveryTag {
        self.tag
    }

    /// Whether the broker has handed this message out before.
    ///
    /// Best effort: brokers that cannot tell report `false`.
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }
}

/// How a delivery is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Remove the message from the queue.
    Ack,
    /// Return the message to the queue for redelivery.
    Reject,
}

/// A live consumer on one queue.
#[async_trait::async_trait]
pub trait Subscription: Send {
    /// Waits for the next delivery. `Ok(None)` means the subscription ended.
    async fn next(&mut self) -> Result<Option<Delivery>, BrokerError>;

    /// Acknowledges or rejects a delivery obtained from [`Subscription::next`].
    async fn settle(&mut self, delivery: Delivery, settlement: Settlement)
    -> Result<(), BrokerError>;
}

/// A connected message broker.
#[async_trait::async_trait]
pub trait MessageBroker: Send + Sync + 'static {
    type Subscription: Subscription;

    /// Declares a durable queue. Declaring an existing queue is a no-op.
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Publishes a persistent message. Returns once the broker accepted it.
    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError>;

    /// Starts consuming `queue` with at most `prefetch` unsettled deliveries.
    async fn subscribe(&self, queue: &str, prefetch: u16)
    -> Result<Self::Subscription, BrokerError>;
}

/// Opens connections to a broker.
#[async_trait::async_trait]
pub trait BrokerConnector: Send + Sync {
    type Broker: MessageBroker;

    /// Makes a single connection attempt.
    async fn connect(&self) -> Result<Self::Broker, BrokerError>;
}

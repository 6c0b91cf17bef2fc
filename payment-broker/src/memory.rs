//! In-process message broker.
//!
//! Mirrors the queue semantics the service relies on: durable declaration,
//! prefetch limits, requeue on reject, and requeue of everything a consumer
//! still holds when its subscription is dropped (the in-process equivalent
//! of a consumer crashing before it acknowledged).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use payment_types::{
    BrokerConnector, BrokerError, Delivery, DeliveryTag, MessageBroker, Settlement, Subscription,
};

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    notify: Notify,
    fail_publish: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct State {
    queues: HashMap<String, QueueState>,
    next_tag: i64,
    closed: bool,
}

#[derive(Default)]
struct QueueState {
    durable: bool,
    ready: VecDeque<StoredMessage>,
    unacked: HashMap<i64, StoredMessage>,
}

struct StoredMessage {
    body: Vec<u8>,
    redelivered: bool,
}

/// Cloneable handle to one in-process broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends every subscription; pending and future `next` calls return `None`.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.notify.notify_waiters();
    }

    /// Makes `publish` fail until reset.
    pub fn set_fail_publish(&self, fail: bool) {
        self.shared.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Bodies of the messages waiting in `queue`, oldest first.
    pub fn queued(&self, queue: &str) -> Vec<Vec<u8>> {
        self.shared
            .lock()
            .queues
            .get(queue)
            .map(|q| q.ready.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of delivered but unsettled messages in `queue`.
    pub fn unacked(&self, queue: &str) -> usize {
        self.shared
            .lock()
            .queues
            .get(queue)
            .map_or(0, |q| q.unacked.len())
    }

    pub fn is_durable(&self, queue: &str) -> bool {
        self.shared
            .lock()
            .queues
            .get(queue)
            .is_some_and(|q| q.durable)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    type Subscription = InMemorySubscription;

    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.shared
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .durable = true;
        Ok(())
    }

    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError> {
        if self.shared.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish {
                queue: queue.to_string(),
                reason: "broker rejected the message".to_string(),
            });
        }

        self.shared
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .ready
            .push_back(StoredMessage {
                body,
                redelivered: false,
            });
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &str,
        prefetch: u16,
    ) -> Result<InMemorySubscription, BrokerError> {
        self.shared
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default();

        Ok(InMemorySubscription {
            shared: self.shared.clone(),
            queue: queue.to_string(),
            prefetch: usize::from(prefetch.max(1)),
            in_flight: HashSet::new(),
        })
    }
}

/// Consumer on one in-process queue.
pub struct InMemorySubscription {
    shared: Arc<Shared>,
    queue: String,
    prefetch: usize,
    in_flight: HashSet<i64>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&mut self) -> Result<Option<Delivery>, BrokerError> {
        let shared = self.shared.clone();
        // A requeued message is ready again at once; let other tasks run.
        tokio::task::yield_now().await;

        loop {
            let notified = shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut guard = shared.lock();
                let State {
                    queues,
                    next_tag,
                    closed,
                } = &mut *guard;

                if *closed {
                    return Ok(None);
                }

                if self.in_flight.len() < self.prefetch {
                    if let Some(queue) = queues.get_mut(&self.queue) {
                        if let Some(message) = queue.ready.pop_front() {
                            *next_tag += 1;
                            let tag = *next_tag;
                            let delivery = Delivery::new(
                                &self.queue,
                                message.body.clone(),
                                DeliveryTag {
                                    partition: 0,
                                    offset: tag,
                                },
                                message.redelivered,
                            );
                            queue.unacked.insert(tag, message);
                            self.in_flight.insert(tag);
                            return Ok(Some(delivery));
                        }
                    }
                }
            }

            notified.await;
        }
    }

    async fn settle(
        &mut self,
        delivery: Delivery,
        settlement: Settlement,
    ) -> Result<(), BrokerError> {
        let tag = delivery.tag().offset;
        if !self.in_flight.remove(&tag) {
            return Err(BrokerError::Settle(format!(
                "delivery {tag} is not held by this subscription"
            )));
        }

        {
            let mut state = self.shared.lock();
            let queue = state.queues.entry(self.queue.clone()).or_default();
            if let Some(mut message) = queue.unacked.remove(&tag) {
                if settlement == Settlement::Reject {
                    message.redelivered = true;
                    queue.ready.push_front(message);
                }
            }
        }

        self.shared.notify.notify_waiters();
        Ok(())
    }
}

impl Drop for InMemorySubscription {
    fn drop(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }

        let mut tags: Vec<i64> = self.in_flight.drain().collect();
        tags.sort_unstable();

        {
            let mut state = self.shared.lock();
            let queue = state.queues.entry(self.queue.clone()).or_default();
            for tag in tags.into_iter().rev() {
                if let Some(mut message) = queue.unacked.remove(&tag) {
                    message.redelivered = true;
                    queue.ready.push_front(message);
                }
            }
        }

        self.shared.notify.notify_waiters();
    }
}

/// Connector that always hands out the same in-process broker.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    broker: InMemoryBroker,
}

impl InMemoryConnector {
    pub fn new(broker: InMemoryBroker) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl BrokerConnector for InMemoryConnector {
    type Broker = InMemoryBroker;

    async fn connect(&self) -> Result<InMemoryBroker, BrokerError> {
        Ok(self.broker.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_declare_marks_queue_durable() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("q").await.unwrap();
        assert!(broker.is_durable("q"));
    }

    #[tokio::test]
    async fn test_ack_removes_message() {
        let broker = InMemoryBroker::new();
        broker.publish("q", b"one".to_vec()).await.unwrap();

        let mut sub = broker.subscribe("q", 1).await.unwrap();
        let delivery = sub.next().await.unwrap().unwrap();
        assert_eq!(delivery.body(), b"one");
        assert_eq!(broker.unacked("q"), 1);

        sub.settle(delivery, Settlement::Ack).await.unwrap();

        assert_eq!(broker.unacked("q"), 0);
        assert!(broker.queued("q").is_empty());
    }

    #[tokio::test]
    async fn test_reject_requeues_at_front_as_redelivered() {
        let broker = InMemoryBroker::new();
        broker.publish("q", b"one".to_vec()).await.unwrap();
        broker.publish("q", b"two".to_vec()).await.unwrap();

        let mut sub = broker.subscribe("q", 1).await.unwrap();
        let first = sub.next().await.unwrap().unwrap();
        assert!(!first.redelivered());
        sub.settle(first, Settlement::Reject).await.unwrap();

        let again = sub.next().await.unwrap().unwrap();
        assert_eq!(again.body(), b"one");
        assert!(again.redelivered());
    }

    #[tokio::test]
    async fn test_prefetch_limits_unsettled_deliveries() {
        let broker = InMemoryBroker::new();
        broker.publish("q", b"one".to_vec()).await.unwrap();
        broker.publish("q", b"two".to_vec()).await.unwrap();

        let mut sub = broker.subscribe("q", 1).await.unwrap();
        let first = sub.next().await.unwrap().unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(blocked.is_err(), "second delivery must wait for the first to settle");

        sub.settle(first, Settlement::Ack).await.unwrap();
        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.body(), b"two");
    }

    #[tokio::test]
    async fn test_dropped_subscription_requeues_unsettled() {
        let broker = InMemoryBroker::new();
        broker.publish("q", b"one".to_vec()).await.unwrap();

        let mut sub = broker.subscribe("q", 1).await.unwrap();
        let _delivery = sub.next().await.unwrap().unwrap();
        drop(sub);

        assert_eq!(broker.unacked("q"), 0);
        assert_eq!(broker.queued("q"), vec![b"one".to_vec()]);
    }

    #[tokio::test]
    async fn test_close_ends_waiting_subscription() {
        let broker = InMemoryBroker::new();
        let mut sub = broker.subscribe("q", 1).await.unwrap();

        let closer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.close();
        });

        assert!(sub.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_failure_injection() {
        let broker = InMemoryBroker::new();
        broker.set_fail_publish(true);

        let result = broker.publish("q", b"x".to_vec()).await;

        assert!(matches!(result, Err(BrokerError::Publish { .. })));
        assert!(broker.queued("q").is_empty());
    }
}

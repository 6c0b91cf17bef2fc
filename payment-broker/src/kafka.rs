//! Kafka adapter for the broker port.
//!
//! A queue maps to a topic. Durability comes from `acks=all` with the
//! idempotent producer; declaring a queue creates its topic if missing.
//! Consumers never auto-commit: acknowledging a delivery commits the offset
//! after it, and rejecting one seeks the partition back so the same message
//! is fetched again.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};

use payment_types::{
    BrokerConnector, BrokerError, Delivery, DeliveryTag, MessageBroker, Settlement, Subscription,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for a Kafka cluster.
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    brokers: String,
    group_id: String,
    timeout: Duration,
}

impl KafkaConnector {
    /// `brokers` is a comma separated `host:port` list.
    pub fn new(brokers: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Timeout for producer acknowledgements, admin calls and metadata.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }
}

#[async_trait]
impl BrokerConnector for KafkaConnector {
    type Broker = KafkaBroker;

    async fn connect(&self) -> Result<KafkaBroker, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("message.timeout.ms", self.timeout.as_millis().to_string())
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create producer: {e}")))?;

        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create admin client: {e}")))?;

        // Client creation is lazy; a metadata round trip proves the cluster
        // is reachable.
        let client = producer.clone();
        let timeout = self.timeout;
        let brokers = tokio::task::spawn_blocking(move || {
            client
                .client()
                .fetch_metadata(None, Timeout::After(timeout))
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| BrokerError::Connection(e.to_string()))?
        .map_err(|e| BrokerError::Connection(e.to_string()))?;

        tracing::info!(brokers = %self.brokers, live_brokers = brokers, "Connected to Kafka");

        Ok(KafkaBroker {
            producer,
            admin,
            brokers: self.brokers.clone(),
            group_id: self.group_id.clone(),
            timeout: self.timeout,
        })
    }
}

/// Connected Kafka cluster.
pub struct KafkaBroker {
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
    brokers: String,
    group_id: String,
    timeout: Duration,
}

#[async_trait]
impl MessageBroker for KafkaBroker {
    type Subscription = KafkaSubscription;

    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let topic = NewTopic::new(queue, 1, TopicReplication::Fixed(1));
        let options = AdminOptions::new().operation_timeout(Some(Timeout::After(self.timeout)));

        let results = self
            .admin
            .create_topics(&[topic], &options)
            .await
            .map_err(|e| declare_error(queue, &e))?;

        for result in results {
            match result {
                Ok(_) | Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => {}
                Err((_, code)) => {
                    return Err(BrokerError::Declare {
                        queue: queue.to_string(),
                        reason: code.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError> {
        let record = FutureRecord::<(), [u8]>::to(queue).payload(&body);

        match self.producer.send(record, Timeout::After(self.timeout)).await {
            Ok((partition, offset)) => {
                tracing::trace!(queue, partition, offset, "Message persisted");
                Ok(())
            }
            Err((err, _)) => Err(BrokerError::Publish {
                queue: queue.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    async fn subscribe(
        &self,
        queue: &str,
        prefetch: u16,
    ) -> Result<KafkaSubscription, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .set("queued.min.messages", prefetch.max(1).to_string())
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[queue])
            .map_err(|e| BrokerError::Receive(format!("Failed to subscribe to {queue}: {e}")))?;

        tracing::info!(
            queue,
            group_id = %self.group_id,
            manual_commit = true,
            "Kafka subscription created"
        );

        Ok(KafkaSubscription {
            consumer,
            timeout: self.timeout,
            last_rejected: None,
        })
    }
}

fn declare_error(queue: &str, err: &KafkaError) -> BrokerError {
    BrokerError::Declare {
        queue: queue.to_string(),
        reason: err.to_string(),
    }
}

/// Consumer on one topic with manual offset management.
pub struct KafkaSubscription {
    consumer: StreamConsumer,
    timeout: Duration,
    last_rejected: Option<(String, DeliveryTag)>,
}

#[async_trait]
impl Subscription for KafkaSubscription {
    async fn next(&mut self) -> Result<Option<Delivery>, BrokerError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| BrokerError::Receive(e.to_string()))?;

        let tag = DeliveryTag {
            partition: message.partition(),
            offset: message.offset(),
        };
        let redelivered = self
            .last_rejected
            .as_ref()
            .is_some_and(|(topic, rejected)| topic == message.topic() && *rejected == tag);
        let body = message.payload().map(<[u8]>::to_vec).unwrap_or_default();

        Ok(Some(Delivery::new(message.topic(), body, tag, redelivered)))
    }

    async fn settle(
        &mut self,
        delivery: Delivery,
        settlement: Settlement,
    ) -> Result<(), BrokerError> {
        let tag = delivery.tag();

        match settlement {
            Settlement::Ack => {
                let mut offsets = TopicPartitionList::new();
                offsets
                    .add_partition_offset(delivery.queue(), tag.partition, Offset::Offset(tag.offset + 1))
                    .map_err(|e| BrokerError::Settle(e.to_string()))?;
                self.consumer
                    .commit(&offsets, CommitMode::Async)
                    .map_err(|e| BrokerError::Settle(e.to_string()))?;
                if self
                    .last_rejected
                    .as_ref()
                    .is_some_and(|(topic, rejected)| topic == delivery.queue() && *rejected == tag)
                {
                    self.last_rejected = None;
                }
            }
            Settlement::Reject => {
                self.consumer
                    .seek(
                        delivery.queue(),
                        tag.partition,
                        Offset::Offset(tag.offset),
                        Timeout::After(self.timeout),
                    )
                    .map_err(|e| BrokerError::Settle(e.to_string()))?;
                self.last_rejected = Some((delivery.queue().to_string(), tag));
            }
        }
        Ok(())
    }
}

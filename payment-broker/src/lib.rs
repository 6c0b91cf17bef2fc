//! # Payment Broker
//!
//! Durable, retry-capable messaging for the payment saga.
//!
//! ## Architecture
//!
//! - `retry` - Connection establishment with linear backoff
//! - `bus` - [`EventBus`]: typed publish and the consume loop with explicit
//!   acknowledge/reject
//! - `memory` - In-process broker used by tests and local runs
//! - `kafka` - Kafka adapter (feature `kafka`)
//!
//! ## Delivery semantics
//!
//! **At-least-once.** A message leaves its queue only after the handler
//! returned successfully and the delivery was acknowledged. A crash in
//! between causes redelivery, so handlers must tolerate duplicates.

pub mod bus;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod retry;

pub use bus::{EventBus, EventHandler, PREFETCH};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaBroker, KafkaConnector};
pub use memory::{InMemoryBroker, InMemoryConnector};
pub use retry::{ConnectRetry, connect_with_retry};

//! # Payment Store
//!
//! Concrete ledger store implementations (adapters) for the payment service.
//! This crate provides adapters that implement the `LedgerStore` port.
//!
//! Both adapters share one private record encoding: the credit as a decimal
//! integer string. No other service reads these bytes.

mod codec;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;

#[cfg(feature = "redis")]
#[cfg(test)]
mod redis_store_tests;

pub use memory::InMemoryLedgerStore;
#[cfg(feature = "redis")]
pub use redis_store::{RedisEndpoint, RedisLedgerStore};

//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The ledger and the saga depend on these traits, not concrete implementations.

mod broker;
mod outcome_log;
mod store;

pub use broker::{BrokerConnector, Delivery, DeliveryTag, MessageBroker, Settlement, Subscription};
pub use outcome_log::OutcomeLog;
pub use store::{CreditAdjustment, LedgerStore};

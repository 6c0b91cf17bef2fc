//! # Payment Hex
//!
//! Application layer and HTTP adapter for the payment service.
//!
//! ## Architecture
//!
//! - `ledger` - Credit ledger (balance rules over the store port)
//! - `saga` - Handler for reservation events from the order saga
//! - `dedup` - Outcome logs for redelivered reservations
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Everything is generic over the port traits in `payment-types`, so the
//! Redis/Kafka adapters and the in-memory ones are interchangeable.

pub mod dedup;
pub mod inbound;
pub mod ledger;
pub mod saga;

#[cfg(test)]
mod ledger_tests;

pub use dedup::{InMemoryOutcomeLog, NoDeduplication};
pub use ledger::CreditLedger;
pub use saga::{PaymentSaga, PublishMode};

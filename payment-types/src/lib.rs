//! # Payment Types
//!
//! Domain types and port traits for the payment ledger service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - User accounts and the saga events exchanged with the order
//!   and stock services
//! - `ports/` - Trait definitions that store and broker adapters implement
//! - `dto/` - Response bodies for the HTTP surface
//! - `error/` - Store, ledger, broker and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    PaymentFailed, PaymentOutcome, PaymentProcessed, ReservationConfirmed, UserAccount, UserId,
    queues,
};
pub use dto::*;
pub use error::{AppError, BrokerError, LedgerError, StoreError};
pub use ports::{
    BrokerConnector, CreditAdjustment, Delivery, DeliveryTag, LedgerStore, MessageBroker, OutcomeLog,
    Settlement, Subscription,
};

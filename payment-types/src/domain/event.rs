//! Saga events exchanged with the order and stock services.
//!
//! Events are immutable value objects. They are serialized as JSON at the
//! broker boundary and never mutated after construction.

use serde::{Deserialize, Serialize};

use super::account::UserId;

/// Queue names shared with the other saga participants.
pub mod queues {
    /// Inventory has been reserved; the payment service consumes this.
    pub const STOCK_SUBTRACTED: &str = "stock_subtracted";
    /// The user was charged successfully.
    pub const PAYMENT_PROCESSED: &str = "payment_processed";
    /// The user could not be charged.
    pub const PAYMENT_FAILED: &str = "payment_failed";
}

/// Inventory for an order has been reserved; charge the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationConfirmed {
    pub order_id: String,
    pub user_id: UserId,
    pub total_cost: i64,
}

/// Emitted after a successful debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProcessed {
    pub order_id: String,
    pub user_id: UserId,
    pub total_cost: i64,
}

/// Emitted when the debit could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub order_id: String,
    pub user_id: UserId,
    pub total_cost: i64,
    /// Human-readable failure reason
    pub reason: String,
}

/// The single outcome published for each consumed reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Processed(PaymentProcessed),
    Failed(PaymentFailed),
}

impl PaymentOutcome {
    /// Outcome for a successful debit.
    pub fn processed(event: &ReservationConfirmed) -> Self {
        Self::Processed(PaymentProcessed {
            order_id: event.order_id.clone(),
            user_id: event.user_id.clone(),
            total_cost: event.total_cost,
        })
    }

    /// Outcome for a failed debit.
    pub fn failed(event: &ReservationConfirmed, reason: impl Into<String>) -> Self {
        Self::Failed(PaymentFailed {
            order_id: event.order_id.clone(),
            user_id: event.user_id.clone(),
            total_cost: event.total_cost,
            reason: reason.into(),
        })
    }

    /// The queue this outcome is published to.
    pub fn queue(&self) -> &'static str {
        match self {
            Self::Processed(_) => queues::PAYMENT_PROCESSED,
            Self::Failed(_) => queues::PAYMENT_FAILED,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            Self::Processed(e) => &e.order_id,
            Self::Failed(e) => &e.order_id,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

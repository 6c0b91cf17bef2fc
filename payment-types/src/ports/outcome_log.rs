//! Deduplication port for redelivered reservations.

use crate::domain::PaymentOutcome;
use crate::error::StoreError;

/// Remembers the outcome published for each order.
///
/// The saga consults this before debiting. An implementation that never
/// remembers anything reproduces plain at-least-once behavior, where a
/// redelivered reservation is charged again.
#[async_trait::async_trait]
pub trait OutcomeLog: Send + Sync + 'static {
    /// Returns the outcome already produced for `order_id`, if any.
    async fn recorded(&self, order_id: &str) -> Result<Option<PaymentOutcome>, StoreError>;

    /// Records the outcome produced for its order.
    async fn record(&self, outcome: &PaymentOutcome) -> Result<(), StoreError>;
}

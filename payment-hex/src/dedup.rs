//! Outcome logs for redelivered reservations.

use async_trait::async_trait;
use dashmap::DashMap;

use payment_types::{OutcomeLog, PaymentOutcome, StoreError};

/// Remembers nothing: every delivery of a reservation is charged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeduplication;

#[async_trait]
impl OutcomeLog for NoDeduplication {
    async fn recorded(&self, _order_id: &str) -> Result<Option<PaymentOutcome>, StoreError> {
        Ok(None)
    }

    async fn record(&self, _outcome: &PaymentOutcome) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Process-local outcome log keyed by order id.
///
/// Survives redelivery but not a restart.
#[derive(Debug, Default)]
pub struct InMemoryOutcomeLog {
    outcomes: DashMap<String, PaymentOutcome>,
}

impl InMemoryOutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[async_trait]
impl OutcomeLog for InMemoryOutcomeLog {
    async fn recorded(&self, order_id: &str) -> Result<Option<PaymentOutcome>, StoreError> {
        Ok(self.outcomes.get(order_id).map(|entry| entry.value().clone()))
    }

    async fn record(&self, outcome: &PaymentOutcome) -> Result<(), StoreError> {
        self.outcomes
            .entry(outcome.order_id().to_string())
            .or_insert_with(|| outcome.clone());
        Ok(())
    }
}

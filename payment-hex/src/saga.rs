//! Payment step of the order saga.
//!
//! Consumes `ReservationConfirmed` events, debits the user and answers with
//! exactly one outcome event per reservation. A failed debit is a business
//! outcome (`PaymentFailed`), never a reason to redeliver the reservation.

use std::sync::Arc;

use async_trait::async_trait;

use payment_broker::{EventBus, EventHandler};
use payment_types::{
    BrokerError, LedgerStore, MessageBroker, OutcomeLog, PaymentOutcome, ReservationConfirmed,
    queues,
};

use crate::CreditLedger;
use crate::dedup::NoDeduplication;

/// What happens when the outcome event cannot be published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishMode {
    /// Log the failure and acknowledge the reservation anyway.
    #[default]
    FireAndForget,
    /// Fail the handler so the reservation is rejected and redelivered.
    Propagate,
}

/// Saga participant that charges users for reserved orders.
pub struct PaymentSaga<S: LedgerStore, B: MessageBroker, L: OutcomeLog = NoDeduplication> {
    ledger: Arc<CreditLedger<S>>,
    bus: Arc<EventBus<B>>,
    outcomes: L,
    mode: PublishMode,
}

impl<S: LedgerStore, B: MessageBroker> PaymentSaga<S, B> {
    /// Saga without deduplication, publishing fire-and-forget.
    pub fn new(ledger: Arc<CreditLedger<S>>, bus: Arc<EventBus<B>>) -> Self {
        Self {
            ledger,
            bus,
            outcomes: NoDeduplication,
            mode: PublishMode::default(),
        }
    }
}

impl<S: LedgerStore, B: MessageBroker, L: OutcomeLog> PaymentSaga<S, B, L> {
    /// Replaces the outcome log consulted before each debit.
    pub fn with_outcome_log<M: OutcomeLog>(self, outcomes: M) -> PaymentSaga<S, B, M> {
        PaymentSaga {
            ledger: self.ledger,
            bus: self.bus,
            outcomes,
            mode: self.mode,
        }
    }

    pub fn with_publish_mode(mut self, mode: PublishMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn outcome_log(&self) -> &L {
        &self.outcomes
    }

    /// Consumes `stock_subtracted` until the subscription ends.
    pub async fn run(&self) -> Result<(), BrokerError> {
        self.bus
            .consume::<ReservationConfirmed, _>(queues::STOCK_SUBTRACTED, self)
            .await
    }

    /// Charges the user for one reservation and publishes the outcome.
    ///
    /// A reservation whose order already has a recorded outcome is not
    /// charged again; the recorded outcome is republished instead.
    #[tracing::instrument(
        skip_all,
        fields(order_id = %event.order_id, user_id = %event.user_id, total_cost = event.total_cost)
    )]
    pub async fn process(&self, event: ReservationConfirmed) -> anyhow::Result<PaymentOutcome> {
        if let Some(previous) = self.outcomes.recorded(&event.order_id).await? {
            tracing::info!(
                processed = previous.is_processed(),
                "Reservation already settled, republishing outcome"
            );
            self.publish(&previous).await?;
            return Ok(previous);
        }

        let outcome = match self.ledger.debit(&event.user_id, event.total_cost).await {
            Ok(credit) => {
                tracing::info!(credit, "Payment processed");
                PaymentOutcome::processed(&event)
            }
            Err(err) => {
                tracing::warn!(reason = %err, "Payment failed");
                PaymentOutcome::failed(&event, err.to_string())
            }
        };

        if let Err(err) = self.outcomes.record(&outcome).await {
            tracing::error!(error = %err, "Failed to record payment outcome");
        }

        self.publish(&outcome).await?;
        Ok(outcome)
    }

    async fn publish(&self, outcome: &PaymentOutcome) -> Result<(), BrokerError> {
        let queue = outcome.queue();
        match (outcome, self.mode) {
            (PaymentOutcome::Processed(event), PublishMode::FireAndForget) => {
                self.bus.publish_or_log(queue, event).await;
            }
            (PaymentOutcome::Failed(event), PublishMode::FireAndForget) => {
                self.bus.publish_or_log(queue, event).await;
            }
            (PaymentOutcome::Processed(event), PublishMode::Propagate) => {
                self.bus.publish(queue, event).await?;
            }
            (PaymentOutcome::Failed(event), PublishMode::Propagate) => {
                self.bus.publish(queue, event).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S, B, L> EventHandler<ReservationConfirmed> for PaymentSaga<S, B, L>
where
    S: LedgerStore,
    B: MessageBroker,
    L: OutcomeLog,
{
    async fn handle(&self, event: ReservationConfirmed) -> anyhow::Result<()> {
        self.process(event).await.map(|_| ())
    }
}

//! Domain models for the payment ledger.

pub mod account;
pub mod event;

pub use account::{UserAccount, UserId};
pub use event::{PaymentFailed, PaymentOutcome, PaymentProcessed, ReservationConfirmed, queues};

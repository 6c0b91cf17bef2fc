//! Broker connection with retry.
//!
//! The broker may still be starting when the service boots, so connection
//! attempts are retried with a delay that grows linearly with the attempt
//! number. Running out of attempts is a startup failure, not something the
//! service recovers from at runtime.

use std::time::Duration;

use tokio::time::sleep;

use payment_types::{BrokerConnector, BrokerError};

/// Retry budget for establishing a broker connection.
///
/// # Default Values
///
/// - `max_attempts`: 10
/// - `backoff_step`: 5 seconds (the wait after attempt `n` is `n * backoff_step`)
#[derive(Debug, Clone)]
pub struct ConnectRetry {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_step: Duration::from_secs(5),
        }
    }
}

impl ConnectRetry {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// Connects through `connector`, retrying per `retry`.
///
/// Returns [`BrokerError::Connection`] carrying the last failure once every
/// attempt has failed.
pub async fn connect_with_retry<C: BrokerConnector>(
    connector: &C,
    retry: &ConnectRetry,
) -> Result<C::Broker, BrokerError> {
    let mut last_error = None;

    for attempt in 1..=retry.max_attempts {
        match connector.connect().await {
            Ok(broker) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Connected to broker after retry");
                }
                return Ok(broker);
            }
            Err(err) => {
                tracing::error!(
                    attempt,
                    max_attempts = retry.max_attempts,
                    error = %err,
                    "Connection to broker failed"
                );
                last_error = Some(err);

                if attempt < retry.max_attempts {
                    sleep(retry.delay_after(attempt)).await;
                }
            }
        }
    }

    Err(BrokerError::Connection(format!(
        "Failed to connect to broker after {} attempts: {}",
        retry.max_attempts,
        last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string())
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::InMemoryBroker;

    /// Refuses the first `failures` attempts, then hands out a broker.
    struct FlakyConnector {
        failures: u32,
        attempts: AtomicU32,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrokerConnector for FlakyConnector {
        type Broker = InMemoryBroker;

        async fn connect(&self) -> Result<InMemoryBroker, BrokerError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(BrokerError::Connection(format!("refused #{attempt}")));
            }
            Ok(InMemoryBroker::new())
        }
    }

    fn fast_retry() -> ConnectRetry {
        ConnectRetry {
            max_attempts: 10,
            backoff_step: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_default_budget() {
        let retry = ConnectRetry::default();
        assert_eq!(retry.max_attempts, 10);
        assert_eq!(retry.delay_after(1), Duration::from_secs(5));
        assert_eq!(retry.delay_after(3), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_connects_on_last_attempt() {
        let connector = FlakyConnector::new(9);

        let result = connect_with_retry(&connector, &fast_retry()).await;

        assert!(result.is_ok());
        assert_eq!(connector.attempts(), 10);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let connector = FlakyConnector::new(10);

        let result = connect_with_retry(&connector, &fast_retry()).await;

        assert!(
            matches!(result, Err(BrokerError::Connection(msg)) if msg.contains("10 attempts") && msg.contains("refused #10"))
        );
        assert_eq!(connector.attempts(), 10);
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_retry() {
        let connector = FlakyConnector::new(0);

        connect_with_retry(&connector, &fast_retry()).await.unwrap();

        assert_eq!(connector.attempts(), 1);
    }
}

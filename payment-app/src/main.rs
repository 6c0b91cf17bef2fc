//! # Payment Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Connect the Redis ledger store and the Kafka broker
//! - Start the saga consumer on `stock_subtracted`
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payment_broker::{ConnectRetry, EventBus, KafkaConnector};
use payment_hex::{CreditLedger, PaymentSaga, inbound::HttpServer};
use payment_store::RedisLedgerStore;

use config::{Config, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,payment_app=debug,payment_hex=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!("Starting payment server on port {}", config.port);
    tracing::info!(
        redis_host = %config.redis_host,
        redis_port = config.redis_port,
        redis_db = config.redis_db,
        broker = %config.broker_host,
        consumer_group = %config.consumer_group,
        "Connecting backends"
    );

    // The store must be reachable at startup; there is no retry.
    let store = RedisLedgerStore::connect(config.redis_endpoint().connection_info()).await?;
    let ledger = Arc::new(CreditLedger::new(store));

    let connector = KafkaConnector::new(&config.broker_host, &config.consumer_group);
    let bus = Arc::new(EventBus::connect(&connector, &ConnectRetry::default()).await?);

    let saga = PaymentSaga::new(ledger.clone(), bus);
    let consumer = tokio::spawn(async move {
        if let Err(err) = saga.run().await {
            tracing::error!(error = %err, "Payment consumer stopped");
        }
    });

    let server = HttpServer::new(ledger);
    let addr = format!("0.0.0.0:{}", config.port);
    let result = server.run(&addr).await;

    // Unsettled deliveries go back to the broker once the consumer is gone.
    consumer.abort();
    tracing::info!("Payment server stopped");
    result
}

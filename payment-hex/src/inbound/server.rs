//! HTTP Server configuration and startup.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use payment_types::LedgerStore;

use super::handlers::{self, AppState};
use crate::CreditLedger;

/// HTTP server for the ledger API.
pub struct HttpServer<S: LedgerStore> {
    state: Arc<AppState<S>>,
}

impl<S: LedgerStore> HttpServer<S> {
    /// Creates a server sharing `ledger` with the rest of the process.
    pub fn new(ledger: Arc<CreditLedger<S>>) -> Self {
        Self {
            state: Arc::new(AppState { ledger }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/create_user", post(handlers::create_user::<S>))
            .route("/all_users", get(handlers::all_users::<S>))
            .route(
                "/batch_init/{n}/{starting_money}",
                post(handlers::batch_init::<S>),
            )
            .route("/find_user/{user_id}", get(handlers::find_user::<S>))
            .route(
                "/add_funds/{user_id}/{amount}",
                post(handlers::add_funds::<S>),
            )
            .route("/pay/{user_id}/{amount}", post(handlers::pay::<S>))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server until Ctrl+C or SIGTERM, then drains connections.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        self.run_until(addr, shutdown_signal()).await
    }

    /// Runs the server until `shutdown` resolves, then drains connections.
    pub async fn run_until<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}

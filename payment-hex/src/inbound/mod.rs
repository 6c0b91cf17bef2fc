//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server exposing the credit ledger.

mod handlers;
mod server;

pub use handlers::ApiError;
pub use server::HttpServer;

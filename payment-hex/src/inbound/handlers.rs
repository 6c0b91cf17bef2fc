//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use payment_types::{
    AppError, BatchInitResponse, CreateUserResponse, LedgerError, LedgerStore, UserId,
};

use crate::CreditLedger;

/// Application state shared across handlers.
pub struct AppState<S: LedgerStore> {
    pub ledger: Arc<CreditLedger<S>>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Every ledger failure is reported to the caller as a bad request.
        let status = StatusCode::BAD_REQUEST;
        let message = match &self.0 {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::InsufficientFunds(msg)
            | AppError::Store(msg) => msg.clone(),
        };

        if matches!(self.0, AppError::Store(_)) {
            tracing::error!(error = %message, "Store failure while serving request");
        }

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

fn credit_updated(user_id: &UserId, credit: i64) -> String {
    format!("User: {user_id} credit updated to: {credit}")
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Create a user with zero credit.
#[tracing::instrument(skip(state))]
pub async fn create_user<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = state.ledger.create_account(0).await?;
    Ok(Json(CreateUserResponse { user_id }))
}

/// List every user.
#[tracing::instrument(skip(state))]
pub async fn all_users<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.ledger.list_accounts().await?;
    Ok(Json(accounts))
}

/// Create users `0..n` with the same starting credit.
#[tracing::instrument(skip(state))]
pub async fn batch_init<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((n, starting_money)): Path<(u64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.batch_init(n, starting_money).await?;
    Ok(Json(BatchInitResponse::success()))
}

#[tracing::instrument(skip(state))]
pub async fn find_user<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.ledger.get_account(&UserId::from(user_id)).await?;
    Ok(Json(account))
}

#[tracing::instrument(skip(state))]
pub async fn add_funds<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, amount)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from(user_id);
    let credit = state.ledger.credit(&user_id, amount).await?;
    Ok(credit_updated(&user_id, credit))
}

/// Debit a user directly, outside the saga.
#[tracing::instrument(skip(state))]
pub async fn pay<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, amount)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::from(user_id);
    let credit = state.ledger.debit(&user_id, amount).await?;
    Ok(credit_updated(&user_id, credit))
}

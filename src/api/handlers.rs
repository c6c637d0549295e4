//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AccountView, DepositRequest, ErrorResponse, LoanRequest, TransitionResponse, WithdrawRequest,
};
use super::AppState;
use crate::runtime::AccountError;
use crate::state_machine::{Currency, CurrencyError, Event, Outcome};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Account view
        .route("/api/account", get(get_account))
        .route("/api/account/stream", get(stream_account))
        // Transitions
        .route("/api/account/deposit", post(deposit))
        .route("/api/account/withdraw", post(withdraw))
        .route("/api/account/loan", post(request_loan))
        .route("/api/account/loan/pay", post(pay_loan))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Account View
// ============================================================

async fn get_account(State(state): State<AppState>) -> Json<AccountView> {
    Json(AccountView::of(&state.account))
}

async fn stream_account(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before taking the snapshot so no change slips between them
    let broadcast_rx = state.account.subscribe();
    sse_stream(&AccountView::of(&state.account), broadcast_rx)
}

// ============================================================
// Transitions
// ============================================================

async fn deposit(
    State(state): State<AppState>,
    payload: Result<Json<DepositRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let Json(req) = payload?;
    let account = &state.account;
    let currency = match req.currency.as_deref() {
        Some(code) => code.parse::<Currency>()?,
        None => account.context().base_currency.clone(),
    };

    if req.wait {
        let credited = account.deposit(req.amount, currency.code()).await?;
        return Ok(Json(
            TransitionResponse::new(Outcome::Applied, account).with_credited(credited),
        ));
    }

    let outcome = account.submit(Event::deposit(req.amount, currency)).await?;
    Ok(Json(TransitionResponse::new(outcome, account)))
}

async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let Json(req) = payload?;
    let outcome = state.account.withdraw(req.amount).await?;
    Ok(Json(TransitionResponse::new(outcome, &state.account)))
}

async fn request_loan(
    State(state): State<AppState>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let Json(req) = payload?;
    let outcome = state.account.request_loan(req.amount, req.purpose).await?;
    Ok(Json(TransitionResponse::new(outcome, &state.account)))
}

async fn pay_loan(State(state): State<AppState>) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = state.account.pay_loan().await?;
    Ok(Json(TransitionResponse::new(outcome, &state.account)))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Transition(_)
            | AccountError::Currency(_)
            | AccountError::InternalEvent { .. } => AppError::BadRequest(e.to_string()),
            AccountError::ConversionFailed { .. } => AppError::BadGateway(e.to_string()),
            AccountError::Closed => AppError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<CurrencyError> for AppError {
    fn from(e: CurrencyError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

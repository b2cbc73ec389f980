//! Payment route handlers: gateway checkout, cash confirmation, and the
//! webhook ingestion point.
//!
//! The webhook route has no caller extractor; its only authentication is
//! the HMAC over the raw body, checked inside the engine.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bookd_core::{BookingError, BookingId};
use bookd_engine::settlement::GatewayProof;
use bookd_engine::webhook::WebhookOutcome;
use serde::Deserialize;

use super::principal::Caller;
use super::state::AppState;
use super::{json_fail, json_ok};

/// Header carrying the gateway's signature over the raw webhook body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Deserialize)]
pub(crate) struct BookingRef {
    booking_id: BookingId,
}

/// POST /payments/gateway/create-order
pub(crate) async fn handle_gateway_create_order(
    State(state): State<AppState>,
    Caller(principal): Caller,
    axum::Json(body): axum::Json<BookingRef>,
) -> Response {
    match state
        .engine
        .create_gateway_order(principal, body.booking_id)
        .await
    {
        Ok(order) => json_ok(StatusCode::CREATED, "gateway order ready", order),
        Err(e) => json_fail(e),
    }
}

/// POST /payments/gateway/verify
pub(crate) async fn handle_gateway_verify(
    State(state): State<AppState>,
    Caller(principal): Caller,
    axum::Json(proof): axum::Json<GatewayProof>,
) -> Response {
    match state.engine.verify_gateway_payment(principal, proof).await {
        Ok(outcome) => json_ok(
            StatusCode::OK,
            "payment verified",
            serde_json::json!({ "outcome": outcome }),
        ),
        Err(e) => json_fail(e),
    }
}

/// POST /payments/cash/initiate
pub(crate) async fn handle_cash_initiate(
    State(state): State<AppState>,
    Caller(principal): Caller,
    axum::Json(body): axum::Json<BookingRef>,
) -> Response {
    match state.engine.initiate_cash(principal, body.booking_id).await {
        Ok(initiated) => json_ok(StatusCode::OK, "cash code dispatched", initiated),
        Err(e) => json_fail(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CashVerifyBody {
    booking_id: BookingId,
    otp: String,
}

/// POST /payments/cash/verify
pub(crate) async fn handle_cash_verify(
    State(state): State<AppState>,
    Caller(principal): Caller,
    axum::Json(body): axum::Json<CashVerifyBody>,
) -> Response {
    match state
        .engine
        .verify_cash_payment(principal, body.booking_id, &body.otp)
        .await
    {
        Ok(outcome) => json_ok(
            StatusCode::OK,
            "cash payment verified",
            serde_json::json!({ "outcome": outcome }),
        ),
        Err(e) => json_fail(e),
    }
}

/// POST /payments/webhook
///
/// Consumes the raw body so the signature covers exactly the bytes the
/// gateway sent. Every understood delivery answers 200 so the gateway
/// stops redelivering; only signature/payload failures and lost write
/// races return an error status.
pub(crate) async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw_body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return json_fail(BookingError::Validation {
            message: "missing webhook signature header".to_string(),
        });
    };

    match state.engine.handle_webhook(&raw_body, signature).await {
        Ok(WebhookOutcome::Applied) => json_ok(StatusCode::OK, "event applied", ()),
        Ok(WebhookOutcome::AlreadyApplied) => json_ok(StatusCode::OK, "event already applied", ()),
        Ok(WebhookOutcome::Ignored) => json_ok(StatusCode::OK, "event ignored", ()),
        Err(e) => json_fail(e),
    }
}

//! HTTP JSON API server for the bookd engine.
//!
//! Endpoints:
//! - GET   /health                              - server status (no auth)
//! - POST  /bookings                            - create a booking (customer)
//! - GET   /bookings                            - bookings visible to the caller
//! - GET   /bookings/{id}                       - one booking, scoped
//! - PATCH /bookings/{id}/status                - accept/decline/cancel
//! - PATCH /bookings/{id}/price                 - worker price edit
//! - POST  /bookings/{id}/initiate-service      - issue the service-start code
//! - POST  /bookings/{id}/verify-service-otp    - verify the service-start code
//! - POST  /bookings/{id}/complete-service      - ACCEPTED -> PAYMENT_PENDING
//! - POST  /bookings/{id}/review                - attach a customer review
//! - POST  /payments/gateway/create-order       - create a remote gateway order
//! - POST  /payments/gateway/verify             - verify the client payment proof
//! - POST  /payments/cash/initiate              - start the cash path
//! - POST  /payments/cash/verify                - confirm cash with the worker code
//! - POST  /payments/webhook                    - signed gateway events (no caller auth)
//!
//! Success responses are `{success: true, message, data}`; failures are
//! `{success: false, message}` with the status drawn from the domain error
//! class. The authenticated principal arrives in trusted headers
//! (`X-Principal-Id`, `X-Principal-Role`) supplied by the identity layer in
//! front of this service; the webhook route is exempt.

pub mod handlers;
pub mod payments;
pub mod principal;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use bookd_core::error::ErrorClass;
use bookd_core::BookingError;
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_attach_review, handle_complete_service, handle_create_booking, handle_get_booking,
    handle_health, handle_initiate_service, handle_list_bookings, handle_not_found,
    handle_update_price, handle_update_status, handle_verify_service_otp,
};
use self::payments::{
    handle_cash_initiate, handle_cash_verify, handle_gateway_create_order, handle_gateway_verify,
    handle_webhook,
};
use self::state::AppState;

/// Maximum request body size: 64 KB. Nothing on this surface is large.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Build the full router over shared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/bookings", post(handle_create_booking).get(handle_list_bookings))
        .route("/bookings/{id}", get(handle_get_booking))
        .route("/bookings/{id}/status", patch(handle_update_status))
        .route("/bookings/{id}/price", patch(handle_update_price))
        .route("/bookings/{id}/initiate-service", post(handle_initiate_service))
        .route("/bookings/{id}/verify-service-otp", post(handle_verify_service_otp))
        .route("/bookings/{id}/complete-service", post(handle_complete_service))
        .route("/bookings/{id}/review", post(handle_attach_review))
        .route("/payments/gateway/create-order", post(handle_gateway_create_order))
        .route("/payments/gateway/verify", post(handle_gateway_verify))
        .route("/payments/cash/initiate", post(handle_cash_initiate))
        .route("/payments/cash/verify", post(handle_cash_verify))
        .route("/payments/webhook", post(handle_webhook))
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Success envelope: `{success: true, message, data}`.
pub(crate) fn json_ok(
    status: StatusCode,
    message: &str,
    data: impl serde::Serialize,
) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": true,
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

/// Failure envelope: `{success: false, message}` with the status from the
/// domain error class. Internal errors are logged in full here and
/// sanitized before leaving the process.
pub(crate) fn json_fail(err: BookingError) -> Response {
    let status = match err.class() {
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Unauthorized => StatusCode::FORBIDDEN,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "internal error");
        "internal error".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(serde_json::json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}

//! Booking route handlers and the wire-facing booking view.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookd_core::{Booking, BookingStatus, Review, SettlementAttempt};
use bookd_engine::ledger::CreateBooking;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::principal::Caller;
use super::state::AppState;
use super::{json_fail, json_ok};

/// Booking as exposed on the wire.
///
/// One-time code values never leave the process; only their expiries do.
/// Everything else on the record is visible to both parties.
#[derive(Debug, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub worker_id: Uuid,
    pub worker_service_id: Uuid,
    pub service_id: Uuid,
    pub booking_date: Date,
    pub booking_time: String,
    pub price: Decimal,
    pub status: BookingStatus,
    pub service: ServiceView,
    pub payment: PaymentView,
    pub settlement_attempts: Vec<SettlementAttempt>,
    pub cancellation_reason: Option<String>,
    pub decline_reason: Option<String>,
    pub review: Option<Review>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ServiceView {
    pub initiated: bool,
    pub initiated_at: Option<OffsetDateTime>,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub otp_expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub amount: Decimal,
    pub status: bookd_core::PaymentStatus,
    pub payment_type: Option<bookd_core::PaymentType>,
    pub remote_order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub transaction_at: Option<OffsetDateTime>,
    pub otp_expires_at: Option<OffsetDateTime>,
}

impl From<&Booking> for BookingView {
    fn from(b: &Booking) -> Self {
        BookingView {
            id: b.id,
            customer_id: b.customer_id,
            worker_id: b.worker_id,
            worker_service_id: b.worker_service_id,
            service_id: b.service_id,
            booking_date: b.booking_date,
            booking_time: b.booking_time.clone(),
            price: b.price,
            status: b.status,
            service: ServiceView {
                initiated: b.service.initiated,
                initiated_at: b.service.initiated_at,
                started_at: b.service.started_at,
                completed_at: b.service.completed_at,
                otp_expires_at: b.service.challenge.as_ref().map(|c| c.expires_at),
            },
            payment: PaymentView {
                amount: b.payment.amount,
                status: b.payment.status,
                payment_type: b.payment.payment_type,
                remote_order_id: b.payment.remote_order_id.clone(),
                transaction_id: b.payment.transaction_id.clone(),
                transaction_at: b.payment.transaction_at,
                otp_expires_at: b.payment.challenge.as_ref().map(|c| c.expires_at),
            },
            settlement_attempts: b.settlement_attempts.clone(),
            cancellation_reason: b.cancellation_reason.clone(),
            decline_reason: b.decline_reason.clone(),
            review: b.review.clone(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({
            "success": false,
            "message": "not found",
        })),
    )
        .into_response()
}

/// GET /health
pub(crate) async fn handle_health() -> Response {
    json_ok(
        StatusCode::OK,
        "ok",
        serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }),
    )
}

/// POST /bookings
pub(crate) async fn handle_create_booking(
    State(state): State<AppState>,
    Caller(principal): Caller,
    axum::Json(body): axum::Json<CreateBooking>,
) -> Response {
    match state.engine.create_booking(principal, body).await {
        Ok(b) => json_ok(StatusCode::CREATED, "booking created", BookingView::from(&b)),
        Err(e) => json_fail(e),
    }
}

/// GET /bookings
pub(crate) async fn handle_list_bookings(
    State(state): State<AppState>,
    Caller(principal): Caller,
) -> Response {
    match state.engine.list_bookings(principal).await {
        Ok(bookings) => {
            let views: Vec<BookingView> = bookings.iter().map(BookingView::from).collect();
            json_ok(StatusCode::OK, "bookings", views)
        }
        Err(e) => json_fail(e),
    }
}

/// GET /bookings/{id}
pub(crate) async fn handle_get_booking(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Response {
    match state.engine.get_booking(principal, id).await {
        Ok(b) => json_ok(StatusCode::OK, "booking", BookingView::from(&b)),
        Err(e) => json_fail(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusBody {
    status: BookingStatus,
    #[serde(default)]
    reason: Option<String>,
}

/// PATCH /bookings/{id}/status
pub(crate) async fn handle_update_status(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<StatusBody>,
) -> Response {
    match state
        .engine
        .update_status(principal, id, body.status, body.reason)
        .await
    {
        Ok(b) => json_ok(StatusCode::OK, "status updated", BookingView::from(&b)),
        Err(e) => json_fail(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceBody {
    price: Decimal,
}

/// PATCH /bookings/{id}/price
pub(crate) async fn handle_update_price(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<PriceBody>,
) -> Response {
    match state.engine.edit_price(principal, id, body.price).await {
        Ok(b) => json_ok(StatusCode::OK, "price updated", BookingView::from(&b)),
        Err(e) => json_fail(e),
    }
}

/// POST /bookings/{id}/initiate-service
pub(crate) async fn handle_initiate_service(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Response {
    match state.engine.initiate_service(principal, id).await {
        Ok(initiated) => json_ok(StatusCode::OK, "service-start code dispatched", initiated),
        Err(e) => json_fail(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OtpBody {
    otp: String,
}

/// POST /bookings/{id}/verify-service-otp
pub(crate) async fn handle_verify_service_otp(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<OtpBody>,
) -> Response {
    match state
        .engine
        .verify_service_otp(principal, id, &body.otp)
        .await
    {
        Ok(outcome) => json_ok(
            StatusCode::OK,
            "service start verified",
            serde_json::json!({ "outcome": outcome }),
        ),
        Err(e) => json_fail(e),
    }
}

/// POST /bookings/{id}/complete-service
pub(crate) async fn handle_complete_service(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Response {
    match state.engine.complete_service(principal, id).await {
        Ok(b) => json_ok(StatusCode::OK, "service completed", BookingView::from(&b)),
        Err(e) => json_fail(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewBody {
    rating: u8,
    #[serde(default)]
    comment: Option<String>,
}

/// POST /bookings/{id}/review
pub(crate) async fn handle_attach_review(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<ReviewBody>,
) -> Response {
    match state
        .engine
        .attach_review(principal, id, body.rating, body.comment)
        .await
    {
        Ok(b) => json_ok(StatusCode::OK, "review recorded", BookingView::from(&b)),
        Err(e) => json_fail(e),
    }
}

//! The booking record and its nested sub-records.
//!
//! A booking is a single-writer-per-transition document: every mutation is a
//! wholesale replacement guarded by an optimistic version check in the store.
//! Nothing in this module performs I/O; constructors and predicates only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::otp::OtpChallenge;

/// Identifier for a booking record.
pub type BookingId = Uuid;

/// Lifecycle status of a booking.
///
/// DECLINED and CANCELLED are terminal. COMPLETED is terminal except for an
/// operator price edit, which reopens settlement (back to PAYMENT_PENDING).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
    PaymentPending,
    Completed,
}

impl BookingStatus {
    /// True while the booking occupies its worker/date/time slot.
    ///
    /// Only PENDING and ACCEPTED block other bookings from the same slot;
    /// everything downstream of acceptance has already consumed the slot.
    pub fn occupies_slot(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Accepted)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Declined => "DECLINED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::PaymentPending => "PAYMENT_PENDING",
            BookingStatus::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Settlement status of the payment sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Which settlement strategy is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Gateway,
    Cash,
}

/// Progress of the in-person service, nested inside ACCEPTED.
///
/// `challenge` is the service-start secret, replaced wholesale under the
/// booking's version check. It is cleared exactly once: on successful
/// verification. An expired challenge stays in place until re-initiation
/// replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceProgress {
    pub initiated: bool,
    pub initiated_at: Option<OffsetDateTime>,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub challenge: Option<OtpChallenge>,
}

/// The current payment sub-record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_type: Option<PaymentType>,
    /// Remote order identifier returned by the gateway at order creation.
    pub remote_order_id: Option<String>,
    /// Gateway payment/transaction reference recorded at settlement.
    pub transaction_id: Option<String>,
    pub transaction_at: Option<OffsetDateTime>,
    /// Cash settlement secret, delivered to the worker.
    pub challenge: Option<OtpChallenge>,
}

impl PaymentRecord {
    pub fn pending(amount: Decimal) -> Self {
        PaymentRecord {
            amount,
            status: PaymentStatus::Pending,
            payment_type: None,
            remote_order_id: None,
            transaction_id: None,
            transaction_at: None,
            challenge: None,
        }
    }
}

/// A superseded settlement, pushed onto the booking's history when an
/// authorized price edit reopens an already-settled payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementAttempt {
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_type: Option<PaymentType>,
    pub remote_order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub transaction_at: Option<OffsetDateTime>,
    /// When the attempt was superseded.
    pub superseded_at: OffsetDateTime,
}

/// Customer review, attachable at most once to a COMPLETED booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub rating: u8,
    pub comment: Option<String>,
    pub reviewed_at: OffsetDateTime,
}

/// The central booking entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub customer_id: Uuid,
    pub worker_id: Uuid,
    pub worker_service_id: Uuid,
    pub service_id: Uuid,
    pub booking_date: Date,
    /// Display slot label, e.g. "10:00 AM". Combined with `worker_id` and
    /// `booking_date` it forms the slot key.
    pub booking_time: String,
    pub price: Decimal,
    pub status: BookingStatus,
    pub service: ServiceProgress,
    pub payment: PaymentRecord,
    /// Append-only history of superseded settlements.
    pub settlement_attempts: Vec<SettlementAttempt>,
    pub cancellation_reason: Option<String>,
    pub decline_reason: Option<String>,
    pub review: Option<Review>,
    /// Optimistic concurrency version. Bumped by the store on every update.
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields required to create a new booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub worker_id: Uuid,
    pub worker_service_id: Uuid,
    pub service_id: Uuid,
    pub booking_date: Date,
    pub booking_time: String,
    pub price: Decimal,
}

impl Booking {
    /// Construct a fresh PENDING booking at version 0.
    pub fn create(new: NewBooking, now: OffsetDateTime) -> Self {
        Booking {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            worker_id: new.worker_id,
            worker_service_id: new.worker_service_id,
            service_id: new.service_id,
            booking_date: new.booking_date,
            booking_time: new.booking_time,
            price: new.price,
            status: BookingStatus::Pending,
            service: ServiceProgress::default(),
            payment: PaymentRecord::pending(new.price),
            settlement_attempts: Vec::new(),
            cancellation_reason: None,
            decline_reason: None,
            review: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once both the payment and the booking reflect a settled outcome.
    pub fn is_settled(&self) -> bool {
        self.status == BookingStatus::Completed && self.payment.status == PaymentStatus::Completed
    }

    /// The slot key this booking occupies (or occupied).
    pub fn slot_key(&self) -> (Uuid, Date, &str) {
        (self.worker_id, self.booking_date, self.booking_time.as_str())
    }
}

//! Domain error taxonomy.
//!
//! Every failure a handler can surface maps to one of five classes:
//! Validation (400), NotFound (404), Unauthorized (403), Conflict (409),
//! Internal (500). The HTTP mapping lives in the server; everything else
//! works with these variants.

use time::Date;
use uuid::Uuid;

use crate::booking::{BookingId, BookingStatus};
use crate::transition::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    /// Missing or malformed fields or identifiers.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Booking absent, or not visible to the caller's scope.
    #[error("booking not found: {booking_id}")]
    NotFound { booking_id: BookingId },

    /// The caller's role cannot perform the requested transition.
    #[error("role {role} may not perform {action}")]
    Unauthorized { role: Role, action: String },

    /// Another non-terminal booking already occupies the slot.
    #[error("slot already booked: worker {worker_id} at {booking_date} {booking_time}")]
    SlotTaken {
        worker_id: Uuid,
        booking_date: Date,
        booking_time: String,
    },

    /// The lifecycle graph has no such edge.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// Completion requires a verified service start.
    #[error("service has not been started")]
    ServiceNotStarted,

    /// Service-start operation on a booking that is not ACCEPTED.
    #[error("booking is not accepted (status {status})")]
    NotAccepted { status: BookingStatus },

    /// Service start already verified; initiation is no longer meaningful.
    #[error("service has already been started")]
    ServiceAlreadyStarted,

    /// A live challenge already exists; re-initiation is only for expired codes.
    #[error("a one-time code is still active")]
    OtpStillLive,

    /// Verification attempted with no challenge on record.
    #[error("no one-time code has been issued")]
    OtpNotIssued,

    /// Submitted code does not match the stored challenge.
    #[error("one-time code does not match")]
    InvalidOtp,

    /// The stored challenge's TTL has elapsed. Recovery is re-initiation.
    #[error("one-time code has expired")]
    ExpiredOtp,

    /// Client-submitted gateway signature failed verification.
    #[error("payment signature verification failed")]
    SignatureMismatch,

    /// Settlement operation attempted while the booking is not awaiting payment.
    #[error("booking is not awaiting payment (status {status})")]
    PaymentNotOpen { status: BookingStatus },

    /// Gateway verification attempted before an order was created.
    #[error("no gateway order has been created for this booking")]
    OrderNotCreated,

    /// No booking holds the submitted remote order id.
    #[error("unknown gateway order: {order_id}")]
    OrderUnknown { order_id: String },

    /// Review attempted on a booking that is not COMPLETED.
    #[error("booking is not completed (status {status})")]
    NotCompleted { status: BookingStatus },

    /// A review is already attached.
    #[error("booking has already been reviewed")]
    AlreadyReviewed,

    /// A concurrent writer won the version race; the caller may retry.
    #[error("booking was modified concurrently")]
    Concurrency,

    /// Unexpected failure; logged with full context, sanitized at the edge.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Coarse classification used for the HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Unauthorized,
    Conflict,
    Internal,
}

impl BookingError {
    pub fn class(&self) -> ErrorClass {
        use BookingError::*;
        match self {
            Validation { .. } => ErrorClass::Validation,
            NotFound { .. } | OrderUnknown { .. } => ErrorClass::NotFound,
            Unauthorized { .. } => ErrorClass::Unauthorized,
            SlotTaken { .. }
            | InvalidTransition { .. }
            | ServiceNotStarted
            | NotAccepted { .. }
            | ServiceAlreadyStarted
            | OtpStillLive
            | OtpNotIssued
            | InvalidOtp
            | ExpiredOtp
            | SignatureMismatch
            | PaymentNotOpen { .. }
            | OrderNotCreated
            | NotCompleted { .. }
            | AlreadyReviewed
            | Concurrency => ErrorClass::Conflict,
            Internal { .. } => ErrorClass::Internal,
        }
    }
}

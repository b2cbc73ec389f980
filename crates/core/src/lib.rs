//! Core domain model for the bookd booking and settlement engine.
//!
//! This crate is pure domain logic with no I/O:
//! - the booking record and its nested service/payment sub-records
//! - the status transition table with per-edge role requirements
//! - one-time code (OTP) challenges with TTL semantics
//! - the shared HMAC signature primitive used by both gateway
//!   verification and webhook verification
//! - the domain error taxonomy

pub mod booking;
pub mod error;
pub mod otp;
pub mod signature;
pub mod transition;

pub use booking::{
    Booking, BookingId, BookingStatus, NewBooking, PaymentRecord, PaymentStatus, PaymentType,
    Review, ServiceProgress, SettlementAttempt,
};
pub use error::BookingError;
pub use otp::{OtpChallenge, OtpPurpose};
pub use transition::{Principal, Role};

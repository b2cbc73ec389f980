//! Service-start authenticator: a state machine local to one booking,
//! nested inside ACCEPTED.
//!
//! The worker initiates, which issues a short-lived 6-digit code delivered
//! out of band to the customer; the worker then submits the code the
//! customer reads back, proving the customer authorized work to begin.

use bookd_core::{Booking, BookingError, BookingId, OtpChallenge, OtpPurpose, Principal, Role};
use serde::Serialize;
use time::OffsetDateTime;

use crate::require_party;
use crate::Engine;

/// Outcome of initiating the service-start handshake.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInitiated {
    pub booking_id: BookingId,
    pub expires_at: OffsetDateTime,
}

/// Outcome of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStartOutcome {
    /// The code matched; serviceStartedAt is now set.
    Started,
    /// The service was already started; this submission applied nothing.
    AlreadyStarted,
}

impl Engine {
    /// Issue (or re-issue after expiry) the service-start code.
    ///
    /// Re-initiation after expiry is idempotent recovery, not an error; a
    /// still-live challenge is a Conflict so a pending code cannot be
    /// silently rotated away from the customer.
    pub async fn initiate_service(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<ServiceInitiated, BookingError> {
        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Worker, "initiate service")?;
        ensure_accepted(&booking)?;
        if booking.service.started_at.is_some() {
            return Err(BookingError::ServiceAlreadyStarted);
        }

        let now = OffsetDateTime::now_utc();
        if let Some(challenge) = &booking.service.challenge {
            if !challenge.is_expired(now) {
                return Err(BookingError::OtpStillLive);
            }
        }

        let challenge = OtpChallenge::issue(OtpPurpose::ServiceStart, now);
        let code = challenge.code.clone();
        let expires_at = challenge.expires_at;
        booking.service.initiated = true;
        booking.service.initiated_at = Some(now);
        booking.service.challenge = Some(challenge);

        let customer_id = booking.customer_id;
        self.store.update(booking.version, booking).await?;
        tracing::info!(%booking_id, "service start initiated");

        self.dispatch_code(customer_id, &code, OtpPurpose::ServiceStart)
            .await;

        Ok(ServiceInitiated {
            booking_id,
            expires_at,
        })
    }

    /// Verify the service-start code submitted by the worker.
    ///
    /// On match the challenge is cleared exactly once and serviceStartedAt
    /// is recorded; a repeat submission after success is an idempotent
    /// no-op. A mismatch or an expired code leaves state unchanged.
    pub async fn verify_service_otp(
        &self,
        principal: Principal,
        booking_id: BookingId,
        submitted: &str,
    ) -> Result<ServiceStartOutcome, BookingError> {
        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Worker, "verify service code")?;

        if booking.service.started_at.is_some() {
            return Ok(ServiceStartOutcome::AlreadyStarted);
        }
        ensure_accepted(&booking)?;

        let challenge = booking
            .service
            .challenge
            .as_ref()
            .ok_or(BookingError::OtpNotIssued)?;

        let now = OffsetDateTime::now_utc();
        if challenge.is_expired(now) {
            return Err(BookingError::ExpiredOtp);
        }
        if challenge.code != submitted {
            return Err(BookingError::InvalidOtp);
        }

        booking.service.challenge = None;
        booking.service.started_at = Some(now);

        self.store.update(booking.version, booking).await?;
        tracing::info!(%booking_id, "service started");
        Ok(ServiceStartOutcome::Started)
    }
}

fn ensure_accepted(booking: &Booking) -> Result<(), BookingError> {
    if booking.status != bookd_core::BookingStatus::Accepted {
        return Err(BookingError::NotAccepted {
            status: booking.status,
        });
    }
    Ok(())
}

//! The bookd transaction engine.
//!
//! One [`Engine`] instance coordinates the whole booking lifecycle over a
//! [`BookingStore`] backend and three external collaborators (payment
//! gateway, notification sender, worker service catalog). Handlers are
//! short, synchronous request/response operations; correctness under
//! concurrency rests on the store's insert-time slot guard and its
//! version-guarded conditional updates, never on in-process locks.
//!
//! Modules by responsibility:
//! - [`ledger`] — creation, worker decision, cancellation, completion,
//!   price edits, reviews, reads
//! - [`service_start`] — the customer-consent OTP nested inside ACCEPTED
//! - [`settlement`] — the gateway and cash strategies converging on COMPLETED
//! - [`webhook`] — idempotent reconciliation of the gateway event stream
//! - [`external`] — collaborator traits and development stand-ins

pub mod external;
pub mod ledger;
pub mod service_start;
pub mod settlement;
pub mod webhook;

use std::sync::Arc;

use bookd_core::{Booking, BookingError, BookingId, Principal, Role};
use bookd_storage::BookingStore;

use crate::external::{Notifier, PaymentGateway, ServiceCatalog};

/// Retry budget for writes racing another settlement writer. Each retry
/// re-reads and re-checks whether the intended outcome already applied.
pub(crate) const MAX_OCC_RETRIES: usize = 3;

/// Secrets and fixed parameters the engine needs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Secret for client-submitted gateway signature verification.
    pub gateway_secret: String,
    /// Distinct secret for webhook payload verification.
    pub webhook_secret: String,
    /// Currency code passed to the gateway at order creation.
    pub currency: String,
}

/// The booking/settlement transaction engine.
pub struct Engine {
    pub(crate) store: Arc<dyn BookingStore>,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) catalog: Arc<dyn ServiceCatalog>,
    pub(crate) config: EngineConfig,
}

impl Engine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        catalog: Arc<dyn ServiceCatalog>,
        config: EngineConfig,
    ) -> Self {
        Engine {
            store,
            gateway,
            notifier,
            catalog,
            config,
        }
    }

    /// Fetch a booking and enforce caller scope: a booking is visible only
    /// to its customer and its worker. Out-of-scope lookups are NotFound,
    /// not Unauthorized, so existence is not leaked.
    pub(crate) async fn fetch_scoped(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        let booking = self.store.get(booking_id).await?;
        if booking.customer_id != principal.id && booking.worker_id != principal.id {
            return Err(BookingError::NotFound { booking_id });
        }
        Ok(booking)
    }

    /// Dispatch a one-time code out of band. Fire-and-forget: delivery
    /// failure is logged and never aborts the transition that produced the
    /// code.
    pub(crate) async fn dispatch_code(
        &self,
        recipient: uuid::Uuid,
        code: &str,
        purpose: bookd_core::OtpPurpose,
    ) {
        if let Err(e) = self.notifier.send_code(recipient, code, purpose).await {
            tracing::warn!(%recipient, ?purpose, error = %e, "code delivery failed");
        }
    }
}

/// Require the caller to be the booking's party for `required` role: the
/// booking's worker acting as worker, or its customer acting as customer.
///
/// Role mismatch is Unauthorized; the right role on somebody else's booking
/// is NotFound (same scope rule as `fetch_scoped`, re-checked on the party
/// side).
pub(crate) fn require_party(
    principal: Principal,
    booking: &Booking,
    required: Role,
    action: &str,
) -> Result<(), BookingError> {
    if principal.role != required {
        return Err(BookingError::Unauthorized {
            role: principal.role,
            action: action.to_string(),
        });
    }
    let party = match required {
        Role::Worker => booking.worker_id,
        Role::Customer => booking.customer_id,
    };
    if principal.id != party {
        return Err(BookingError::NotFound {
            booking_id: booking.id,
        });
    }
    Ok(())
}

//! Booking ledger: creation, worker decision, cancellation, completion,
//! price edits, reviews, and scoped reads.
//!
//! Every mutation follows the same discipline: read the current record,
//! validate all preconditions (transition table first, then edge-specific
//! guards), then apply exactly one version-guarded store update. A rejected
//! call leaves no observable side effects.

use bookd_core::{
    Booking, BookingError, BookingId, BookingStatus, NewBooking, PaymentRecord, Principal, Review,
    Role, SettlementAttempt,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::require_party;
use crate::Engine;

/// Client request to create a booking. Price is never client-supplied; it
/// comes from the worker service catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBooking {
    pub worker_id: Uuid,
    pub worker_service_id: Uuid,
    pub booking_date: Date,
    pub booking_time: String,
}

impl Engine {
    /// Create a new PENDING booking for the calling customer.
    ///
    /// The slot guard runs inside the store's insert, so two concurrent
    /// creates for the same (worker, date, time) cannot both succeed.
    pub async fn create_booking(
        &self,
        principal: Principal,
        request: CreateBooking,
    ) -> Result<Booking, BookingError> {
        if principal.role != Role::Customer {
            return Err(BookingError::Unauthorized {
                role: principal.role,
                action: "create booking".to_string(),
            });
        }
        if request.booking_time.trim().is_empty() {
            return Err(BookingError::Validation {
                message: "booking_time must not be empty".to_string(),
            });
        }

        let quote = self
            .catalog
            .quote(request.worker_id, request.worker_service_id)
            .await
            .map_err(|e| BookingError::Internal {
                message: format!("service catalog unavailable: {e}"),
            })?
            .ok_or_else(|| BookingError::Validation {
                message: format!("unknown worker service: {}", request.worker_service_id),
            })?;

        let booking = Booking::create(
            NewBooking {
                customer_id: principal.id,
                worker_id: request.worker_id,
                worker_service_id: request.worker_service_id,
                service_id: quote.service_id,
                booking_date: request.booking_date,
                booking_time: request.booking_time,
                price: quote.price,
            },
            OffsetDateTime::now_utc(),
        );

        self.store.insert(booking.clone()).await?;
        tracing::info!(booking_id = %booking.id, worker_id = %booking.worker_id, "booking created");
        Ok(booking)
    }

    /// Drive a status transition requested through the status endpoint:
    /// worker accept/decline, customer cancel. `reason` lands in the
    /// decline or cancellation field depending on the target status.
    pub async fn update_status(
        &self,
        principal: Principal,
        booking_id: BookingId,
        target: BookingStatus,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        if !matches!(
            target,
            BookingStatus::Accepted | BookingStatus::Declined | BookingStatus::Cancelled
        ) {
            return Err(BookingError::Validation {
                message: format!(
                    "status endpoint accepts ACCEPTED, DECLINED or CANCELLED, got {target}"
                ),
            });
        }

        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        bookd_core::transition::authorize(booking.status, target, principal.role)?;
        if let Some(required) = bookd_core::transition::edge(booking.status, target)
            .and_then(|t| t.required_role)
        {
            require_party(principal, &booking, required, "update status")?;
        }

        let from = booking.status;
        booking.status = target;
        match target {
            BookingStatus::Declined => booking.decline_reason = reason,
            BookingStatus::Cancelled => booking.cancellation_reason = reason,
            _ => {}
        }

        let stored = self.store.update(booking.version, booking).await?;
        tracing::info!(booking_id = %booking_id, %from, to = %target, "status transition");
        Ok(stored)
    }

    /// Worker-triggered service completion: ACCEPTED -> PAYMENT_PENDING.
    /// Requires a verified service start.
    pub async fn complete_service(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Worker, "complete service")?;
        bookd_core::transition::authorize(
            booking.status,
            BookingStatus::PaymentPending,
            principal.role,
        )?;
        if booking.service.started_at.is_none() {
            return Err(BookingError::ServiceNotStarted);
        }

        booking.status = BookingStatus::PaymentPending;
        booking.service.completed_at = Some(OffsetDateTime::now_utc());

        let stored = self.store.update(booking.version, booking).await?;
        tracing::info!(booking_id = %booking_id, "service completed, awaiting payment");
        Ok(stored)
    }

    /// Worker price edit.
    ///
    /// On a booking that is already settled this reopens settlement: the
    /// superseded payment is pushed onto the attempt history and both the
    /// payment and the booking revert to PENDING/PAYMENT_PENDING in the
    /// same atomic write, never independently.
    pub async fn edit_price(
        &self,
        principal: Principal,
        booking_id: BookingId,
        new_price: Decimal,
    ) -> Result<Booking, BookingError> {
        if new_price <= Decimal::ZERO {
            return Err(BookingError::Validation {
                message: "price must be positive".to_string(),
            });
        }

        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Worker, "edit price")?;

        match booking.status {
            BookingStatus::Declined | BookingStatus::Cancelled => {
                return Err(BookingError::InvalidTransition {
                    from: booking.status,
                    to: booking.status,
                });
            }
            BookingStatus::Completed => {
                // Intentional regression, not an error: settlement must run
                // again at the new price.
                let superseded = &booking.payment;
                booking.settlement_attempts.push(SettlementAttempt {
                    amount: superseded.amount,
                    status: superseded.status,
                    payment_type: superseded.payment_type,
                    remote_order_id: superseded.remote_order_id.clone(),
                    transaction_id: superseded.transaction_id.clone(),
                    transaction_at: superseded.transaction_at,
                    superseded_at: OffsetDateTime::now_utc(),
                });
                booking.payment = PaymentRecord::pending(new_price);
                booking.status = BookingStatus::PaymentPending;
                tracing::info!(booking_id = %booking_id, "price edit reopened settlement");
            }
            BookingStatus::Pending | BookingStatus::Accepted | BookingStatus::PaymentPending => {
                booking.payment.amount = new_price;
            }
        }

        booking.price = new_price;
        Ok(self.store.update(booking.version, booking).await?)
    }

    /// Attach a customer review to a COMPLETED booking, at most once.
    pub async fn attach_review(
        &self,
        principal: Principal,
        booking_id: BookingId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Booking, BookingError> {
        if !(1..=5).contains(&rating) {
            return Err(BookingError::Validation {
                message: "rating must be between 1 and 5".to_string(),
            });
        }

        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Customer, "attach review")?;

        if booking.status != BookingStatus::Completed {
            return Err(BookingError::NotCompleted {
                status: booking.status,
            });
        }
        if booking.review.is_some() {
            return Err(BookingError::AlreadyReviewed);
        }

        booking.review = Some(Review {
            rating,
            comment,
            reviewed_at: OffsetDateTime::now_utc(),
        });

        Ok(self.store.update(booking.version, booking).await?)
    }

    /// Read a booking visible to the caller.
    pub async fn get_booking(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        self.fetch_scoped(principal, booking_id).await
    }

    /// All bookings where the caller is the customer or the worker.
    pub async fn list_bookings(&self, principal: Principal) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_for_principal(principal.id).await?)
    }
}

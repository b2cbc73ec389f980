//! Payment settlement coordinator: two independent strategies converging on
//! one outcome (payment COMPLETED, booking COMPLETED).
//!
//! The gateway path races the webhook reconciler toward the same terminal
//! state; whichever writer commits first wins and the loser's attempt is a
//! verified no-op. All settlement writes mark both the payment and the
//! booking in a single version-guarded update.

use bookd_core::{
    signature, Booking, BookingError, BookingId, BookingStatus, OtpChallenge, OtpPurpose,
    PaymentStatus, PaymentType, Principal, Role,
};
use bookd_storage::StorageError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::require_party;
use crate::{Engine, MAX_OCC_RETRIES};

/// A gateway order ready for client-side checkout.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrder {
    pub booking_id: BookingId,
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
}

/// The client-submitted proof of a gateway payment.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayProof {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Outcome of initiating the cash path.
#[derive(Debug, Clone, Serialize)]
pub struct CashInitiated {
    pub booking_id: BookingId,
    pub expires_at: OffsetDateTime,
}

/// Outcome of a settlement confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementOutcome {
    /// Payment and booking marked COMPLETED by this call.
    Settled,
    /// Settlement had already been applied; nothing changed.
    AlreadySettled,
}

impl Engine {
    /// Create (or return the existing) remote gateway order for a booking
    /// awaiting payment.
    pub async fn create_gateway_order(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<GatewayOrder, BookingError> {
        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Customer, "create gateway order")?;
        ensure_awaiting_payment(&booking)?;

        // Retried create-order calls reuse the already-stored order.
        if let Some(order_id) = booking.payment.remote_order_id.clone() {
            return Ok(GatewayOrder {
                booking_id,
                order_id,
                amount: booking.payment.amount,
                currency: self.config.currency.clone(),
            });
        }

        let request = crate::external::OrderRequest {
            amount: booking.payment.amount,
            currency: self.config.currency.clone(),
            receipt: booking.id.to_string(),
        };
        let order_id =
            self.gateway
                .create_order(&request)
                .await
                .map_err(|e| BookingError::Internal {
                    message: format!("gateway order creation failed: {e}"),
                })?;

        booking.payment.payment_type = Some(PaymentType::Gateway);
        booking.payment.remote_order_id = Some(order_id.clone());
        let amount = booking.payment.amount;
        self.store.update(booking.version, booking).await?;
        tracing::info!(%booking_id, %order_id, "gateway order created");

        Ok(GatewayOrder {
            booking_id,
            order_id,
            amount,
            currency: self.config.currency.clone(),
        })
    }

    /// Verify a client-submitted gateway payment proof.
    ///
    /// Recomputes HMAC("order_id|payment_id") under the gateway secret and
    /// requires an exact match before anything is written; a mismatch fails
    /// closed with no state change. The success write races the webhook
    /// reconciler, so a lost version race re-reads and degrades to an
    /// idempotent no-op when the same settlement already landed.
    pub async fn verify_gateway_payment(
        &self,
        principal: Principal,
        proof: GatewayProof,
    ) -> Result<SettlementOutcome, BookingError> {
        let booking = self
            .store
            .find_by_remote_order(&proof.order_id)
            .await?
            .ok_or_else(|| BookingError::OrderUnknown {
                order_id: proof.order_id.clone(),
            })?;
        require_party(principal, &booking, Role::Customer, "verify gateway payment")?;

        let payload = signature::gateway_payload(&proof.order_id, &proof.payment_id);
        if !signature::verify(
            self.config.gateway_secret.as_bytes(),
            payload.as_bytes(),
            &proof.signature,
        ) {
            return Err(BookingError::SignatureMismatch);
        }

        let mut current = booking;
        for _ in 0..MAX_OCC_RETRIES {
            if settlement_already_applied(&current, &proof.payment_id) {
                return Ok(SettlementOutcome::AlreadySettled);
            }
            ensure_awaiting_payment(&current)?;

            let mut updated = current.clone();
            apply_settlement(
                &mut updated,
                PaymentType::Gateway,
                Some(proof.payment_id.clone()),
            );
            match self.store.update(updated.version, updated).await {
                Ok(_) => {
                    tracing::info!(booking_id = %current.id, order_id = %proof.order_id,
                        "gateway payment verified");
                    return Ok(SettlementOutcome::Settled);
                }
                Err(StorageError::ConcurrentConflict { .. }) => {
                    current = self.store.get(current.id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Concurrency)
    }

    /// Start the cash path: issue a 30-minute code delivered to the
    /// *worker*, so the customer cannot self-certify a cash payment.
    pub async fn initiate_cash(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<CashInitiated, BookingError> {
        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Customer, "initiate cash payment")?;
        ensure_awaiting_payment(&booking)?;

        let now = OffsetDateTime::now_utc();
        if let Some(challenge) = &booking.payment.challenge {
            if !challenge.is_expired(now) {
                return Err(BookingError::OtpStillLive);
            }
        }

        let challenge = OtpChallenge::issue(OtpPurpose::CashSettlement, now);
        let code = challenge.code.clone();
        let expires_at = challenge.expires_at;
        booking.payment.payment_type = Some(PaymentType::Cash);
        booking.payment.challenge = Some(challenge);

        let worker_id = booking.worker_id;
        self.store.update(booking.version, booking).await?;
        tracing::info!(%booking_id, "cash settlement initiated");

        self.dispatch_code(worker_id, &code, OtpPurpose::CashSettlement)
            .await;

        Ok(CashInitiated {
            booking_id,
            expires_at,
        })
    }

    /// Confirm a cash payment with the code the worker read out.
    ///
    /// A correct, unexpired code marks the payment and the booking
    /// COMPLETED in one atomic update. Resubmission after success is an
    /// idempotent no-op.
    pub async fn verify_cash_payment(
        &self,
        principal: Principal,
        booking_id: BookingId,
        submitted: &str,
    ) -> Result<SettlementOutcome, BookingError> {
        let mut booking = self.fetch_scoped(principal, booking_id).await?;
        require_party(principal, &booking, Role::Customer, "verify cash payment")?;

        if booking.is_settled() && booking.payment.payment_type == Some(PaymentType::Cash) {
            return Ok(SettlementOutcome::AlreadySettled);
        }
        ensure_awaiting_payment(&booking)?;

        let challenge = booking
            .payment
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

        booking.payment.challenge = None;
        apply_settlement(&mut booking, PaymentType::Cash, None);
        self.store.update(booking.version, booking).await?;
        tracing::info!(%booking_id, "cash payment confirmed");
        Ok(SettlementOutcome::Settled)
    }
}

/// Mark payment and booking COMPLETED together in the given record.
pub(crate) fn apply_settlement(
    booking: &mut Booking,
    payment_type: PaymentType,
    transaction_id: Option<String>,
) {
    booking.payment.status = PaymentStatus::Completed;
    booking.payment.payment_type = Some(payment_type);
    booking.payment.transaction_id = transaction_id;
    booking.payment.transaction_at = Some(OffsetDateTime::now_utc());
    booking.status = BookingStatus::Completed;
}

/// True when the exact settlement described by `payment_id` is already
/// reflected in the record, making a repeat write a no-op.
fn settlement_already_applied(booking: &Booking, payment_id: &str) -> bool {
    booking.is_settled() && booking.payment.transaction_id.as_deref() == Some(payment_id)
}

fn ensure_awaiting_payment(booking: &Booking) -> Result<(), BookingError> {
    if booking.status != BookingStatus::PaymentPending {
        return Err(BookingError::PaymentNotOpen {
            status: booking.status,
        });
    }
    Ok(())
}

//! Webhook reconciler: applies the gateway's asynchronous, authoritative
//! event stream to booking state, idempotently and independently of any
//! client-initiated confirmation.
//!
//! Unmatched order ids and already-applied events are logged and dropped —
//! the gateway retries on non-2xx, so only a bad signature or an unreadable
//! payload is surfaced as an error.

use bookd_core::{signature, BookingError, BookingStatus, PaymentStatus, PaymentType};
use bookd_storage::StorageError;
use serde::Deserialize;

use crate::settlement::apply_settlement;
use crate::{Engine, MAX_OCC_RETRIES};

/// The gateway event payload, parsed from the raw webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub order_id: String,
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// Payment outcomes the reconciler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventOutcome {
    Captured,
    Failed,
}

/// What the reconciler did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event's outcome was written to the booking.
    Applied,
    /// The booking already reflected this outcome; silent no-op.
    AlreadyApplied,
    /// Unknown order id or irrelevant event type; logged and dropped.
    Ignored,
}

impl Engine {
    /// Verify and apply one webhook delivery.
    ///
    /// The signature is computed over the raw body bytes under the webhook
    /// secret — a distinct secret from client verification. Signature or
    /// payload failures are Validation errors (the gateway will retry);
    /// every other path returns Ok so the gateway stops redelivering.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        provided_signature: &str,
    ) -> Result<WebhookOutcome, BookingError> {
        if !signature::verify(
            self.config.webhook_secret.as_bytes(),
            raw_body,
            provided_signature,
        ) {
            return Err(BookingError::Validation {
                message: "webhook signature verification failed".to_string(),
            });
        }

        let event: GatewayEvent =
            serde_json::from_slice(raw_body).map_err(|e| BookingError::Validation {
                message: format!("unreadable webhook payload: {e}"),
            })?;

        let outcome = match event.event.as_str() {
            "payment.captured" => EventOutcome::Captured,
            "payment.failed" => EventOutcome::Failed,
            other => {
                tracing::info!(event = %other, order_id = %event.order_id,
                    "ignoring unhandled webhook event type");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let Some(booking) = self.store.find_by_remote_order(&event.order_id).await? else {
            tracing::warn!(order_id = %event.order_id, "webhook for unknown order id, dropping");
            return Ok(WebhookOutcome::Ignored);
        };

        let mut current = booking;
        for _ in 0..MAX_OCC_RETRIES {
            // Redeliveries and races degrade to no-ops before any write.
            match outcome {
                EventOutcome::Captured => {
                    if current.is_settled() {
                        tracing::info!(booking_id = %current.id, order_id = %event.order_id,
                            "capture already reflected, dropping redelivery");
                        return Ok(WebhookOutcome::AlreadyApplied);
                    }
                    if current.status != BookingStatus::PaymentPending {
                        tracing::warn!(booking_id = %current.id, status = %current.status,
                            "capture event for booking not awaiting payment, dropping");
                        return Ok(WebhookOutcome::Ignored);
                    }
                }
                EventOutcome::Failed => {
                    if current.payment.status == PaymentStatus::Failed {
                        return Ok(WebhookOutcome::AlreadyApplied);
                    }
                    if current.is_settled() {
                        // The client-verified settlement won the race; the
                        // failure event is stale.
                        tracing::warn!(booking_id = %current.id, order_id = %event.order_id,
                            "failure event for settled booking, dropping");
                        return Ok(WebhookOutcome::Ignored);
                    }
                }
            }

            let mut updated = current.clone();
            match outcome {
                EventOutcome::Captured => {
                    apply_settlement(&mut updated, PaymentType::Gateway, event.payment_id.clone());
                }
                EventOutcome::Failed => {
                    updated.payment.status = PaymentStatus::Failed;
                }
            }

            match self.store.update(updated.version, updated).await {
                Ok(_) => {
                    tracing::info!(booking_id = %current.id, order_id = %event.order_id,
                        event = %event.event, "webhook event applied");
                    return Ok(WebhookOutcome::Applied);
                }
                Err(StorageError::ConcurrentConflict { .. }) => {
                    current = self.store.get(current.id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Persistent contention: fail non-2xx and let the gateway redeliver.
        Err(BookingError::Concurrency)
    }
}

//! External collaborator traits and development stand-ins.
//!
//! The engine consumes three collaborators by contract only: the payment
//! gateway (order creation), the notification sender (out-of-band code
//! delivery, fire-and-forget), and the worker service catalog (price at
//! creation time). Real integrations implement these traits; the types
//! here are enough to run the engine locally and in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bookd_core::OtpPurpose;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Failure of an external collaborator call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExternalError {
    #[error("collaborator not configured: {0}")]
    NotConfigured(&'static str),
    #[error("collaborator failure: {0}")]
    Failed(String),
}

/// An order-creation request sent to the payment gateway.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub amount: Decimal,
    pub currency: String,
    /// Merchant-side reference; bookd uses the booking id.
    pub receipt: String,
}

/// Payment gateway contract: order creation only. Signature verification is
/// computed locally (core::signature) rather than delegated to a gateway SDK.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote order and return its remote order id.
    async fn create_order(&self, request: &OrderRequest) -> Result<String, ExternalError>;
}

/// Notification sender contract. Failures are logged by the caller and never
/// abort the state transition that triggered the notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a one-time code to the given user out of band.
    async fn send_code(
        &self,
        recipient: Uuid,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), ExternalError>;
}

/// A priced service offering resolved from the worker catalog.
#[derive(Debug, Clone)]
pub struct ServiceQuote {
    pub service_id: Uuid,
    pub price: Decimal,
}

/// Read-only worker service catalog, consulted at booking creation only.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Quote for a worker's service offering. `None` if the offering is unknown.
    async fn quote(
        &self,
        worker_id: Uuid,
        worker_service_id: Uuid,
    ) -> Result<Option<ServiceQuote>, ExternalError>;
}

// ──────────────────────────────────────────────
// Development stand-ins
// ──────────────────────────────────────────────

/// Gateway stand-in that mints order ids locally. A production deployment
/// replaces this with a real gateway client behind the same trait.
#[derive(Default)]
pub struct LocalGateway;

#[async_trait]
impl PaymentGateway for LocalGateway {
    async fn create_order(&self, _request: &OrderRequest) -> Result<String, ExternalError> {
        Ok(format!("order_{}", Uuid::new_v4().simple()))
    }
}

/// Notifier for deployments without a delivery channel: logs the dispatch,
/// with the code itself only at debug level.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_code(
        &self,
        recipient: Uuid,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), ExternalError> {
        tracing::info!(%recipient, ?purpose, "dispatching one-time code");
        tracing::debug!(%recipient, code, "one-time code value");
        Ok(())
    }
}

/// Notifier that records every dispatched code. Used by tests and available
/// for local runs where no delivery channel exists.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentCode>>,
}

/// One recorded code delivery.
#[derive(Debug, Clone)]
pub struct SentCode {
    pub recipient: Uuid,
    pub code: String,
    pub purpose: OtpPurpose,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dispatched so far, oldest first.
    pub fn sent(&self) -> Vec<SentCode> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    /// The most recent code for a purpose, if any.
    pub fn last_code(&self, purpose: OtpPurpose) -> Option<String> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .iter()
            .rev()
            .find(|s| s.purpose == purpose)
            .map(|s| s.code.clone())
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send_code(
        &self,
        recipient: Uuid,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), ExternalError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(SentCode {
                recipient,
                code: code.to_string(),
                purpose,
            });
        Ok(())
    }
}

/// Catalog stand-in over a fixed map, with an optional default price for
/// unknown offerings.
#[derive(Default)]
pub struct FixedCatalog {
    quotes: HashMap<Uuid, ServiceQuote>,
    default_price: Option<Decimal>,
}

impl FixedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote every unknown offering at `price` instead of rejecting it.
    pub fn with_default_price(price: Decimal) -> Self {
        FixedCatalog {
            quotes: HashMap::new(),
            default_price: Some(price),
        }
    }

    pub fn insert(&mut self, worker_service_id: Uuid, quote: ServiceQuote) {
        self.quotes.insert(worker_service_id, quote);
    }
}

#[async_trait]
impl ServiceCatalog for FixedCatalog {
    async fn quote(
        &self,
        _worker_id: Uuid,
        worker_service_id: Uuid,
    ) -> Result<Option<ServiceQuote>, ExternalError> {
        if let Some(q) = self.quotes.get(&worker_service_id) {
            return Ok(Some(q.clone()));
        }
        Ok(self.default_price.map(|price| ServiceQuote {
            service_id: worker_service_id,
            price,
        }))
    }
}

//! End-to-end exercise of the HTTP surface over a real listener.
//!
//! Each test stands up the full router on an ephemeral port and drives it
//! with a plain HTTP client, principal headers and all, the way an API
//! consumer would.

use std::sync::Arc;

use bookd_core::{signature, OtpPurpose};
use bookd_engine::external::{FixedCatalog, LocalGateway, MemoryNotifier};
use bookd_engine::{Engine, EngineConfig};
use bookd_server::serve::build_router;
use bookd_server::serve::state::AppState;
use bookd_storage::MemoryStore;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

const GATEWAY_SECRET: &str = "gw-secret-for-tests";
const WEBHOOK_SECRET: &str = "wh-secret-for-tests";

struct TestServer {
    base: String,
    notifier: Arc<MemoryNotifier>,
    agent: ureq::Agent,
    customer: Uuid,
    worker: Uuid,
}

fn start_server(runtime: &tokio::runtime::Runtime) -> TestServer {
    let notifier = Arc::new(MemoryNotifier::new());
    let engine = Engine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(LocalGateway),
        notifier.clone(),
        Arc::new(FixedCatalog::with_default_price(Decimal::from(750))),
        EngineConfig {
            gateway_secret: GATEWAY_SECRET.to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            currency: "INR".to_string(),
        },
    );
    let router = build_router(AppState::new(Arc::new(engine)));

    let addr = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        addr
    });

    // Non-2xx statuses are assertions here, not transport errors.
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    TestServer {
        base: format!("http://{addr}"),
        notifier,
        agent,
        customer: Uuid::new_v4(),
        worker: Uuid::new_v4(),
    }
}

impl TestServer {
    fn post(&self, path: &str, principal: (Uuid, &str), body: &Value) -> (u16, Value) {
        let response = self
            .agent
            .post(&format!("{}{}", self.base, path))
            .header("x-principal-id", &principal.0.to_string())
            .header("x-principal-role", principal.1)
            .send_json(body)
            .expect("request");
        let status = response.status().as_u16();
        let value = response.into_body().read_json().expect("json body");
        (status, value)
    }

    fn patch(&self, path: &str, principal: (Uuid, &str), body: &Value) -> (u16, Value) {
        let response = self
            .agent
            .patch(&format!("{}{}", self.base, path))
            .header("x-principal-id", &principal.0.to_string())
            .header("x-principal-role", principal.1)
            .send_json(body)
            .expect("request");
        let status = response.status().as_u16();
        let value = response.into_body().read_json().expect("json body");
        (status, value)
    }

    fn get(&self, path: &str, principal: (Uuid, &str)) -> (u16, Value) {
        let response = self
            .agent
            .get(&format!("{}{}", self.base, path))
            .header("x-principal-id", &principal.0.to_string())
            .header("x-principal-role", principal.1)
            .call()
            .expect("request");
        let status = response.status().as_u16();
        let value = response.into_body().read_json().expect("json body");
        (status, value)
    }

    fn as_customer(&self) -> (Uuid, &'static str) {
        (self.customer, "customer")
    }

    fn as_worker(&self) -> (Uuid, &'static str) {
        (self.worker, "worker")
    }

    /// Create a booking and return its id.
    fn book(&self, date: &str, time_label: &str) -> Uuid {
        let (status, body) = self.post(
            "/bookings",
            self.as_customer(),
            &json!({
                "worker_id": self.worker,
                "worker_service_id": Uuid::new_v4(),
                "booking_date": date,
                "booking_time": time_label,
            }),
        );
        assert_eq!(status, 201, "create booking: {body}");
        body["data"]["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("booking id in response")
    }

    /// Drive a fresh booking to PAYMENT_PENDING through the full handshake.
    fn booking_awaiting_payment(&self) -> Uuid {
        let id = self.book("2026-09-15", "10:00");
        let (status, _) = self.patch(
            &format!("/bookings/{id}/status"),
            self.as_worker(),
            &json!({ "status": "ACCEPTED" }),
        );
        assert_eq!(status, 200);

        let (status, _) = self.post(
            &format!("/bookings/{id}/initiate-service"),
            self.as_worker(),
            &json!({}),
        );
        assert_eq!(status, 200);
        let code = self
            .notifier
            .last_code(OtpPurpose::ServiceStart)
            .expect("service-start code dispatched");
        let (status, _) = self.post(
            &format!("/bookings/{id}/verify-service-otp"),
            self.as_worker(),
            &json!({ "otp": code }),
        );
        assert_eq!(status, 200);

        let (status, _) = self.post(
            &format!("/bookings/{id}/complete-service"),
            self.as_worker(),
            &json!({}),
        );
        assert_eq!(status, 200);
        id
    }
}

#[test]
fn health_endpoint_is_open() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);

    let response = server
        .agent
        .get(&format!("{}/health", server.base))
        .call()
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
}

#[test]
fn missing_principal_headers_are_rejected() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);

    let response = server
        .agent
        .get(&format!("{}/bookings", server.base))
        .call()
        .expect("request");
    assert_eq!(response.status().as_u16(), 401);
}

#[test]
fn gateway_settlement_end_to_end() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);
    let id = server.booking_awaiting_payment();

    let (status, body) = server.post(
        "/payments/gateway/create-order",
        server.as_customer(),
        &json!({ "booking_id": id }),
    );
    assert_eq!(status, 201, "create order: {body}");
    let order_id = body["data"]["order_id"].as_str().expect("order id").to_string();

    // Retry returns the same order.
    let (status, body) = server.post(
        "/payments/gateway/create-order",
        server.as_customer(),
        &json!({ "booking_id": id }),
    );
    assert_eq!(status, 201);
    assert_eq!(body["data"]["order_id"].as_str(), Some(order_id.as_str()));

    let payment_id = "pay_e2e_001";
    let payload = signature::gateway_payload(&order_id, payment_id);
    let sig = signature::sign(GATEWAY_SECRET.as_bytes(), payload.as_bytes());

    // A forged signature changes nothing.
    let (status, _) = server.post(
        "/payments/gateway/verify",
        server.as_customer(),
        &json!({ "order_id": order_id, "payment_id": payment_id, "signature": "00ff" }),
    );
    assert_eq!(status, 409);

    let (status, body) = server.post(
        "/payments/gateway/verify",
        server.as_customer(),
        &json!({ "order_id": order_id, "payment_id": payment_id, "signature": sig }),
    );
    assert_eq!(status, 200, "verify: {body}");
    assert_eq!(body["data"]["outcome"].as_str(), Some("SETTLED"));

    let (status, body) = server.get(&format!("/bookings/{id}"), server.as_customer());
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"].as_str(), Some("COMPLETED"));
    assert_eq!(body["data"]["payment"]["status"].as_str(), Some("COMPLETED"));
    assert_eq!(
        body["data"]["payment"]["transaction_id"].as_str(),
        Some(payment_id)
    );

    // Resubmission is an idempotent no-op.
    let (status, body) = server.post(
        "/payments/gateway/verify",
        server.as_customer(),
        &json!({ "order_id": order_id, "payment_id": payment_id, "signature": sig }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["data"]["outcome"].as_str(), Some("ALREADY_SETTLED"));

    let (status, _) = server.post(
        &format!("/bookings/{id}/review"),
        server.as_customer(),
        &json!({ "rating": 5, "comment": "spotless" }),
    );
    assert_eq!(status, 200);
}

#[test]
fn cash_settlement_end_to_end() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);
    let id = server.booking_awaiting_payment();

    let (status, _) = server.post(
        "/payments/cash/initiate",
        server.as_customer(),
        &json!({ "booking_id": id }),
    );
    assert_eq!(status, 200);
    let code = server
        .notifier
        .last_code(OtpPurpose::CashSettlement)
        .expect("cash code dispatched");

    let (status, _) = server.post(
        "/payments/cash/verify",
        server.as_customer(),
        &json!({ "booking_id": id, "otp": "000000" }),
    );
    assert_eq!(status, 409, "wrong code rejected");

    let (status, body) = server.post(
        "/payments/cash/verify",
        server.as_customer(),
        &json!({ "booking_id": id, "otp": code }),
    );
    assert_eq!(status, 200, "cash verify: {body}");
    assert_eq!(body["data"]["outcome"].as_str(), Some("SETTLED"));

    let (status, body) = server.get(&format!("/bookings/{id}"), server.as_customer());
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"].as_str(), Some("COMPLETED"));
    assert_eq!(body["data"]["payment"]["payment_type"].as_str(), Some("CASH"));
}

#[test]
fn webhook_settles_and_redelivery_is_silent() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);
    let id = server.booking_awaiting_payment();

    let (status, body) = server.post(
        "/payments/gateway/create-order",
        server.as_customer(),
        &json!({ "booking_id": id }),
    );
    assert_eq!(status, 201);
    let order_id = body["data"]["order_id"].as_str().expect("order id").to_string();

    let event = json!({
        "event": "payment.captured",
        "order_id": order_id,
        "payment_id": "pay_via_webhook",
    })
    .to_string();
    let sig = signature::sign(WEBHOOK_SECRET.as_bytes(), event.as_bytes());

    // Unsigned and mis-signed deliveries are refused.
    let response = server
        .agent
        .post(&format!("{}/payments/webhook", server.base))
        .header("content-type", "application/json")
        .send(event.as_bytes())
        .expect("request");
    assert_eq!(response.status().as_u16(), 400);

    let response = server
        .agent
        .post(&format!("{}/payments/webhook", server.base))
        .header("x-webhook-signature", "deadbeef")
        .header("content-type", "application/json")
        .send(event.as_bytes())
        .expect("request");
    assert_eq!(response.status().as_u16(), 400);

    let deliver = || {
        server
            .agent
            .post(&format!("{}/payments/webhook", server.base))
            .header("x-webhook-signature", &sig)
            .header("content-type", "application/json")
            .send(event.as_bytes())
            .expect("request")
    };

    assert_eq!(deliver().status().as_u16(), 200);
    assert_eq!(deliver().status().as_u16(), 200);

    let (status, body) = server.get(&format!("/bookings/{id}"), server.as_customer());
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"].as_str(), Some("COMPLETED"));
    assert_eq!(
        body["data"]["payment"]["transaction_id"].as_str(),
        Some("pay_via_webhook")
    );
}

#[test]
fn slot_conflict_and_cancellation() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);
    let first = server.book("2026-09-20", "14:00");

    let rival = Uuid::new_v4();
    let (status, _) = server.post(
        "/bookings",
        (rival, "customer"),
        &json!({
            "worker_id": server.worker,
            "worker_service_id": Uuid::new_v4(),
            "booking_date": "2026-09-20",
            "booking_time": "14:00",
        }),
    );
    assert_eq!(status, 409);

    let (status, _) = server.patch(
        &format!("/bookings/{first}/status"),
        server.as_customer(),
        &json!({ "status": "CANCELLED", "reason": "plans changed" }),
    );
    assert_eq!(status, 200);

    let (status, _) = server.post(
        "/bookings",
        (rival, "customer"),
        &json!({
            "worker_id": server.worker,
            "worker_service_id": Uuid::new_v4(),
            "booking_date": "2026-09-20",
            "booking_time": "14:00",
        }),
    );
    assert_eq!(status, 201);
}

#[test]
fn role_and_scope_enforcement_on_the_wire() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);
    let id = server.book("2026-09-21", "09:00");

    // The customer cannot accept their own booking.
    let (status, _) = server.patch(
        &format!("/bookings/{id}/status"),
        server.as_customer(),
        &json!({ "status": "ACCEPTED" }),
    );
    assert_eq!(status, 403);

    // A stranger with the worker role sees nothing.
    let (status, _) = server.get(&format!("/bookings/{id}"), (Uuid::new_v4(), "worker"));
    assert_eq!(status, 404);

    // Unknown role header is malformed.
    let response = server
        .agent
        .get(&format!("{}/bookings/{id}", server.base))
        .header("x-principal-id", &server.customer.to_string())
        .header("x-principal-role", "admin")
        .call()
        .expect("request");
    assert_eq!(response.status().as_u16(), 400);
}

#[test]
fn booking_views_never_carry_code_values() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = start_server(&runtime);
    let id = server.book("2026-09-22", "11:00");

    let (status, _) = server.patch(
        &format!("/bookings/{id}/status"),
        server.as_worker(),
        &json!({ "status": "ACCEPTED" }),
    );
    assert_eq!(status, 200);
    let (status, _) = server.post(
        &format!("/bookings/{id}/initiate-service"),
        server.as_worker(),
        &json!({}),
    );
    assert_eq!(status, 200);

    let code = server
        .notifier
        .last_code(OtpPurpose::ServiceStart)
        .expect("code dispatched");
    let (status, body) = server.get(&format!("/bookings/{id}"), server.as_worker());
    assert_eq!(status, 200);
    assert!(body["data"]["service"]["otp_expires_at"].is_string());
    assert!(
        !body.to_string().contains(&code),
        "code value leaked into the booking view"
    );
}

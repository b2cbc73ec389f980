//! Backend-generic conformance suite.
//!
//! Any [`BookingStore`] implementation must pass these tests. They exercise
//! the two atomicity guarantees the engine depends on: slot exclusivity at
//! insert time and version-guarded conditional updates, both sequentially
//! and under spawned-task races.
//!
//! Run against a backend by supplying a factory closure that builds a fresh,
//! empty store per test:
//!
//! ```ignore
//! let results = conformance::run_all(&|| async { MemoryStore::new() }).await;
//! assert!(results.iter().all(|r| r.passed()));
//! ```

mod occ;
mod slot;

use std::future::Future;

use bookd_core::{Booking, NewBooking};

use crate::traits::BookingStore;

/// Outcome of one conformance test.
#[derive(Debug)]
pub struct TestResult {
    pub group: &'static str,
    pub name: &'static str,
    pub error: Option<String>,
}

impl TestResult {
    fn from_result(group: &'static str, name: &'static str, r: Result<(), String>) -> Self {
        TestResult {
            group,
            name,
            error: r.err(),
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Run the full suite against a backend factory.
pub async fn run_all<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();
    results.extend(slot::run_slot_tests(factory).await);
    results.extend(occ::run_occ_tests(factory).await);
    results
}

/// Build a fresh PENDING booking on a fixed slot for test fixtures.
pub(crate) fn fixture_booking(worker: uuid::Uuid, time_label: &str) -> Booking {
    let now = time::OffsetDateTime::now_utc();
    Booking::create(
        NewBooking {
            customer_id: uuid::Uuid::new_v4(),
            worker_id: worker,
            worker_service_id: uuid::Uuid::new_v4(),
            service_id: uuid::Uuid::new_v4(),
            booking_date: time::macros::date!(2024 - 01 - 15),
            booking_time: time_label.to_string(),
            price: rust_decimal::Decimal::new(500, 0),
        },
        now,
    )
}

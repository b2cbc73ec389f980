//! Slot exclusivity conformance: at most one live booking per
//! (worker, date, time), including under concurrent creation.

use std::future::Future;
use std::sync::Arc;

use bookd_core::BookingStatus;
use uuid::Uuid;

use super::{fixture_booking, TestResult};
use crate::error::StorageError;
use crate::traits::BookingStore;

/// Number of racing tasks in the concurrent test.
const N: usize = 10;

pub(super) async fn run_slot_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "slot",
            "second_insert_on_same_slot_rejected",
            second_insert_on_same_slot_rejected(factory).await,
        ),
        TestResult::from_result(
            "slot",
            "terminal_booking_frees_slot",
            terminal_booking_frees_slot(factory).await,
        ),
        TestResult::from_result(
            "slot",
            "different_slots_coexist",
            different_slots_coexist(factory).await,
        ),
        TestResult::from_result(
            "slot",
            "concurrent_inserts_exactly_one_wins",
            concurrent_inserts_exactly_one_wins(factory).await,
        ),
    ]
}

async fn second_insert_on_same_slot_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let worker = Uuid::new_v4();

    store
        .insert(fixture_booking(worker, "10:00 AM"))
        .await
        .map_err(|e| format!("first insert failed: {e}"))?;

    match store.insert(fixture_booking(worker, "10:00 AM")).await {
        Err(StorageError::SlotTaken { .. }) => Ok(()),
        Err(other) => Err(format!("expected SlotTaken, got {other}")),
        Ok(()) => Err("second insert on the same slot succeeded".to_string()),
    }
}

async fn terminal_booking_frees_slot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let worker = Uuid::new_v4();

    let mut first = fixture_booking(worker, "10:00 AM");
    store
        .insert(first.clone())
        .await
        .map_err(|e| format!("insert failed: {e}"))?;

    first.status = BookingStatus::Cancelled;
    store
        .update(0, first)
        .await
        .map_err(|e| format!("cancel update failed: {e}"))?;

    store
        .insert(fixture_booking(worker, "10:00 AM"))
        .await
        .map_err(|e| format!("slot should be free after cancellation: {e}"))
}

async fn different_slots_coexist<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let worker = Uuid::new_v4();

    store
        .insert(fixture_booking(worker, "10:00 AM"))
        .await
        .map_err(|e| format!("insert failed: {e}"))?;
    store
        .insert(fixture_booking(worker, "11:00 AM"))
        .await
        .map_err(|e| format!("different time slot was rejected: {e}"))?;
    store
        .insert(fixture_booking(Uuid::new_v4(), "10:00 AM"))
        .await
        .map_err(|e| format!("different worker was rejected: {e}"))
}

/// N tasks race to book the same slot. Exactly one insert must succeed and
/// the rest must get SlotTaken.
async fn concurrent_inserts_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let worker = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..N {
        let store = Arc::clone(&store);
        let booking = fixture_booking(worker, "10:00 AM");
        handles.push(tokio::spawn(async move { store.insert(booking).await }));
    }

    let mut wins = 0;
    let mut slot_taken = 0;
    for h in handles {
        match h.await.map_err(|e| format!("task panicked: {e}"))? {
            Ok(()) => wins += 1,
            Err(StorageError::SlotTaken { .. }) => slot_taken += 1,
            Err(other) => return Err(format!("unexpected error: {other}")),
        }
    }

    if wins == 1 && slot_taken == N - 1 {
        Ok(())
    } else {
        Err(format!("expected 1 winner, got {wins} (SlotTaken: {slot_taken})"))
    }
}

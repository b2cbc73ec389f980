//! Version-guarded update conformance: every transition is a conditional
//! write, and concurrent writers against the same version produce exactly
//! one winner.

use std::future::Future;
use std::sync::Arc;

use bookd_core::BookingStatus;
use uuid::Uuid;

use super::{fixture_booking, TestResult};
use crate::error::StorageError;
use crate::traits::BookingStore;

const N: usize = 10;

pub(super) async fn run_occ_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "occ",
            "update_bumps_version",
            update_bumps_version(factory).await,
        ),
        TestResult::from_result(
            "occ",
            "stale_version_rejected",
            stale_version_rejected(factory).await,
        ),
        TestResult::from_result(
            "occ",
            "concurrent_updates_exactly_one_wins",
            concurrent_updates_exactly_one_wins(factory).await,
        ),
    ]
}

async fn update_bumps_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut booking = fixture_booking(Uuid::new_v4(), "10:00 AM");
    store
        .insert(booking.clone())
        .await
        .map_err(|e| e.to_string())?;

    booking.status = BookingStatus::Accepted;
    let stored = store.update(0, booking).await.map_err(|e| e.to_string())?;

    if stored.version != 1 {
        return Err(format!("expected version 1, got {}", stored.version));
    }
    if stored.status != BookingStatus::Accepted {
        return Err("status not applied".to_string());
    }
    Ok(())
}

async fn stale_version_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut booking = fixture_booking(Uuid::new_v4(), "10:00 AM");
    store
        .insert(booking.clone())
        .await
        .map_err(|e| e.to_string())?;

    booking.status = BookingStatus::Accepted;
    store
        .update(0, booking.clone())
        .await
        .map_err(|e| e.to_string())?;

    // Replay against the stale version. The write must not apply.
    booking.status = BookingStatus::Declined;
    match store.update(0, booking.clone()).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Err(other) => return Err(format!("expected ConcurrentConflict, got {other}")),
        Ok(_) => return Err("stale write succeeded".to_string()),
    }

    let current = store.get(booking.id).await.map_err(|e| e.to_string())?;
    if current.status != BookingStatus::Accepted {
        return Err("stale write leaked into the stored record".to_string());
    }
    Ok(())
}

/// N tasks read the booking at version 0 and race conditional updates.
/// Exactly one commit wins; the rest get ConcurrentConflict.
async fn concurrent_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BookingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let booking = fixture_booking(Uuid::new_v4(), "10:00 AM");
    store
        .insert(booking.clone())
        .await
        .map_err(|e| e.to_string())?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let store = Arc::clone(&store);
        let mut b = booking.clone();
        handles.push(tokio::spawn(async move {
            b.status = BookingStatus::Accepted;
            store.update(0, b).await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for h in handles {
        match h.await.map_err(|e| format!("task panicked: {e}"))? {
            Ok(_) => wins += 1,
            Err(StorageError::ConcurrentConflict { .. }) => conflicts += 1,
            Err(other) => return Err(format!("unexpected error: {other}")),
        }
    }

    if wins == 1 && conflicts == N - 1 {
        Ok(())
    } else {
        Err(format!("expected 1 winner, got {wins} ({conflicts} conflicts)"))
    }
}

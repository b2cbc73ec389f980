//! The storage trait for booking backends.

use async_trait::async_trait;
use bookd_core::{Booking, BookingId};
use uuid::Uuid;

use crate::error::StorageError;

/// Durable, transactional storage for booking records.
///
/// ## Atomicity contract
///
/// Two operations carry hard atomicity requirements; everything else is a
/// plain read:
///
/// - **`insert`** must check-then-create atomically: if any booking with the
///   same `(worker_id, booking_date, booking_time)` slot key is in a
///   slot-occupying status (PENDING or ACCEPTED), the insert fails with
///   [`StorageError::SlotTaken`] and nothing is written. An application-level
///   pre-check is not sufficient under concurrent creation; the backend must
///   serialize this (uniqueness constraint, serialized transaction, or a
///   single mutex in the in-memory case).
///
/// - **`update`** is an optimistic conditional write:
///   `UPDATE WHERE version = expected_version`. On mismatch it returns
///   [`StorageError::ConcurrentConflict`] and writes nothing. On success the
///   stored record is the given booking with `version = expected_version + 1`.
///
/// Every engine transition is exactly one `update` call, so no partially
/// applied transition is ever observable.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` for use in axum
/// application state and across task boundaries.
#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    /// Insert a new booking, enforcing slot exclusivity.
    async fn insert(&self, booking: Booking) -> Result<(), StorageError>;

    /// Fetch a booking by id.
    async fn get(&self, booking_id: BookingId) -> Result<Booking, StorageError>;

    /// Version-guarded wholesale replacement. Returns the stored record
    /// (with its bumped version) on success.
    async fn update(
        &self,
        expected_version: i64,
        booking: Booking,
    ) -> Result<Booking, StorageError>;

    /// Look up the booking holding the given remote gateway order id.
    /// Returns `Ok(None)` for unknown order ids; the webhook reconciler
    /// treats that as a droppable event, not an error.
    async fn find_by_remote_order(&self, order_id: &str) -> Result<Option<Booking>, StorageError>;

    /// All bookings where the principal is either the customer or the
    /// worker, newest first.
    async fn list_for_principal(&self, principal_id: Uuid) -> Result<Vec<Booking>, StorageError>;
}

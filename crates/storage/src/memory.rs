//! In-memory reference backend.
//!
//! A single async mutex over the booking map serializes every mutation, which
//! is what makes the slot check-then-insert and the version-guarded update
//! atomic here. Suitable for tests and single-process deployments; a SQL
//! backend would use a scoped uniqueness constraint and a conditional UPDATE
//! instead.

use std::collections::HashMap;

use async_trait::async_trait;
use bookd_core::{Booking, BookingId};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StorageError;
use crate::traits::BookingStore;

#[derive(Default)]
pub struct MemoryStore {
    bookings: Mutex<HashMap<BookingId, Booking>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert(&self, booking: Booking) -> Result<(), StorageError> {
        let mut bookings = self.bookings.lock().await;

        if bookings.contains_key(&booking.id) {
            return Err(StorageError::AlreadyExists {
                booking_id: booking.id,
            });
        }

        // Slot exclusivity: scan for a live booking on the same slot key.
        // Runs under the same lock as the insert below, so two concurrent
        // creates cannot both pass the check.
        let slot = booking.slot_key();
        if bookings
            .values()
            .any(|b| b.status.occupies_slot() && b.slot_key() == slot)
        {
            return Err(StorageError::SlotTaken {
                worker_id: booking.worker_id,
                booking_date: booking.booking_date,
                booking_time: booking.booking_time.clone(),
            });
        }

        bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> Result<Booking, StorageError> {
        let bookings = self.bookings.lock().await;
        bookings
            .get(&booking_id)
            .cloned()
            .ok_or(StorageError::NotFound { booking_id })
    }

    async fn update(
        &self,
        expected_version: i64,
        mut booking: Booking,
    ) -> Result<Booking, StorageError> {
        let mut bookings = self.bookings.lock().await;

        let current = bookings
            .get(&booking.id)
            .ok_or(StorageError::NotFound {
                booking_id: booking.id,
            })?;

        if current.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                booking_id: booking.id,
                expected_version,
            });
        }

        booking.version = expected_version + 1;
        booking.updated_at = time::OffsetDateTime::now_utc();
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find_by_remote_order(&self, order_id: &str) -> Result<Option<Booking>, StorageError> {
        let bookings = self.bookings.lock().await;
        Ok(bookings
            .values()
            .find(|b| b.payment.remote_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn list_for_principal(&self, principal_id: Uuid) -> Result<Vec<Booking>, StorageError> {
        let bookings = self.bookings.lock().await;
        let mut out: Vec<Booking> = bookings
            .values()
            .filter(|b| b.customer_id == principal_id || b.worker_id == principal_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

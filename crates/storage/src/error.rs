//! Storage error type and its mapping into the domain taxonomy.

use bookd_core::{BookingError, BookingId};
use time::Date;
use uuid::Uuid;

/// All errors a [`crate::BookingStore`] implementation can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Insert rejected: a non-terminal booking already occupies the slot.
    #[error("slot taken: worker {worker_id} at {booking_date} {booking_time}")]
    SlotTaken {
        worker_id: Uuid,
        booking_date: Date,
        booking_time: String,
    },

    /// No booking with the given id.
    #[error("booking not found: {booking_id}")]
    NotFound { booking_id: BookingId },

    /// Optimistic concurrency conflict: the expected version was not current.
    /// Another writer committed first; the caller may re-read and retry.
    #[error("concurrent conflict on booking {booking_id}: expected version {expected_version}")]
    ConcurrentConflict {
        booking_id: BookingId,
        expected_version: i64,
    },

    /// A booking with this id already exists.
    #[error("booking already exists: {booking_id}")]
    AlreadyExists { booking_id: BookingId },

    /// Backend-specific failure (connection, serialization, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for BookingError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::SlotTaken {
                worker_id,
                booking_date,
                booking_time,
            } => BookingError::SlotTaken {
                worker_id,
                booking_date,
                booking_time,
            },
            StorageError::NotFound { booking_id } => BookingError::NotFound { booking_id },
            StorageError::ConcurrentConflict { .. } => BookingError::Concurrency,
            StorageError::AlreadyExists { booking_id } => BookingError::Internal {
                message: format!("duplicate booking id {booking_id}"),
            },
            StorageError::Backend(message) => BookingError::Internal { message },
        }
    }
}

//! Persistence seam for bookd.
//!
//! Defines the [`BookingStore`] trait every backend implements, the
//! [`StorageError`] type, the in-memory reference backend, and a
//! backend-generic conformance suite exercising the atomicity guarantees
//! the engine relies on: slot exclusivity at insert and version-guarded
//! conditional updates.

pub mod conformance;
pub mod error;
pub mod memory;
pub mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use traits::BookingStore;

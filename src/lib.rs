//! # vitalqueue
//!
//! Triage priority scoring and per-provider appointment queueing.
//!
//! This crate provides:
//! - A pure, deterministic 0-100 priority score computed from health
//!   signals, with an auditable per-factor breakdown
//! - Atomic slot reservation with per-provider serialization, daily token
//!   sequencing, and capacity limits
//! - On-demand queue projection with positions and wait estimates
//! - Best-effort fan-out of queue-change events
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types and pure logic (scores, bookings,
//!   ledger entries, queue projection)
//! - `ports`: Trait definitions for external collaborators (storage,
//!   image classifier, notification transport)
//! - `adapters`: Concrete implementations (SQLite, channel fan-out,
//!   classifier wrappers, log sanitization)
//! - `application`: Use cases orchestrating domain and ports

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use application::{
    BookingCoordinator, QueueService, QueueView, ReservationRequest, ReserveOutcome,
    SlotLedger,
};
pub use domain::{
    compute_score, Booking, HealthSignals, PriorityLevel, PriorityScore, Provider, SlotKey,
};

/// Result type for vitalqueue operations
pub type Result<T> = std::result::Result<T, VitalQueueError>;

/// Main error type for vitalqueue
///
/// Expected reservation rejections (slot conflict, capacity, provider
/// unavailable) are not errors; they are [`ReserveOutcome`] variants.
#[derive(Debug, thiserror::Error)]
pub enum VitalQueueError {
    /// Malformed or unknown identifiers, or an operation that the
    /// booking's lifecycle state forbids. Rejected before any mutation.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A referenced booking or provider does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The persistence layer failed; the attempted operation was rolled
    /// back or never applied.
    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),
}

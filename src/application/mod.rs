//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports: the concurrent slot
//! ledger, the booking coordinator, and the queue read service.

mod booking;
mod ledger;
mod queue;

pub use booking::{BookingCoordinator, ReservationRequest, ReserveOutcome};
pub use ledger::SlotLedger;
pub use queue::{QueueService, QueueView};

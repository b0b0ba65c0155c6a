//! Queue projection: ordered, positioned, ETA-annotated views of a
//! provider's active bookings.
//!
//! Projections are ephemeral. Every query recomputes the order from the
//! current booking set, because any insertion or cancellation shifts every
//! downstream position; nothing here is ever cached or persisted.

use serde::{Deserialize, Serialize};

use crate::domain::booking::Booking;
use crate::domain::score::PriorityLevel;

/// Estimated wait before a queue entry is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eta {
    pub minutes: u32,
}

impl std::fmt::Display for Eta {
    /// Renders `"45 min"` up to an hour, `"1h 30m"` beyond it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.minutes <= 60 {
            write!(f, "{} min", self.minutes)
        } else {
            write!(f, "{}h {}m", self.minutes / 60, self.minutes % 60)
        }
    }
}

/// One positioned entry in a projected queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub booking: Booking,

    /// 1-based rank in the projected order
    pub position: usize,

    pub eta: Eta,
}

/// Project the active bookings into their service order.
///
/// Total order:
/// 1. Critical-tier bookings precede everything else, whatever the scores.
/// 2. Remaining bookings sort by descending effective score.
/// 3. Equal scores serve the earlier `created_at` first, so equally urgent
///    patients cannot starve each other.
///
/// The entry at 0-based index `i` waits `i * avg_consult_minutes`; the head
/// of the queue waits zero minutes.
#[must_use]
pub fn project(bookings: &[Booking], avg_consult_minutes: u32) -> Vec<QueueEntry> {
    let mut active: Vec<&Booking> = bookings.iter().filter(|b| b.is_active()).collect();

    active.sort_by(|a, b| {
        let a_critical = a.level() == PriorityLevel::Critical;
        let b_critical = b.level() == PriorityLevel::Critical;
        b_critical
            .cmp(&a_critical)
            .then_with(|| b.effective_score().cmp(&a.effective_score()))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    active
        .into_iter()
        .enumerate()
        .map(|(index, booking)| QueueEntry {
            booking: booking.clone(),
            position: index + 1,
            eta: Eta {
                minutes: index as u32 * avg_consult_minutes,
            },
        })
        .collect()
}

/// The projected entry for one booking, if it is still in the queue.
#[must_use]
pub fn position_of(
    bookings: &[Booking],
    booking_id: &str,
    avg_consult_minutes: u32,
) -> Option<QueueEntry> {
    project(bookings, avg_consult_minutes)
        .into_iter()
        .find(|entry| entry.booking.id == booking_id)
}

//! Booking records and slot identity.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::score::{EffectiveScore, PriorityLevel};

/// One reservation unit: a calendar date and start time for a provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotKey {
    #[must_use]
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.time.format("%H:%M"))
    }
}

/// An appointment booking.
///
/// Lifecycle: created (slot reserved) -> completed | cancelled. Cancelling
/// frees the slot; completing does not. `token_number` is the per-provider,
/// per-day sequence number and is never reissued within a day epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier (UUIDv4)
    pub id: String,

    pub provider_id: String,

    pub patient_id: String,

    /// The reserved slot
    pub slot: SlotKey,

    /// Creation timestamp; the FIFO tie-break for equal scores
    pub created_at: DateTime<Utc>,

    /// The severity driving this booking's queue position
    pub severity: EffectiveScore,

    pub cancelled: bool,

    pub completed: bool,

    /// Sequential daily token for the provider
    pub token_number: u32,
}

impl Booking {
    /// Create a new active booking with a fresh id.
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        patient_id: impl Into<String>,
        slot: SlotKey,
        severity: EffectiveScore,
        token_number: u32,
    ) -> Self {
        Self {
            id: booking_id(),
            provider_id: provider_id.into(),
            patient_id: patient_id.into(),
            slot,
            created_at: Utc::now(),
            severity,
            cancelled: false,
            completed: false,
            token_number,
        }
    }

    /// Whether this booking still occupies a queue position.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cancelled && !self.completed
    }

    /// The score used for queue ordering.
    #[must_use]
    pub fn effective_score(&self) -> u8 {
        self.severity.score
    }

    /// The level band of the effective score.
    #[must_use]
    pub fn level(&self) -> PriorityLevel {
        self.severity.level
    }
}

/// Generate a UUID v4 booking id using a CSPRNG.
///
/// ChaCha20Rng seeded from OS entropy keeps ids unpredictable across all
/// platforms.
fn booking_id() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::score::{EffectiveScore, PriorityScore};

    fn slot(hour: u32) -> SlotKey {
        SlotKey::new(
            NaiveDate::from_ymd_opt(2025, 6, 2).expect("Valid date"),
            NaiveTime::from_hms_opt(hour, 0, 0).expect("Valid time"),
        )
    }

    #[test]
    fn test_new_booking_is_active() {
        let booking = Booking::new(
            "prov-1",
            "pat-1",
            slot(10),
            EffectiveScore::structured(PriorityScore::default()),
            1,
        );
        assert!(booking.is_active());
        assert_eq!(booking.token_number, 1);
        assert_eq!(booking.effective_score(), 0);
    }

    #[test]
    fn test_cancelled_or_completed_is_inactive() {
        let mut booking = Booking::new(
            "prov-1",
            "pat-1",
            slot(10),
            EffectiveScore::structured(PriorityScore::default()),
            1,
        );
        booking.cancelled = true;
        assert!(!booking.is_active());

        booking.cancelled = false;
        booking.completed = true;
        assert!(!booking.is_active());
    }

    #[test]
    fn test_booking_id_generation() {
        let id1 = booking_id();
        let id2 = booking_id();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36); // UUID format with dashes
    }

    #[test]
    fn test_slot_key_display() {
        assert_eq!(slot(9).to_string(), "2025-06-02 09:00");
    }
}

//! Provider availability and capacity settings.

use serde::{Deserialize, Serialize};

/// Default daily booking token cap for a new provider.
pub const DEFAULT_TOKEN_CAP: u32 = 30;

/// Default average consultation length in minutes, used for queue ETAs.
pub const DEFAULT_CONSULT_MINUTES: u32 = 15;

/// Explicit availability state a provider can set, independent of the
/// overall `available` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    #[default]
    Available,
    /// In consultation; still accepts bookings
    Busy,
    /// Not accepting bookings
    Unavailable,
}

impl AvailabilityStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Unavailable => "unavailable",
        }
    }

    /// Parse a stored status string; unknown values fall back to
    /// `Available`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "busy" => Self::Busy,
            "unavailable" => Self::Unavailable,
            _ => Self::Available,
        }
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,

    pub name: String,

    /// Overall availability switch
    pub available: bool,

    pub status: AvailabilityStatus,

    /// Maximum tokens issued per day epoch
    pub daily_token_cap: u32,

    /// Tokens issued in the current day epoch; reset by the daily job
    pub current_token_count: u32,

    /// Average consultation length in minutes, drives queue ETAs
    pub avg_consult_minutes: u32,
}

impl Provider {
    /// Create a provider with default capacity settings.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            available: true,
            status: AvailabilityStatus::Available,
            daily_token_cap: DEFAULT_TOKEN_CAP,
            current_token_count: 0,
            avg_consult_minutes: DEFAULT_CONSULT_MINUTES,
        }
    }

    /// Whether reservation requests should be accepted at all.
    ///
    /// `Busy` providers still take bookings; only the overall flag or an
    /// explicit `Unavailable` status rejects them.
    #[must_use]
    pub fn accepts_bookings(&self) -> bool {
        self.available && self.status != AvailabilityStatus::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_provider_defaults() {
        let provider = Provider::new("prov-1", "Dr. Osei");
        assert!(provider.accepts_bookings());
        assert_eq!(provider.daily_token_cap, DEFAULT_TOKEN_CAP);
        assert_eq!(provider.avg_consult_minutes, DEFAULT_CONSULT_MINUTES);
        assert_eq!(provider.current_token_count, 0);
    }

    #[test]
    fn test_busy_still_accepts_bookings() {
        let mut provider = Provider::new("prov-1", "Dr. Osei");
        provider.status = AvailabilityStatus::Busy;
        assert!(provider.accepts_bookings());
    }

    #[test]
    fn test_unavailable_rejects_bookings() {
        let mut provider = Provider::new("prov-1", "Dr. Osei");
        provider.status = AvailabilityStatus::Unavailable;
        assert!(!provider.accepts_bookings());

        provider.status = AvailabilityStatus::Available;
        provider.available = false;
        assert!(!provider.accepts_bookings());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            AvailabilityStatus::Available,
            AvailabilityStatus::Busy,
            AvailabilityStatus::Unavailable,
        ] {
            assert_eq!(AvailabilityStatus::parse(status.as_str()), status);
        }
        assert_eq!(
            AvailabilityStatus::parse("what"),
            AvailabilityStatus::Available
        );
    }
}

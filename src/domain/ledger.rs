//! Per-provider slot ledger entry.
//!
//! A [`ProviderLedger`] is the record of everything a single provider has
//! reserved: a date-keyed set of booked times plus the daily token counter.
//! The type is pure and single-threaded; concurrent access is serialized by
//! the application-level registry that owns one entry per provider.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::booking::SlotKey;

/// How many days ahead the earliest-open-slot search scans.
const SLOT_SEARCH_DAYS: i64 = 7;

/// Clinic hours considered by the earliest-open-slot search (inclusive).
const FIRST_SLOT_HOUR: u32 = 10;
const LAST_SLOT_HOUR: u32 = 20;

/// Reserved slots and token counter for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderLedger {
    booked: BTreeMap<NaiveDate, BTreeSet<NaiveTime>>,
    token_count: u32,
}

impl ProviderLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the slot is currently reserved.
    #[must_use]
    pub fn is_booked(&self, slot: &SlotKey) -> bool {
        self.booked
            .get(&slot.date)
            .map_or(false, |times| times.contains(&slot.time))
    }

    /// Reserve the slot if it is not already taken.
    ///
    /// Returns `false` when the slot was already reserved; the ledger is
    /// unchanged in that case. This is the insert-if-absent primitive the
    /// uniqueness invariant rests on.
    pub fn reserve(&mut self, slot: &SlotKey) -> bool {
        self.booked.entry(slot.date).or_default().insert(slot.time)
    }

    /// Release a reserved slot, making it bookable again.
    ///
    /// Returns `false` when the slot was not reserved.
    pub fn release(&mut self, slot: &SlotKey) -> bool {
        match self.booked.get_mut(&slot.date) {
            Some(times) => {
                let removed = times.remove(&slot.time);
                if times.is_empty() {
                    self.booked.remove(&slot.date);
                }
                removed
            }
            None => false,
        }
    }

    /// Tokens issued in the current day epoch.
    #[must_use]
    pub fn token_count(&self) -> u32 {
        self.token_count
    }

    /// Issue the next token. Strictly increasing until the daily reset.
    pub fn next_token(&mut self) -> u32 {
        self.token_count += 1;
        self.token_count
    }

    /// Restore a persisted counter value (startup hydration).
    pub fn set_token_count(&mut self, count: u32) {
        self.token_count = count;
    }

    /// Zero the token counter. Reserved slots are untouched.
    pub fn reset_tokens(&mut self) {
        self.token_count = 0;
    }

    /// Number of reserved slots across all dates.
    #[must_use]
    pub fn reserved_count(&self) -> usize {
        self.booked.values().map(BTreeSet::len).sum()
    }

    /// Find the earliest unreserved on-the-hour slot within the search
    /// window, scanning clinic hours day by day from `from`.
    #[must_use]
    pub fn earliest_open_slot(&self, from: NaiveDate) -> Option<SlotKey> {
        for day in 0..SLOT_SEARCH_DAYS {
            let date = from + Duration::days(day);
            for hour in FIRST_SLOT_HOUR..=LAST_SLOT_HOUR {
                let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
                let slot = SlotKey::new(date, time);
                if !self.is_booked(&slot) {
                    return Some(slot);
                }
            }
        }
        None
    }
}

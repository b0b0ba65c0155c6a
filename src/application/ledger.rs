//! Slot ledger: the one mutable shared resource in the engine.
//!
//! The ledger keeps one [`ProviderLedger`] entry per provider, each behind
//! its own mutex. Every reservation, release, and token operation for a
//! provider runs inside that entry's lock, which serializes all writers
//! for the provider while leaving other providers fully independent. This
//! is the mutual-exclusion boundary the double-booking invariant rests on;
//! nothing outside this module mutates reservation state.
//!
//! # Mutex Behavior
//!
//! A poisoned entry mutex (from panic in another thread) will cause panic.
//! This fail-fast behavior is intentional: continuing with a possibly
//! half-updated reservation record risks double-booking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::domain::{Booking, Provider, ProviderLedger};

/// Registry of per-provider slot ledgers.
#[derive(Default)]
pub struct SlotLedger {
    entries: RwLock<HashMap<String, Arc<Mutex<ProviderLedger>>>>,
}

impl SlotLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the entry for a provider.
    fn entry(&self, provider_id: &str) -> Arc<Mutex<ProviderLedger>> {
        {
            let entries = self.entries.read().expect("Ledger map lock poisoned");
            if let Some(entry) = entries.get(provider_id) {
                return Arc::clone(entry);
            }
        }

        let mut entries = self.entries.write().expect("Ledger map lock poisoned");
        Arc::clone(entries.entry(provider_id.to_string()).or_default())
    }

    /// Run `f` with exclusive access to one provider's ledger entry.
    ///
    /// All reservation-path mutations go through here, so two concurrent
    /// requests for the same provider observe each other's effects in
    /// full. Requests for different providers do not contend.
    pub fn with_entry<T>(
        &self,
        provider_id: &str,
        f: impl FnOnce(&mut ProviderLedger) -> T,
    ) -> T {
        let entry = self.entry(provider_id);
        let mut guard = entry.lock().expect("Ledger entry lock poisoned");
        f(&mut guard)
    }

    /// Rebuild a provider's entry from persisted state at startup.
    pub fn hydrate(&self, provider: &Provider, active_bookings: &[Booking]) {
        self.with_entry(&provider.id, |entry| {
            entry.set_token_count(provider.current_token_count);
            for booking in active_bookings {
                entry.reserve(&booking.slot);
            }
        });
        tracing::debug!(
            provider_id = %provider.id,
            reserved = active_bookings.len(),
            tokens = provider.current_token_count,
            "hydrated provider ledger"
        );
    }

    /// Zero every provider's token counter. Returns how many entries were
    /// touched. Safe to call repeatedly.
    pub fn reset_all(&self) -> usize {
        let entries = self.entries.read().expect("Ledger map lock poisoned");
        for entry in entries.values() {
            entry
                .lock()
                .expect("Ledger entry lock poisoned")
                .reset_tokens();
        }
        entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SlotKey;
    use chrono::{NaiveDate, NaiveTime};
    use std::thread;

    fn slot(hour: u32) -> SlotKey {
        SlotKey::new(
            NaiveDate::from_ymd_opt(2025, 6, 2).expect("Valid date"),
            NaiveTime::from_hms_opt(hour, 0, 0).expect("Valid time"),
        )
    }

    #[test]
    fn test_entries_are_isolated_per_provider() {
        let ledger = SlotLedger::new();
        assert!(ledger.with_entry("prov-1", |e| e.reserve(&slot(10))));
        // Same slot under a different provider is independent.
        assert!(ledger.with_entry("prov-2", |e| e.reserve(&slot(10))));
        assert!(!ledger.with_entry("prov-1", |e| e.reserve(&slot(10))));
    }

    #[test]
    fn test_hydrate_restores_state() {
        let ledger = SlotLedger::new();
        let mut provider = Provider::new("prov-1", "Dr. Adjei");
        provider.current_token_count = 4;

        let booking = Booking::new(
            "prov-1",
            "pat-1",
            slot(10),
            crate::domain::EffectiveScore::structured(Default::default()),
            4,
        );
        ledger.hydrate(&provider, &[booking]);

        assert!(!ledger.with_entry("prov-1", |e| e.reserve(&slot(10))));
        assert_eq!(ledger.with_entry("prov-1", |e| e.next_token()), 5);
    }

    #[test]
    fn test_reset_all_is_idempotent() {
        let ledger = SlotLedger::new();
        ledger.with_entry("prov-1", |e| {
            e.next_token();
            e.next_token()
        });
        ledger.with_entry("prov-2", |e| e.next_token());

        assert_eq!(ledger.reset_all(), 2);
        assert_eq!(ledger.reset_all(), 2);
        assert_eq!(ledger.with_entry("prov-1", |e| e.token_count()), 0);
        assert_eq!(ledger.with_entry("prov-2", |e| e.token_count()), 0);
    }

    #[test]
    fn test_concurrent_reservations_admit_exactly_one() {
        let ledger = Arc::new(SlotLedger::new());
        let threads = 16;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.with_entry("prov-1", |e| e.reserve(&slot(10))))
            })
            .collect();

        let results: Vec<bool> = handles
            .into_iter()
            .map(|h| h.join().expect("Thread should finish"))
            .collect();

        assert_eq!(results.iter().filter(|&&won| won).count(), 1);
        assert_eq!(
            ledger.with_entry("prov-1", |e| e.reserved_count()),
            1,
            "Exactly one reservation should exist afterward"
        );
    }
}

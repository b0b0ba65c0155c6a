//! Storage port: Trait for persistent storage operations.
//!
//! This trait abstracts the persistence engine from the booking and queue
//! logic. The coordinator treats it as the system of record; the in-memory
//! slot ledger is hydrated from it at startup.

use chrono::NaiveDate;

use crate::domain::{Booking, Provider};

/// Trait for persistence operations.
pub trait Storage: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert or replace a provider record.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn save_provider(&self, provider: &Provider) -> Result<(), Self::Error>;

    /// Load a provider by id.
    ///
    /// # Returns
    /// `None` if the provider is unknown.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn load_provider(&self, provider_id: &str) -> Result<Option<Provider>, Self::Error>;

    /// Load every provider record.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn list_providers(&self) -> Result<Vec<Provider>, Self::Error>;

    /// Persist a provider's current token counter.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn update_provider_tokens(&self, provider_id: &str, count: u32) -> Result<(), Self::Error>;

    /// Zero every provider's token counter (the daily epoch reset).
    ///
    /// # Returns
    /// The number of provider rows updated.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn reset_all_tokens(&self) -> Result<usize, Self::Error>;

    /// Insert a new booking.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn save_booking(&self, booking: &Booking) -> Result<(), Self::Error>;

    /// Update an existing booking (status change or rescoring).
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn update_booking(&self, booking: &Booking) -> Result<(), Self::Error>;

    /// Remove a booking row entirely.
    ///
    /// Used only to compensate a partially persisted reservation; regular
    /// cancellation keeps the row and flips its flag.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn delete_booking(&self, booking_id: &str) -> Result<(), Self::Error>;

    /// Load a booking by id.
    ///
    /// # Returns
    /// `None` if the booking is unknown.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn load_booking(&self, booking_id: &str) -> Result<Option<Booking>, Self::Error>;

    /// Load the active (not cancelled, not completed) bookings for a
    /// provider, optionally restricted to one calendar date, in creation
    /// order.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn active_bookings(
        &self,
        provider_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, Self::Error>;

    /// Load every booking belonging to a patient, newest first.
    ///
    /// # Errors
    /// Returns error if the storage operation fails.
    fn bookings_for_patient(&self, patient_id: &str) -> Result<Vec<Booking>, Self::Error>;
}

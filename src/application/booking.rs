//! Booking coordinator: orchestrates one reservation end to end.
//!
//! This service coordinates:
//! - Request validation
//! - Priority scoring from health signals
//! - Slot reservation under the provider's ledger lock
//! - Persistence of the booking and token counter
//! - Best-effort queue-change notifications
//!
//! Rejections a caller can act on (slot taken, provider unavailable, daily
//! cap reached) are returned as [`ReserveOutcome`] values, not errors;
//! only infrastructure failures surface as `Err`.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::adapters::StorageError;
use crate::application::ledger::SlotLedger;
use crate::domain::{
    compute_score, Booking, EffectiveScore, HealthSignals, SlotKey,
};
use crate::ports::{ImageClassifier, Notifier, QueueEvent, Storage, Topic};
use crate::VitalQueueError;

/// One reservation request.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub provider_id: String,
    pub patient_id: String,
    pub slot: SlotKey,

    /// Health intake for scoring; absent signals score LOW/0
    pub signals: Option<HealthSignals>,
}

/// Result of a reservation attempt.
///
/// The rejection variants are expected outcomes the caller presents to the
/// user, so they are data rather than errors.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// The slot was reserved and the booking persisted.
    Booked(Booking),

    /// The (date, time) pair is already reserved for this provider.
    SlotConflict,

    /// The provider is switched off or explicitly unavailable.
    ProviderUnavailable,

    /// The provider's daily token cap is exhausted.
    CapacityExceeded,
}

/// Service that owns the booking lifecycle.
pub struct BookingCoordinator<S, C, N>
where
    S: Storage,
    C: ImageClassifier,
    N: Notifier,
{
    storage: Arc<S>,
    classifier: Arc<C>,
    notifier: Arc<N>,
    ledger: SlotLedger,
}

impl<S, C, N> BookingCoordinator<S, C, N>
where
    S: Storage,
    C: ImageClassifier,
    N: Notifier,
    S::Error: Into<StorageError>,
{
    /// Create a coordinator and hydrate the slot ledger from storage.
    ///
    /// # Errors
    /// Returns error if persisted providers or bookings cannot be read.
    pub fn new(
        storage: Arc<S>,
        classifier: Arc<C>,
        notifier: Arc<N>,
    ) -> Result<Self, VitalQueueError> {
        let ledger = SlotLedger::new();

        for provider in storage.list_providers().map_err(storage_err)? {
            let active = storage
                .active_bookings(&provider.id, None)
                .map_err(storage_err)?;
            ledger.hydrate(&provider, &active);
        }

        Ok(Self {
            storage,
            classifier,
            notifier,
            ledger,
        })
    }

    /// Register a provider and prepare its ledger entry.
    ///
    /// # Errors
    /// Returns error if the provider cannot be persisted.
    pub fn register_provider(
        &self,
        provider: &crate::domain::Provider,
    ) -> Result<(), VitalQueueError> {
        self.storage.save_provider(provider).map_err(storage_err)?;
        self.ledger.hydrate(provider, &[]);
        tracing::info!(provider_id = %provider.id, "registered provider");
        Ok(())
    }

    /// Attempt to reserve a slot.
    ///
    /// The availability, capacity, and conflict checks plus the ledger
    /// mutation form one atomic unit per provider: they all run under that
    /// provider's entry lock, and the in-memory reservation is applied
    /// only after the booking row and token counter are persisted. A
    /// storage failure therefore leaves the ledger untouched.
    ///
    /// # Errors
    /// Returns `Validation` for malformed or unknown ids, `Storage` for
    /// infrastructure failures. Slot/capacity/availability rejections are
    /// `Ok` outcomes.
    pub fn reserve_slot(
        &self,
        request: ReservationRequest,
    ) -> Result<ReserveOutcome, VitalQueueError> {
        if request.provider_id.trim().is_empty() {
            return Err(VitalQueueError::Validation("empty provider id".to_string()));
        }
        if request.patient_id.trim().is_empty() {
            return Err(VitalQueueError::Validation("empty patient id".to_string()));
        }

        let provider = self
            .storage
            .load_provider(&request.provider_id)
            .map_err(storage_err)?
            .ok_or_else(|| {
                VitalQueueError::Validation(format!(
                    "unknown provider {}",
                    request.provider_id
                ))
            })?;

        if !provider.accepts_bookings() {
            tracing::info!(provider_id = %provider.id, status = %provider.status, "rejected booking: provider unavailable");
            return Ok(ReserveOutcome::ProviderUnavailable);
        }

        // Scoring is pure; keep it outside the lock.
        let signals = request.signals.unwrap_or_default();
        let score = compute_score(&signals);
        let severity = EffectiveScore::structured(score);

        let outcome = self.ledger.with_entry(&provider.id, |entry| {
            if entry.token_count() >= provider.daily_token_cap {
                tracing::info!(
                    provider_id = %provider.id,
                    cap = provider.daily_token_cap,
                    "rejected booking: daily token cap reached"
                );
                return Ok(ReserveOutcome::CapacityExceeded);
            }

            if entry.is_booked(&request.slot) {
                tracing::info!(
                    provider_id = %provider.id,
                    slot = %request.slot,
                    "rejected booking: slot already reserved"
                );
                return Ok(ReserveOutcome::SlotConflict);
            }

            let token = entry.token_count() + 1;
            let booking = Booking::new(
                provider.id.clone(),
                request.patient_id.clone(),
                request.slot,
                severity.clone(),
                token,
            );

            self.storage.save_booking(&booking).map_err(storage_err)?;
            if let Err(e) = self.storage.update_provider_tokens(&provider.id, token) {
                // Compensate the half-written reservation before bailing.
                if let Err(del) = self.storage.delete_booking(&booking.id) {
                    let del: StorageError = del.into();
                    tracing::error!(
                        booking_id = %booking.id,
                        error = %del,
                        "orphaned booking row after failed token update"
                    );
                }
                return Err(storage_err(e));
            }

            let fresh = entry.reserve(&request.slot);
            debug_assert!(fresh, "slot checked free under the same lock");
            entry.next_token();

            Ok(ReserveOutcome::Booked(booking))
        })?;

        if let ReserveOutcome::Booked(booking) = &outcome {
            tracing::info!(
                booking_id = %booking.id,
                provider_id = %booking.provider_id,
                token = booking.token_number,
                score = booking.effective_score(),
                level = %booking.level(),
                "booking created"
            );

            let event = QueueEvent::QueueChanged {
                provider_id: booking.provider_id.clone(),
                reason: "booking created".to_string(),
            };
            self.notify(&Topic::provider_queue(booking.provider_id.as_str()), &event);
            self.notify(&Topic::patient(booking.patient_id.as_str()), &event);
        }

        Ok(outcome)
    }

    /// Cancel a booking and free its slot.
    ///
    /// Cancelling twice is a no-op. The token counter is not decremented;
    /// tokens are never reissued within a day epoch.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown ids and `Validation` when the
    /// booking is already completed.
    pub fn cancel(&self, booking_id: &str) -> Result<(), VitalQueueError> {
        let mut booking = self
            .storage
            .load_booking(booking_id)
            .map_err(storage_err)?
            .ok_or_else(|| VitalQueueError::NotFound(format!("booking {booking_id}")))?;

        if booking.cancelled {
            return Ok(());
        }
        if booking.completed {
            return Err(VitalQueueError::Validation(
                "cannot cancel a completed booking".to_string(),
            ));
        }

        booking.cancelled = true;

        self.ledger
            .with_entry(&booking.provider_id, |entry| -> Result<(), VitalQueueError> {
                self.storage.update_booking(&booking).map_err(storage_err)?;
                entry.release(&booking.slot);
                Ok(())
            })?;

        tracing::info!(
            booking_id = %booking.id,
            provider_id = %booking.provider_id,
            slot = %booking.slot,
            "booking cancelled, slot released"
        );

        self.notify(
            &Topic::provider_queue(booking.provider_id.as_str()),
            &QueueEvent::QueueChanged {
                provider_id: booking.provider_id.clone(),
                reason: "booking cancelled".to_string(),
            },
        );
        self.notify(
            &Topic::patient(booking.patient_id.as_str()),
            &QueueEvent::BookingCancelled {
                booking_id: booking.id.clone(),
                provider_id: booking.provider_id.clone(),
            },
        );

        Ok(())
    }

    /// Mark a booking completed, removing it from the queue.
    ///
    /// The slot stays consumed and the token is not reissued.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown ids and `Validation` for cancelled
    /// bookings.
    pub fn complete(&self, booking_id: &str) -> Result<(), VitalQueueError> {
        let mut booking = self
            .storage
            .load_booking(booking_id)
            .map_err(storage_err)?
            .ok_or_else(|| VitalQueueError::NotFound(format!("booking {booking_id}")))?;

        if booking.completed {
            return Ok(());
        }
        if booking.cancelled {
            return Err(VitalQueueError::Validation(
                "cannot complete a cancelled booking".to_string(),
            ));
        }

        booking.completed = true;
        self.storage.update_booking(&booking).map_err(storage_err)?;

        tracing::info!(booking_id = %booking.id, "booking completed");

        self.notify(
            &Topic::provider_queue(booking.provider_id.as_str()),
            &QueueEvent::QueueChanged {
                provider_id: booking.provider_id.clone(),
                reason: "booking completed".to_string(),
            },
        );

        Ok(())
    }

    /// Rescore a booking with an image-based severity assessment.
    ///
    /// A classifier failure or timeout degrades to "no image score": the
    /// booking keeps its structured severity and the call still succeeds.
    /// An accepted override is logged with the computed value, the
    /// override value, and the reason.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown ids, `Validation` for inactive
    /// bookings, `Storage` if persisting the rescore fails.
    pub fn apply_image_assessment(
        &self,
        booking_id: &str,
        image: &[u8],
    ) -> Result<Booking, VitalQueueError> {
        let mut booking = self
            .storage
            .load_booking(booking_id)
            .map_err(storage_err)?
            .ok_or_else(|| VitalQueueError::NotFound(format!("booking {booking_id}")))?;

        if !booking.is_active() {
            return Err(VitalQueueError::Validation(
                "cannot rescore an inactive booking".to_string(),
            ));
        }

        let assessment = match self.classifier.classify(image) {
            Ok(assessment) => assessment,
            Err(e) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    error = %e,
                    "image classification unavailable, keeping structured score"
                );
                return Ok(booking);
            }
        };

        tracing::debug!(
            booking_id = %booking.id,
            image_score = assessment.score,
            label = %assessment.label,
            "image assessment received"
        );

        let severity =
            EffectiveScore::with_image(booking.severity.computed.clone(), assessment.score);

        if let Some(decision) = &severity.override_decision {
            tracing::info!(
                booking_id = %booking.id,
                computed = decision.computed,
                overridden = decision.overridden,
                reason = %decision.reason,
                "image severity override applied"
            );
        }

        booking.severity = severity;
        self.storage.update_booking(&booking).map_err(storage_err)?;

        let event = QueueEvent::PriorityUpdated {
            booking_id: booking.id.clone(),
            provider_id: booking.provider_id.clone(),
            score: booking.effective_score(),
            level: booking.level(),
        };
        self.notify(&Topic::provider_queue(booking.provider_id.as_str()), &event);
        self.notify(&Topic::patient(booking.patient_id.as_str()), &event);

        Ok(booking)
    }

    /// Zero every provider's token counter (the daily epoch reset).
    ///
    /// Idempotent; returns the number of provider rows updated.
    ///
    /// # Errors
    /// Returns error if the bulk update fails.
    pub fn reset_tokens(&self) -> Result<usize, VitalQueueError> {
        let updated = self.storage.reset_all_tokens().map_err(storage_err)?;
        self.ledger.reset_all();
        tracing::info!(providers = updated, "daily token reset complete");
        Ok(updated)
    }

    /// Earliest unreserved slot for a provider within the search window.
    ///
    /// Used for walk-in emergency placement; the caller follows up with
    /// a normal [`Self::reserve_slot`], which re-checks under the lock.
    #[must_use]
    pub fn earliest_open_slot(&self, provider_id: &str, from: NaiveDate) -> Option<SlotKey> {
        self.ledger
            .with_entry(provider_id, |entry| entry.earliest_open_slot(from))
    }

    fn notify(&self, topic: &Topic, event: &QueueEvent) {
        if let Err(e) = self.notifier.publish(topic, event) {
            tracing::warn!(topic = %topic, error = %e, "queue event publish failed");
        }
    }
}

fn storage_err<E: Into<StorageError>>(e: E) -> VitalQueueError {
    VitalQueueError::Storage(e.into())
}

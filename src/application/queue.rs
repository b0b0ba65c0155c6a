//! Queue service: storage-backed queue projections.
//!
//! Thin orchestration over the pure projector in `domain::queue`: load the
//! provider (for its average consultation time) and its active bookings,
//! project, return. Every call recomputes the order from scratch.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::adapters::StorageError;
use crate::domain::{position_of, project, QueueEntry};
use crate::ports::Storage;
use crate::VitalQueueError;

/// A projected queue for one provider, optionally restricted to one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueView {
    pub provider_id: String,
    pub date: Option<NaiveDate>,
    pub entries: Vec<QueueEntry>,
}

impl QueueView {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-side service for queue views and single-booking standing.
pub struct QueueService<S: Storage> {
    storage: Arc<S>,
}

impl<S> QueueService<S>
where
    S: Storage,
    S::Error: Into<StorageError>,
{
    #[must_use]
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Project the current queue for a provider.
    ///
    /// # Errors
    /// Returns `Validation` for unknown providers, `Storage` on
    /// infrastructure failures.
    pub fn queue_for(
        &self,
        provider_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<QueueView, VitalQueueError> {
        let provider = self
            .storage
            .load_provider(provider_id)
            .map_err(storage_err)?
            .ok_or_else(|| {
                VitalQueueError::Validation(format!("unknown provider {provider_id}"))
            })?;

        let bookings = self
            .storage
            .active_bookings(provider_id, date)
            .map_err(storage_err)?;
        let entries = project(&bookings, provider.avg_consult_minutes);

        tracing::debug!(
            provider_id,
            total = entries.len(),
            "projected provider queue"
        );

        Ok(QueueView {
            provider_id: provider_id.to_string(),
            date,
            entries,
        })
    }

    /// Where one booking currently stands in its provider's queue.
    ///
    /// Returns `None` once the booking has been cancelled or completed.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown booking ids.
    pub fn booking_position(
        &self,
        booking_id: &str,
    ) -> Result<Option<QueueEntry>, VitalQueueError> {
        let booking = self
            .storage
            .load_booking(booking_id)
            .map_err(storage_err)?
            .ok_or_else(|| VitalQueueError::NotFound(format!("booking {booking_id}")))?;

        if !booking.is_active() {
            return Ok(None);
        }

        let provider = self
            .storage
            .load_provider(&booking.provider_id)
            .map_err(storage_err)?
            .ok_or_else(|| {
                VitalQueueError::NotFound(format!("provider {}", booking.provider_id))
            })?;

        let bookings = self
            .storage
            .active_bookings(&booking.provider_id, None)
            .map_err(storage_err)?;

        Ok(position_of(
            &bookings,
            booking_id,
            provider.avg_consult_minutes,
        ))
    }
}

fn storage_err<E: Into<StorageError>>(e: E) -> VitalQueueError {
    VitalQueueError::Storage(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteStorage;
    use crate::domain::{
        compute_score, Booking, EffectiveScore, HealthSignals, Provider, SlotKey, Vitals,
    };
    use chrono::{NaiveTime, Utc};

    fn storage_with_provider() -> Arc<SqliteStorage> {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        let mut provider = Provider::new("prov-1", "Dr. Owusu");
        provider.avg_consult_minutes = 20;
        storage.save_provider(&provider).expect("Should save");
        storage
    }

    fn booking_with_spo2(
        storage: &SqliteStorage,
        patient: &str,
        hour: u32,
        spo2: Option<f64>,
        offset_secs: i64,
    ) -> Booking {
        let signals = HealthSignals {
            vitals: Vitals {
                spo2,
                ..Vitals::default()
            },
            ..HealthSignals::default()
        };
        let mut booking = Booking::new(
            "prov-1",
            patient,
            SlotKey::new(
                NaiveDate::from_ymd_opt(2025, 6, 2).expect("Valid date"),
                NaiveTime::from_hms_opt(hour, 0, 0).expect("Valid time"),
            ),
            EffectiveScore::structured(compute_score(&signals)),
            1,
        );
        booking.created_at = Utc::now() + chrono::Duration::seconds(offset_secs);
        storage.save_booking(&booking).expect("Should save");
        booking
    }

    #[test]
    fn test_queue_for_orders_and_annotates() {
        let storage = storage_with_provider();
        let service = QueueService::new(Arc::clone(&storage));

        let mild = booking_with_spo2(&storage, "pat-mild", 10, None, 0);
        let low_oxygen = booking_with_spo2(&storage, "pat-low-o2", 11, Some(89.0), 1);

        let view = service.queue_for("prov-1", None).expect("Should project");
        assert_eq!(view.len(), 2);
        assert_eq!(view.entries[0].booking.id, low_oxygen.id);
        assert_eq!(view.entries[0].position, 1);
        assert_eq!(view.entries[0].eta.minutes, 0);
        assert_eq!(view.entries[1].booking.id, mild.id);
        // Second position waits one average consultation (20 minutes).
        assert_eq!(view.entries[1].eta.minutes, 20);
    }

    #[test]
    fn test_queue_for_unknown_provider() {
        let storage = storage_with_provider();
        let service = QueueService::new(storage);
        assert!(matches!(
            service.queue_for("ghost", None),
            Err(VitalQueueError::Validation(_))
        ));
    }

    #[test]
    fn test_booking_position_tracks_standing() {
        let storage = storage_with_provider();
        let service = QueueService::new(Arc::clone(&storage));

        let mild = booking_with_spo2(&storage, "pat-mild", 10, None, 0);
        booking_with_spo2(&storage, "pat-low-o2", 11, Some(89.0), 1);

        let entry = service
            .booking_position(&mild.id)
            .expect("Should query")
            .expect("Should be queued");
        assert_eq!(entry.position, 2);
        assert_eq!(entry.eta.minutes, 20);
    }

    #[test]
    fn test_booking_position_none_when_inactive() {
        let storage = storage_with_provider();
        let service = QueueService::new(Arc::clone(&storage));

        let mut booking = booking_with_spo2(&storage, "pat-1", 10, None, 0);
        booking.cancelled = true;
        storage.update_booking(&booking).expect("Should update");

        assert!(service
            .booking_position(&booking.id)
            .expect("Should query")
            .is_none());

        assert!(matches!(
            service.booking_position("ghost"),
            Err(VitalQueueError::NotFound(_))
        ));
    }
}

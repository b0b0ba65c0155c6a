//! Notifier port: Trait for queue-change event publication.
//!
//! Publication is best-effort and at-most-once. A failed publish is a
//! logged, detached side effect; it must never fail or roll back the
//! booking operation that triggered it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriorityLevel;

/// A notification topic.
///
/// Providers listen on their queue topic; patients on their personal one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// All queue changes for one provider
    ProviderQueue(String),
    /// Events about one patient's own bookings
    Patient(String),
}

impl Topic {
    #[must_use]
    pub fn provider_queue(provider_id: impl Into<String>) -> Self {
        Self::ProviderQueue(provider_id.into())
    }

    #[must_use]
    pub fn patient(patient_id: impl Into<String>) -> Self {
        Self::Patient(patient_id.into())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderQueue(id) => write!(f, "provider-queue:{id}"),
            Self::Patient(id) => write!(f, "patient:{id}"),
        }
    }
}

/// Queue-state-change events fanned out to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    /// The projected order for a provider changed.
    QueueChanged {
        provider_id: String,
        reason: String,
    },

    /// A booking's severity was rescored (image assessment applied).
    PriorityUpdated {
        booking_id: String,
        provider_id: String,
        score: u8,
        level: PriorityLevel,
    },

    /// A booking left the queue.
    BookingCancelled {
        booking_id: String,
        provider_id: String,
    },
}

/// Error type for notification transport failures.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),
}

/// Trait for publishing queue events.
pub trait Notifier: Send + Sync {
    /// Publish an event to a topic's current subscribers.
    ///
    /// Delivery is at-most-once; subscribers that joined after the call
    /// see nothing.
    ///
    /// # Errors
    /// Returns [`NotifyError`] when the transport itself is down. Callers
    /// log and continue.
    fn publish(&self, topic: &Topic, event: &QueueEvent) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_rendering() {
        assert_eq!(
            Topic::provider_queue("prov-9").to_string(),
            "provider-queue:prov-9"
        );
        assert_eq!(Topic::patient("pat-4").to_string(), "patient:pat-4");
    }

    #[test]
    fn test_event_serialization_tags() {
        let event = QueueEvent::QueueChanged {
            provider_id: "prov-1".into(),
            reason: "booking created".into(),
        };
        let json = serde_json::to_string(&event).expect("Should serialize");
        assert!(json.contains("\"queue_changed\""));
        assert!(json.contains("\"prov-1\""));
    }
}

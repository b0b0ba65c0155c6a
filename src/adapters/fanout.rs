//! In-process notification fan-out: Implementation of Notifier.
//!
//! Subscribers register a channel per topic; `publish` pushes the event to
//! every live subscriber and silently drops the ones that have gone away.
//! Delivery is at-most-once and never blocks the caller.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::ports::{Notifier, NotifyError, QueueEvent, Topic};

/// Channel-based fan-out for queue events.
#[derive(Default)]
pub struct ChannelFanout {
    subscribers: Mutex<HashMap<String, Vec<Sender<QueueEvent>>>>,
}

impl ChannelFanout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self, topic: &Topic) -> Receiver<QueueEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .expect("Fanout lock poisoned")
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Current live subscriber count for a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers
            .lock()
            .expect("Fanout lock poisoned")
            .get(&topic.to_string())
            .map_or(0, Vec::len)
    }
}

impl Notifier for ChannelFanout {
    fn publish(&self, topic: &Topic, event: &QueueEvent) -> Result<(), NotifyError> {
        let mut subscribers = self.subscribers.lock().expect("Fanout lock poisoned");

        if let Some(senders) = subscribers.get_mut(&topic.to_string()) {
            // Disconnected receivers are pruned on the way through.
            senders.retain(|tx| tx.send(event.clone()).is_ok());
            tracing::debug!(
                topic = %topic,
                delivered = senders.len(),
                "published queue event"
            );
        }

        Ok(())
    }
}

//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the queue engine and external systems (persistence, image
//! classifier, notification transport).

mod classifier;
mod notifier;
mod storage;

pub use classifier::{ClassifierError, ImageAssessment, ImageClassifier};
pub use notifier::{Notifier, NotifyError, QueueEvent, Topic};
pub use storage::Storage;

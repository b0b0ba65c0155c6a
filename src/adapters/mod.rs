//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the integrations behind the trait seams:
//! - `sqlite`: SQLite persistence for providers and bookings
//! - `fanout`: in-process channel fan-out of queue events
//! - `classifier`: image classifier adapters and the deadline wrapper
//! - `sanitize`: PII filtering for logs

pub mod classifier;
pub mod fanout;
pub mod sanitize;
pub mod sqlite;

pub use classifier::{FixedClassifier, NullClassifier, TimeoutClassifier};
pub use fanout::ChannelFanout;
pub use sanitize::SanitizingMakeWriter;
pub use sqlite::{SqliteStorage, StorageError};

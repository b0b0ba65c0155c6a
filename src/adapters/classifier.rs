//! Classifier adapters: concrete ImageClassifier implementations.
//!
//! The engine treats image classification as optional and unreliable.
//! [`TimeoutClassifier`] puts a hard deadline on any inner classifier by
//! running it on a worker thread and abandoning the wait on expiry; the
//! abandoned worker finishes into a dropped channel.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::ports::{ClassifierError, ImageAssessment, ImageClassifier};

/// Default classification deadline in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 3000;

const TIMEOUT_ENV: &str = "VITALQUEUE_CLASSIFIER_TIMEOUT_MS";

/// Classifier for deployments without an image model: always unavailable.
///
/// The booking path degrades this to "no image score".
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClassifier;

impl ImageClassifier for NullClassifier {
    fn classify(&self, _image: &[u8]) -> Result<ImageAssessment, ClassifierError> {
        Err(ClassifierError::Unavailable(
            "no image classifier configured".to_string(),
        ))
    }
}

/// Classifier returning a fixed assessment. Test and demo use.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    assessment: ImageAssessment,
}

impl FixedClassifier {
    #[must_use]
    pub fn new(score: u8, label: impl Into<String>) -> Self {
        Self {
            assessment: ImageAssessment {
                score,
                label: label.into(),
            },
        }
    }
}

impl ImageClassifier for FixedClassifier {
    fn classify(&self, image: &[u8]) -> Result<ImageAssessment, ClassifierError> {
        if image.is_empty() {
            return Err(ClassifierError::InvalidImage("empty payload".to_string()));
        }
        Ok(self.assessment.clone())
    }
}

/// Deadline wrapper around any classifier.
pub struct TimeoutClassifier<C> {
    inner: Arc<C>,
    timeout: Duration,
}

impl<C> TimeoutClassifier<C> {
    #[must_use]
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }

    /// Build with the deadline from `VITALQUEUE_CLASSIFIER_TIMEOUT_MS`
    /// (milliseconds, default 3000).
    #[must_use]
    pub fn from_env(inner: C) -> Self {
        let timeout_ms = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self::new(inner, Duration::from_millis(timeout_ms))
    }
}

impl<C> ImageClassifier for TimeoutClassifier<C>
where
    C: ImageClassifier + 'static,
{
    fn classify(&self, image: &[u8]) -> Result<ImageAssessment, ClassifierError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let image = image.to_vec();

        thread::spawn(move || {
            let _ = tx.send(inner.classify(&image));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "image classification missed its deadline"
                );
                Err(ClassifierError::Timeout)
            }
        }
    }
}

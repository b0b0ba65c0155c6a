//! Image classifier port: Trait for external severity assessment.
//!
//! The classifier is an optional collaborator that scores a wound or
//! symptom photo. It sits behind this trait so the booking path can treat
//! a missing, failing, or slow classifier identically: no image score.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity assessment produced from an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAssessment {
    /// Severity score, 0-100
    pub score: u8,

    /// Short classification label ("mild laceration", "severe burn", ...)
    pub label: String,
}

/// Error type for classifier operations.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier did not answer within its deadline.
    #[error("Image classification timed out")]
    Timeout,

    /// No classifier is configured or the service is down.
    #[error("Image classifier unavailable: {0}")]
    Unavailable(String),

    /// The input could not be interpreted as an image.
    #[error("Invalid image payload: {0}")]
    InvalidImage(String),
}

/// Trait for image-based severity scoring.
///
/// Implementations must be deadline-bounded or wrapped in
/// [`crate::adapters::TimeoutClassifier`]; callers degrade any error to
/// "no image score" rather than failing the booking path.
pub trait ImageClassifier: Send + Sync {
    /// Score an image.
    ///
    /// # Errors
    /// Returns [`ClassifierError`] when the assessment cannot be produced.
    fn classify(&self, image: &[u8]) -> Result<ImageAssessment, ClassifierError>;
}

//! Health intake types used as input to the triage score model.
//!
//! A [`HealthSignals`] value captures everything a patient reports at
//! booking time. Every field is optional in spirit: the `Default` value
//! means "nothing reported" and scores zero.

use serde::{Deserialize, Serialize};

/// Vital sign measurements.
///
/// `None` means the measurement was not taken. This matters for scoring:
/// an absent reading contributes nothing, while a genuinely low reading
/// (hypotension, bradycardia, hypothermia) adds to the severity sub-score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vitals {
    /// Systolic blood pressure in mmHg
    pub systolic_bp: Option<f64>,

    /// Diastolic blood pressure in mmHg
    pub diastolic_bp: Option<f64>,

    /// Oxygen saturation in percent (typically 85-100)
    pub spo2: Option<f64>,

    /// Heart rate in beats per minute
    pub heart_rate: Option<f64>,

    /// Body temperature in degrees Fahrenheit
    pub temperature: Option<f64>,

    /// Blood glucose in mg/dL
    pub sugar_level: Option<f64>,
}

/// Chronic condition flags from the patient's health profile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChronicConditions {
    pub diabetes: bool,
    pub hypertension: bool,
    pub asthma: bool,
    pub heart_disease: bool,
    pub kidney_disease: bool,
    pub cancer: bool,
    pub stroke_history: bool,
}

/// Unit for a reported symptom duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

/// How long the presenting symptoms have lasted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SymptomDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

/// High-risk medication flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RiskMedications {
    pub blood_thinners: bool,
    pub chemotherapy: bool,
    pub steroids: bool,
    pub insulin: bool,
}

/// Relevant medical history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalHistory {
    /// Hospitalized within the recent lookback window
    pub recent_hospitalization: bool,

    /// Any prior ICU admission
    pub icu_history: bool,

    /// Past surgeries, one entry per procedure
    pub surgeries: Vec<String>,

    /// Known allergies
    pub allergies: Vec<String>,

    /// Complications in a current or past pregnancy
    pub pregnancy_complications: Vec<String>,

    /// Medications that raise triage risk
    pub medications: RiskMedications,
}

/// Complete health intake for one booking request.
///
/// Immutable per scoring call; the score model never mutates its input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthSignals {
    pub vitals: Vitals,

    /// Free-form symptom tags, matched case-insensitively against the
    /// critical symptom list
    pub symptom_tags: Vec<String>,

    pub conditions: ChronicConditions,

    /// Self-reported pain on a 0-10 scale
    pub pain_level: u8,

    /// How long the symptoms have been present
    pub duration: Option<SymptomDuration>,

    /// Symptoms appeared suddenly
    pub sudden: bool,

    /// Symptoms are getting worse
    pub worsening: bool,

    pub fever: bool,

    pub bleeding: bool,

    pub breathing_difficulty: bool,

    pub pregnancy_status: bool,

    /// Age in years. `Some(0)` is a valid infant age; `None` means
    /// unknown and contributes nothing to the age sub-score.
    pub age: Option<u32>,

    pub history: MedicalHistory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_signals_are_empty() {
        let signals = HealthSignals::default();
        assert!(signals.vitals.spo2.is_none());
        assert!(signals.symptom_tags.is_empty());
        assert_eq!(signals.pain_level, 0);
        assert!(signals.age.is_none());
        assert!(!signals.breathing_difficulty);
        assert!(signals.history.surgeries.is_empty());
    }

    #[test]
    fn test_duration_unit_serde_roundtrip() {
        let duration = SymptomDuration {
            value: 3,
            unit: DurationUnit::Weeks,
        };
        let json = serde_json::to_string(&duration).expect("Should serialize");
        assert!(json.contains("\"weeks\""));
        let back: SymptomDuration = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(back.unit, DurationUnit::Weeks);
        assert_eq!(back.value, 3);
    }
}

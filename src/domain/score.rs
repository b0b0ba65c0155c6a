//! Triage priority score model.
//!
//! Pure, deterministic scoring of [`HealthSignals`] into a 0-100 priority
//! score with a canonical severity level. Six weighted sub-scores are
//! computed independently, clamped to [0, 100], then combined:
//!
//! severity 0.35 | chronic 0.20 | symptom 0.20 | age 0.10 | vitals 0.10 | history 0.05
//!
//! An optional image-based severity score can be blended in afterwards;
//! see [`EffectiveScore`].

use serde::{Deserialize, Serialize};

use crate::domain::signals::{DurationUnit, HealthSignals};

/// Symptom tags that mark an intake as immediately critical.
///
/// Matched as lowercase substrings, so "crushing chest pain" hits
/// "chest pain".
const CRITICAL_SYMPTOMS: [&str; 10] = [
    "chest pain",
    "heart attack",
    "stroke",
    "seizure",
    "unconscious",
    "severe bleeding",
    "head injury",
    "difficulty breathing",
    "choking",
    "severe burn",
];

const WEIGHT_SEVERITY: f64 = 0.35;
const WEIGHT_CHRONIC: f64 = 0.20;
const WEIGHT_SYMPTOM: f64 = 0.20;
const WEIGHT_AGE: f64 = 0.10;
const WEIGHT_VITALS: f64 = 0.10;
const WEIGHT_HISTORY: f64 = 0.05;

/// Canonical severity level derived from a 0-100 score.
///
/// This is the single severity taxonomy for the whole system. The intake
/// flow historically used a parallel `Low/Medium/High/Emergency` labeling
/// with the same numeric breakpoints; that rendering is available via
/// [`PriorityLevel::legacy_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityLevel {
    /// Routine visit, no urgency indicators
    Low,
    /// Elevated indicators, seen in normal order
    Medium,
    /// Urgent, moved ahead of routine visits
    High,
    /// Top tier: always served before every other level
    Critical,
}

impl PriorityLevel {
    /// Map a 0-100 score onto its level band.
    ///
    /// Bands: >= 76 Critical, >= 51 High, >= 26 Medium, else Low.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        if score >= 76 {
            Self::Critical
        } else if score >= 51 {
            Self::High
        } else if score >= 26 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Hex color for UI badges.
    #[must_use]
    pub fn color_code(&self) -> &'static str {
        match self {
            Self::Low => "#10B981",      // Green
            Self::Medium => "#F59E0B",   // Yellow
            Self::High => "#F97316",     // Orange
            Self::Critical => "#EF4444", // Red
        }
    }

    /// The four-level intake label used by older parts of the system.
    ///
    /// Identical bands; only Critical renders differently ("Emergency").
    #[must_use]
    pub fn legacy_label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Emergency",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low priority - routine consultation",
            Self::Medium => "Medium priority - elevated indicators",
            Self::High => "High priority - urgent attention recommended",
            Self::Critical => "Critical priority - immediate attention required",
        }
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// The six weighted sub-score contributions, kept for auditability.
///
/// Each value is its clamped sub-score times its weight, rounded
/// individually, so the fields may not sum exactly to the final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub severity: u8,
    pub chronic: u8,
    pub symptom: u8,
    pub age: u8,
    pub vitals: u8,
    pub history: u8,
}

/// A computed triage priority score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityScore {
    /// Composite score, 0-100
    pub score: u8,

    /// Level band for `score`
    pub level: PriorityLevel,

    /// Weighted per-factor contributions
    pub breakdown: ScoreBreakdown,
}

impl PriorityScore {
    /// Badge color for this score's level.
    #[must_use]
    pub fn color_code(&self) -> &'static str {
        self.level.color_code()
    }
}

impl Default for PriorityScore {
    fn default() -> Self {
        Self {
            score: 0,
            level: PriorityLevel::Low,
            breakdown: ScoreBreakdown::default(),
        }
    }
}

/// Compute the triage priority score for one health intake.
///
/// Pure and deterministic: identical input always yields identical output,
/// and well-formed input never fails. Missing measurements contribute
/// nothing.
#[must_use]
pub fn compute_score(signals: &HealthSignals) -> PriorityScore {
    let severity = severity_subscore(signals);
    let chronic = chronic_subscore(signals);
    let symptom = symptom_subscore(signals);
    let age = age_subscore(signals);
    let vitals = vitals_subscore(signals);
    let history = history_subscore(signals);

    let composite = severity * WEIGHT_SEVERITY
        + chronic * WEIGHT_CHRONIC
        + symptom * WEIGHT_SYMPTOM
        + age * WEIGHT_AGE
        + vitals * WEIGHT_VITALS
        + history * WEIGHT_HISTORY;

    let score = clamp_to_score(composite);

    PriorityScore {
        score,
        level: PriorityLevel::from_score(score),
        breakdown: ScoreBreakdown {
            severity: clamp_to_score(severity * WEIGHT_SEVERITY),
            chronic: clamp_to_score(chronic * WEIGHT_CHRONIC),
            symptom: clamp_to_score(symptom * WEIGHT_SYMPTOM),
            age: clamp_to_score(age * WEIGHT_AGE),
            vitals: clamp_to_score(vitals * WEIGHT_VITALS),
            history: clamp_to_score(history * WEIGHT_HISTORY),
        },
    }
}

fn clamp_to_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Severity: critical vitals and acute presentation (weight 0.35).
fn severity_subscore(signals: &HealthSignals) -> f64 {
    let mut score: f64 = 0.0;
    let v = &signals.vitals;

    if let Some(spo2) = v.spo2 {
        if spo2 < 92.0 {
            score += 40.0;
        } else if spo2 < 95.0 {
            score += 20.0;
        }
    }

    // The blood pressure bands are mutually exclusive: a hypertensive
    // crisis reading must not also count as stage-2.
    let above = |reading: Option<f64>, limit: f64| reading.map_or(false, |x| x > limit);
    let below = |reading: Option<f64>, limit: f64| reading.map_or(false, |x| x < limit);

    if above(v.systolic_bp, 180.0) || above(v.diastolic_bp, 120.0) {
        score += 35.0;
    } else if above(v.systolic_bp, 140.0) || above(v.diastolic_bp, 90.0) {
        score += 15.0;
    } else if below(v.systolic_bp, 90.0) || below(v.diastolic_bp, 60.0) {
        score += 25.0; // Hypotension
    }

    if let Some(hr) = v.heart_rate {
        if hr > 120.0 || hr < 50.0 {
            score += 20.0;
        } else if hr > 100.0 || hr < 60.0 {
            score += 10.0;
        }
    }

    if let Some(temp) = v.temperature {
        if temp > 103.0 {
            score += 20.0;
        } else if temp > 100.4 {
            score += 10.0;
        } else if temp < 95.0 {
            score += 25.0; // Hypothermia
        }
    }

    if let Some(sugar) = v.sugar_level {
        if sugar > 300.0 {
            score += 15.0;
        } else if sugar < 70.0 {
            score += 20.0;
        }
    }

    if signals.breathing_difficulty {
        score += 45.0;
    }
    if signals.bleeding {
        score += 30.0;
    }
    if signals.fever {
        score += 10.0;
    }

    if signals.pain_level >= 8 {
        score += 25.0;
    } else if signals.pain_level >= 6 {
        score += 15.0;
    } else if signals.pain_level >= 4 {
        score += 8.0;
    }

    if signals.sudden {
        score += 15.0;
    }
    if signals.worsening {
        score += 15.0;
    }

    score.min(100.0)
}

/// Chronic conditions (weight 0.20).
fn chronic_subscore(signals: &HealthSignals) -> f64 {
    let c = &signals.conditions;
    let mut score: f64 = 0.0;

    if c.diabetes {
        score += 6.0;
    }
    if c.hypertension {
        score += 6.0;
    }
    if c.asthma {
        score += 6.0;
    }
    if c.heart_disease {
        score += 10.0;
    }
    if c.kidney_disease {
        score += 8.0;
    }
    if c.cancer {
        score += 12.0;
    }
    if c.stroke_history {
        score += 10.0;
    }

    score.min(100.0)
}

/// Symptom tags and duration (weight 0.20).
fn symptom_subscore(signals: &HealthSignals) -> f64 {
    let mut score = 0.0;

    if !signals.symptom_tags.is_empty() {
        let has_critical = signals.symptom_tags.iter().any(|tag| {
            let tag = tag.to_lowercase();
            CRITICAL_SYMPTOMS.iter().any(|critical| tag.contains(critical))
        });

        if has_critical {
            score += 40.0;
        } else {
            // +5 per distinct complaint, capped
            score += ((signals.symptom_tags.len() * 5) as f64).min(30.0);
        }
    }

    if let Some(duration) = signals.duration {
        match duration.unit {
            DurationUnit::Weeks => score += 10.0,
            DurationUnit::Days if duration.value > 7 => score += 8.0,
            _ => {}
        }
    }

    score.min(100.0)
}

/// Age bracket and pregnancy (weight 0.10).
fn age_subscore(signals: &HealthSignals) -> f64 {
    let mut score: f64 = match signals.age {
        Some(age) if age < 1 => 25.0,  // Infant
        Some(age) if age < 5 => 20.0,  // Toddler
        Some(age) if age < 12 => 15.0, // Child
        Some(age) if age > 75 => 20.0, // Elderly
        Some(age) if age >= 65 => 15.0,
        Some(age) if age >= 50 => 8.0,
        _ => 0.0,
    };

    if signals.pregnancy_status {
        score += 15.0;
    }

    score.min(100.0)
}

/// Moderate vital abnormalities not already counted as severe (weight 0.10).
fn vitals_subscore(signals: &HealthSignals) -> f64 {
    let v = &signals.vitals;
    let mut score: f64 = 0.0;

    if v.spo2.map_or(false, |x| (95.0..97.0).contains(&x)) {
        score += 5.0;
    }
    if v.systolic_bp.map_or(false, |x| (130.0..=140.0).contains(&x)) {
        score += 5.0;
    }
    if v.heart_rate.map_or(false, |x| (90.0..=100.0).contains(&x)) {
        score += 5.0;
    }

    score.min(100.0)
}

/// Hospitalizations, procedures, allergies, risk medications (weight 0.05).
fn history_subscore(signals: &HealthSignals) -> f64 {
    let h = &signals.history;
    let mut score = 0.0;

    if h.recent_hospitalization {
        score += 12.0;
    }
    if h.icu_history {
        score += 10.0;
    }
    if !h.surgeries.is_empty() {
        score += ((h.surgeries.len() * 3) as f64).min(15.0);
    }
    if !h.allergies.is_empty() {
        score += ((h.allergies.len() * 2) as f64).min(10.0);
    }
    if !h.pregnancy_complications.is_empty() {
        score += 15.0;
    }

    let meds = &h.medications;
    if meds.blood_thinners {
        score += 8.0;
    }
    if meds.chemotherapy {
        score += 12.0;
    }
    if meds.steroids {
        score += 5.0;
    }
    if meds.insulin {
        score += 5.0;
    }

    score.min(100.0)
}

/// Blend a structured score with an image-based severity score.
///
/// No image score (or a zero score, which the classifier uses for "nothing
/// found") leaves the structured score untouched; otherwise the result is
/// `round(0.6 * structured + 0.4 * image)`.
#[must_use]
pub fn blend_scores(structured: u8, image: Option<u8>) -> u8 {
    match image {
        None | Some(0) => structured,
        Some(image) => {
            clamp_to_score(0.6 * f64::from(structured) + 0.4 * f64::from(image))
        }
    }
}

/// An explicit record of an image-driven score override.
///
/// Overrides are auditable decisions, never silent mutations: the value the
/// engine computed, the value that replaced it, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOverride {
    /// The blended score the engine computed before the override
    pub computed: u8,

    /// The image score that replaced it
    pub overridden: u8,

    pub reason: String,
}

/// The score a booking is actually ordered by.
///
/// Starts out equal to the structured [`PriorityScore`]; once an image
/// assessment arrives it becomes the 0.6/0.4 blend, or the image score
/// itself when the override rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveScore {
    /// The structured score computed from health signals
    pub computed: PriorityScore,

    /// Image-based severity, when an assessment has been applied
    pub image_score: Option<u8>,

    /// Effective numeric score used for queue ordering
    pub score: u8,

    /// Level band for the effective score
    pub level: PriorityLevel,

    /// Present when the image score overrode the blended value
    pub override_decision: Option<ScoreOverride>,
}

impl EffectiveScore {
    /// An effective score with no image assessment.
    #[must_use]
    pub fn structured(computed: PriorityScore) -> Self {
        Self {
            score: computed.score,
            level: computed.level,
            computed,
            image_score: None,
            override_decision: None,
        }
    }

    /// Combine the structured score with an image severity score.
    ///
    /// The image score replaces the blend only when it exceeds 80 and the
    /// structured score; the replacement is recorded in
    /// `override_decision`. The level always follows the effective score
    /// through the canonical band mapping.
    #[must_use]
    pub fn with_image(computed: PriorityScore, image_score: u8) -> Self {
        let blended = blend_scores(computed.score, Some(image_score));

        if image_score > 80 && image_score > computed.score {
            let decision = ScoreOverride {
                computed: blended,
                overridden: image_score,
                reason: format!(
                    "image severity {image_score} exceeds structured score {} and the override threshold",
                    computed.score
                ),
            };
            Self {
                computed,
                image_score: Some(image_score),
                score: image_score,
                level: PriorityLevel::from_score(image_score),
                override_decision: Some(decision),
            }
        } else {
            Self {
                computed,
                image_score: Some(image_score),
                score: blended,
                level: PriorityLevel::from_score(blended),
                override_decision: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signals::{
        ChronicConditions, MedicalHistory, RiskMedications, SymptomDuration, Vitals,
    };

    fn signals_with_vitals(vitals: Vitals) -> HealthSignals {
        HealthSignals {
            vitals,
            ..HealthSignals::default()
        }
    }

    #[test]
    fn test_empty_signals_score_zero_low() {
        let score = compute_score(&HealthSignals::default());
        assert_eq!(score.score, 0);
        assert_eq!(score.level, PriorityLevel::Low);
        assert_eq!(score.breakdown, ScoreBreakdown::default());
    }

    #[test]
    fn test_level_bands() {
        assert_eq!(PriorityLevel::from_score(0), PriorityLevel::Low);
        assert_eq!(PriorityLevel::from_score(25), PriorityLevel::Low);
        assert_eq!(PriorityLevel::from_score(26), PriorityLevel::Medium);
        assert_eq!(PriorityLevel::from_score(50), PriorityLevel::Medium);
        assert_eq!(PriorityLevel::from_score(51), PriorityLevel::High);
        assert_eq!(PriorityLevel::from_score(75), PriorityLevel::High);
        assert_eq!(PriorityLevel::from_score(76), PriorityLevel::Critical);
        assert_eq!(PriorityLevel::from_score(100), PriorityLevel::Critical);
    }

    #[test]
    fn test_legacy_labels_share_bands() {
        assert_eq!(PriorityLevel::from_score(76).legacy_label(), "Emergency");
        assert_eq!(PriorityLevel::from_score(51).legacy_label(), "High");
        assert_eq!(PriorityLevel::from_score(26).legacy_label(), "Medium");
        assert_eq!(PriorityLevel::from_score(0).legacy_label(), "Low");
    }

    /// The worked reference case: spo2 89 (+40), breathing difficulty
    /// (+45) and pain 9 (+25) clamp severity at 100; age 80 scores 20;
    /// everything else is zero. Composite = round(100*0.35 + 20*0.10).
    #[test]
    fn test_reference_composite_arithmetic() {
        let signals = HealthSignals {
            vitals: Vitals {
                spo2: Some(89.0),
                ..Vitals::default()
            },
            breathing_difficulty: true,
            pain_level: 9,
            age: Some(80),
            ..HealthSignals::default()
        };

        let score = compute_score(&signals);
        assert_eq!(score.breakdown.severity, 35); // 100 * 0.35
        assert_eq!(score.breakdown.age, 2); // 20 * 0.10
        assert_eq!(score.breakdown.chronic, 0);
        assert_eq!(score.breakdown.symptom, 0);
        assert_eq!(score.breakdown.vitals, 0);
        assert_eq!(score.breakdown.history, 0);
        assert_eq!(score.score, 37);
        assert_eq!(score.level, PriorityLevel::Medium);
    }

    #[test]
    fn test_scoring_is_pure() {
        let signals = HealthSignals {
            vitals: Vitals {
                spo2: Some(93.0),
                heart_rate: Some(118.0),
                ..Vitals::default()
            },
            symptom_tags: vec!["cough".into(), "fatigue".into()],
            pain_level: 5,
            age: Some(67),
            ..HealthSignals::default()
        };

        let first = compute_score(&signals);
        for _ in 0..10 {
            assert_eq!(compute_score(&signals), first);
        }
    }

    #[test]
    fn test_score_bounded_under_extreme_input() {
        let signals = HealthSignals {
            vitals: Vitals {
                systolic_bp: Some(220.0),
                diastolic_bp: Some(130.0),
                spo2: Some(70.0),
                heart_rate: Some(180.0),
                temperature: Some(106.0),
                sugar_level: Some(500.0),
            },
            symptom_tags: vec!["chest pain".into(), "choking".into()],
            conditions: ChronicConditions {
                diabetes: true,
                hypertension: true,
                asthma: true,
                heart_disease: true,
                kidney_disease: true,
                cancer: true,
                stroke_history: true,
            },
            pain_level: 10,
            duration: Some(SymptomDuration {
                value: 3,
                unit: DurationUnit::Weeks,
            }),
            sudden: true,
            worsening: true,
            fever: true,
            bleeding: true,
            breathing_difficulty: true,
            pregnancy_status: true,
            age: Some(0),
            history: MedicalHistory {
                recent_hospitalization: true,
                icu_history: true,
                surgeries: vec!["a".into(); 10],
                allergies: vec!["b".into(); 10],
                pregnancy_complications: vec!["c".into()],
                medications: RiskMedications {
                    blood_thinners: true,
                    chemotherapy: true,
                    steroids: true,
                    insulin: true,
                },
            },
        };

        let score = compute_score(&signals);
        assert!(score.score <= 100);
        assert_eq!(score.level, PriorityLevel::from_score(score.score));
    }

    #[test]
    fn test_missing_vitals_do_not_read_as_critical() {
        // An absent blood pressure reading must not count as hypotension,
        // nor a missing heart rate as bradycardia.
        let score = compute_score(&signals_with_vitals(Vitals::default()));
        assert_eq!(score.score, 0);
    }

    #[test]
    fn test_bp_bands_are_exclusive() {
        // Crisis-level BP scores 35 once, not crisis + stage-2.
        let crisis = compute_score(&signals_with_vitals(Vitals {
            systolic_bp: Some(190.0),
            ..Vitals::default()
        }));
        assert_eq!(crisis.breakdown.severity, 12); // 35 * 0.35 rounded

        let stage2 = compute_score(&signals_with_vitals(Vitals {
            systolic_bp: Some(150.0),
            ..Vitals::default()
        }));
        assert_eq!(stage2.breakdown.severity, 5); // 15 * 0.35 rounded
    }

    #[test]
    fn test_critical_symptom_substring_match() {
        let signals = HealthSignals {
            symptom_tags: vec!["Crushing CHEST PAIN since morning".into()],
            ..HealthSignals::default()
        };
        let score = compute_score(&signals);
        assert_eq!(score.breakdown.symptom, 8); // 40 * 0.20

        let mundane = HealthSignals {
            symptom_tags: vec!["cough".into(); 10],
            ..HealthSignals::default()
        };
        // Non-critical tags cap at +30.
        assert_eq!(compute_score(&mundane).breakdown.symptom, 6);
    }

    #[test]
    fn test_infant_age_scores() {
        let infant = HealthSignals {
            age: Some(0),
            ..HealthSignals::default()
        };
        assert_eq!(compute_score(&infant).breakdown.age, 3); // 25 * 0.10

        let unknown = HealthSignals {
            age: None,
            ..HealthSignals::default()
        };
        assert_eq!(compute_score(&unknown).breakdown.age, 0);
    }

    #[test]
    fn test_blend_without_image_keeps_structured() {
        assert_eq!(blend_scores(42, None), 42);
        assert_eq!(blend_scores(42, Some(0)), 42);
    }

    #[test]
    fn test_blend_weighted_average() {
        // round(0.6*50 + 0.4*90) = round(66) = 66
        assert_eq!(blend_scores(50, Some(90)), 66);
        // round(0.6*37 + 0.4*25) = round(32.2) = 32
        assert_eq!(blend_scores(37, Some(25)), 32);
    }

    #[test]
    fn test_image_override_requires_both_conditions() {
        let computed = compute_score(&HealthSignals {
            breathing_difficulty: true,
            ..HealthSignals::default()
        });
        assert_eq!(computed.score, 16);

        // 85 > 80 and 85 > 16: override fires.
        let overridden = EffectiveScore::with_image(computed.clone(), 85);
        assert_eq!(overridden.score, 85);
        assert_eq!(overridden.level, PriorityLevel::Critical);
        let decision = overridden
            .override_decision
            .expect("Should record the override");
        assert_eq!(decision.overridden, 85);
        assert_eq!(decision.computed, blend_scores(16, Some(85)));

        // 78 fails the > 80 threshold: plain blend.
        let blended = EffectiveScore::with_image(computed.clone(), 78);
        assert!(blended.override_decision.is_none());
        assert_eq!(blended.score, blend_scores(16, Some(78)));

        // Image above 80 but below a higher structured score: plain blend.
        let high_structured = PriorityScore {
            score: 95,
            level: PriorityLevel::Critical,
            breakdown: ScoreBreakdown::default(),
        };
        let kept = EffectiveScore::with_image(high_structured, 85);
        assert!(kept.override_decision.is_none());
        assert_eq!(kept.score, blend_scores(95, Some(85)));
    }

    #[test]
    fn test_structured_effective_score_mirrors_computed() {
        let computed = compute_score(&HealthSignals::default());
        let effective = EffectiveScore::structured(computed.clone());
        assert_eq!(effective.score, computed.score);
        assert_eq!(effective.level, computed.level);
        assert!(effective.image_score.is_none());
        assert!(effective.override_decision.is_none());
    }
}

//! Domain layer: core triage and queue types.
//!
//! Pure business types and functions: the score model, the queue
//! projection, and the per-provider ledger entry. Nothing in this module
//! performs I/O.

mod booking;
mod ledger;
mod provider;
mod queue;
mod score;
mod signals;

pub use booking::{Booking, SlotKey};
pub use ledger::ProviderLedger;
pub use provider::{
    AvailabilityStatus, Provider, DEFAULT_CONSULT_MINUTES, DEFAULT_TOKEN_CAP,
};
pub use queue::{position_of, project, Eta, QueueEntry};
pub use score::{
    blend_scores, compute_score, EffectiveScore, PriorityLevel, PriorityScore,
    ScoreBreakdown, ScoreOverride,
};
pub use signals::{
    ChronicConditions, DurationUnit, HealthSignals, MedicalHistory, RiskMedications,
    SymptomDuration, Vitals,
};

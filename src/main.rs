//! vitalqueue: triage scoring and appointment queue engine.
//!
//! Demo entry point: seeds a couple of providers, books a routine, an
//! urgent, and an emergency patient, then prints the projected queue and
//! the events the fan-out delivered.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveTime, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitalqueue::adapters::{
    ChannelFanout, FixedClassifier, SanitizingMakeWriter, SqliteStorage, TimeoutClassifier,
};
use vitalqueue::domain::Vitals;
use vitalqueue::ports::{Storage, Topic};
use vitalqueue::{
    BookingCoordinator, HealthSignals, Provider, QueueService, ReservationRequest,
    ReserveOutcome, SlotKey,
};

fn main() -> Result<()> {
    let _guard = init_logging()?;

    tracing::info!("Starting vitalqueue demo...");

    let db_path =
        std::env::var("VITALQUEUE_DB").unwrap_or_else(|_| "vitalqueue.db".to_string());
    let storage = Arc::new(SqliteStorage::new(&db_path)?);
    let fanout = Arc::new(ChannelFanout::new());
    // Stand-in for the wound-image model; real deployments plug their own
    // ImageClassifier in here.
    let classifier = Arc::new(TimeoutClassifier::from_env(FixedClassifier::new(
        92,
        "deep laceration",
    )));

    let coordinator =
        BookingCoordinator::new(Arc::clone(&storage), classifier, Arc::clone(&fanout))?;
    let queue_service = QueueService::new(Arc::clone(&storage));

    // Seed demo providers on first run.
    if storage.list_providers()?.is_empty() {
        coordinator.register_provider(&Provider::new("prov-gp", "Dr. Mensah"))?;
        let mut cardio = Provider::new("prov-cardio", "Dr. Owusu");
        cardio.avg_consult_minutes = 25;
        coordinator.register_provider(&cardio)?;
    }

    let events = fanout.subscribe(&Topic::provider_queue("prov-gp"));
    let tomorrow = Utc::now().date_naive() + Duration::days(1);

    // A routine visit, an urgent intake, and a critical walk-in.
    let routine = ReservationRequest {
        provider_id: "prov-gp".to_string(),
        patient_id: "patient-routine".to_string(),
        slot: SlotKey::new(tomorrow, NaiveTime::from_hms_opt(10, 0, 0).expect("Valid time")),
        signals: None,
    };
    report(coordinator.reserve_slot(routine)?);

    let urgent = ReservationRequest {
        provider_id: "prov-gp".to_string(),
        patient_id: "patient-urgent".to_string(),
        slot: SlotKey::new(tomorrow, NaiveTime::from_hms_opt(11, 0, 0).expect("Valid time")),
        signals: Some(HealthSignals {
            vitals: Vitals {
                spo2: Some(89.0),
                ..Vitals::default()
            },
            breathing_difficulty: true,
            pain_level: 9,
            age: Some(80),
            ..HealthSignals::default()
        }),
    };
    report(coordinator.reserve_slot(urgent)?);

    // A walk-in with a severe wound: earliest open slot, then an image
    // assessment that pushes the booking into the critical tier.
    let emergency_signals = HealthSignals {
        symptom_tags: vec!["severe bleeding from leg wound".to_string()],
        bleeding: true,
        sudden: true,
        pain_level: 10,
        age: Some(68),
        ..HealthSignals::default()
    };
    if let Some(slot) = coordinator.earliest_open_slot("prov-gp", tomorrow) {
        let outcome = coordinator.reserve_slot(ReservationRequest {
            provider_id: "prov-gp".to_string(),
            patient_id: "patient-walkin".to_string(),
            slot,
            signals: Some(emergency_signals),
        })?;
        if let ReserveOutcome::Booked(booking) = &outcome {
            let wound_photo = [0xFF, 0xD8, 0xFF, 0xE0]; // demo JPEG header bytes
            let rescored = coordinator.apply_image_assessment(&booking.id, &wound_photo)?;
            println!(
                "walk-in rescored to {} {} after image assessment",
                rescored.level(),
                rescored.effective_score(),
            );
        }
        report(outcome);
    }

    let view = queue_service.queue_for("prov-gp", None)?;
    println!("\nQueue for prov-gp ({} waiting):", view.len());
    for entry in &view.entries {
        println!(
            "  #{} token {:>2}  {:<8} score {:>3}  eta {:>7}  {}",
            entry.position,
            entry.booking.token_number,
            entry.booking.level().to_string(),
            entry.booking.effective_score(),
            entry.eta.to_string(),
            entry.booking.patient_id,
        );
    }

    let delivered: Vec<_> = events.try_iter().collect();
    println!("\n{} queue event(s) delivered to prov-gp subscribers", delivered.len());

    tracing::info!("vitalqueue demo complete.");
    Ok(())
}

/// Configure tracing with PII-sanitized output.
///
/// `VITALQUEUE_LOG_MODE` selects the sink: `stdout` (default) or `file`
/// (path from `VITALQUEUE_LOG_FILE`, default `vitalqueue.log`).
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_mode =
        std::env::var("VITALQUEUE_LOG_MODE").unwrap_or_else(|_| "stdout".to_string());

    let (writer, guard) = if log_mode == "file" {
        let log_file = std::env::var("VITALQUEUE_LOG_FILE")
            .unwrap_or_else(|_| "vitalqueue.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    // The caller holds the guard so buffered log lines flush at exit.
    Ok(guard)
}

fn report(outcome: ReserveOutcome) {
    match outcome {
        ReserveOutcome::Booked(booking) => println!(
            "booked {} for {} at {} (token {}, {} {})",
            booking.id,
            booking.patient_id,
            booking.slot,
            booking.token_number,
            booking.level(),
            booking.effective_score(),
        ),
        ReserveOutcome::SlotConflict => println!("slot already taken"),
        ReserveOutcome::ProviderUnavailable => println!("provider unavailable"),
        ReserveOutcome::CapacityExceeded => println!("provider fully booked for the day"),
    }
}

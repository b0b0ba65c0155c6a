//! SQLite adapter: Implementation of Storage.
//!
//! Provides local persistence for providers and bookings. Slot dates and
//! times are stored as ISO text, timestamps as RFC 3339, and the full
//! severity record as JSON so the audit trail (breakdown, image score,
//! override decision) survives a round-trip.
//!
//! A partial unique index on active `(provider_id, slot_date, slot_time)`
//! rows backs the ledger's uniqueness invariant at the storage layer.
//!
//! # Mutex Behavior
//!
//! Database connection is protected by `Mutex`. A poisoned mutex (from
//! panic in another thread) will cause panic. This fail-fast behavior is
//! intentional for data integrity in healthcare applications.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{AvailabilityStatus, Booking, EffectiveScore, Provider, SlotKey};
use crate::ports::Storage;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// SQLite storage adapter.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS providers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                available INTEGER NOT NULL,
                status TEXT NOT NULL,
                daily_token_cap INTEGER NOT NULL,
                current_token_count INTEGER NOT NULL,
                avg_consult_minutes INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                provider_id TEXT NOT NULL,
                patient_id TEXT NOT NULL,
                slot_date TEXT NOT NULL,
                slot_time TEXT NOT NULL,
                created_at TEXT NOT NULL,
                severity TEXT NOT NULL,
                cancelled INTEGER NOT NULL,
                completed INTEGER NOT NULL,
                token_number INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_bookings_provider_date
                ON bookings(provider_id, slot_date);

            CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_active_slot
                ON bookings(provider_id, slot_date, slot_time)
                WHERE cancelled = 0;
            ",
        )?;

        Ok(())
    }

    fn row_to_provider(row: &Row<'_>) -> rusqlite::Result<Provider> {
        let status: String = row.get(3)?;
        Ok(Provider {
            id: row.get(0)?,
            name: row.get(1)?,
            available: row.get::<_, i64>(2)? != 0,
            status: AvailabilityStatus::parse(&status),
            daily_token_cap: row.get(4)?,
            current_token_count: row.get(5)?,
            avg_consult_minutes: row.get(6)?,
        })
    }

    fn row_to_booking(row: &Row<'_>) -> rusqlite::Result<Booking> {
        let slot_date: String = row.get(3)?;
        let slot_time: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        let severity: String = row.get(6)?;

        let date = NaiveDate::parse_from_str(&slot_date, DATE_FORMAT)
            .map_err(|e| conversion_error(3, e))?;
        let time = NaiveTime::parse_from_str(&slot_time, TIME_FORMAT)
            .map_err(|e| conversion_error(4, e))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| conversion_error(5, e))?
            .with_timezone(&Utc);
        let severity: EffectiveScore =
            serde_json::from_str(&severity).map_err(|e| conversion_error(6, e))?;

        Ok(Booking {
            id: row.get(0)?,
            provider_id: row.get(1)?,
            patient_id: row.get(2)?,
            slot: SlotKey::new(date, time),
            created_at,
            severity,
            cancelled: row.get::<_, i64>(7)? != 0,
            completed: row.get::<_, i64>(8)? != 0,
            token_number: row.get(9)?,
        })
    }

    fn severity_json(booking: &Booking) -> Result<String, StorageError> {
        serde_json::to_string(&booking.severity)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Wrap a parse failure so it can travel through rusqlite's row mapping.
fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(err),
    )
}

const BOOKING_COLUMNS: &str = "id, provider_id, patient_id, slot_date, slot_time, \
     created_at, severity, cancelled, completed, token_number";

impl Storage for SqliteStorage {
    type Error = StorageError;

    fn save_provider(&self, provider: &Provider) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            r"INSERT OR REPLACE INTO providers
              (id, name, available, status, daily_token_cap, current_token_count, avg_consult_minutes)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                provider.id,
                provider.name,
                i64::from(provider.available),
                provider.status.as_str(),
                provider.daily_token_cap,
                provider.current_token_count,
                provider.avg_consult_minutes,
            ],
        )?;
        Ok(())
    }

    fn load_provider(&self, provider_id: &str) -> Result<Option<Provider>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let provider = conn
            .query_row(
                r"SELECT id, name, available, status, daily_token_cap,
                         current_token_count, avg_consult_minutes
                  FROM providers WHERE id = ?1",
                params![provider_id],
                Self::row_to_provider,
            )
            .optional()?;
        Ok(provider)
    }

    fn list_providers(&self) -> Result<Vec<Provider>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let mut stmt = conn.prepare(
            r"SELECT id, name, available, status, daily_token_cap,
                     current_token_count, avg_consult_minutes
              FROM providers ORDER BY id",
        )?;
        let providers = stmt
            .query_map([], Self::row_to_provider)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(providers)
    }

    fn update_provider_tokens(&self, provider_id: &str, count: u32) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let updated = conn.execute(
            "UPDATE providers SET current_token_count = ?1 WHERE id = ?2",
            params![count, provider_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("provider {provider_id}")));
        }
        Ok(())
    }

    fn reset_all_tokens(&self) -> Result<usize, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let updated = conn.execute("UPDATE providers SET current_token_count = 0", [])?;
        Ok(updated)
    }

    fn save_booking(&self, booking: &Booking) -> Result<(), Self::Error> {
        let severity = Self::severity_json(booking)?;
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute(
            r"INSERT INTO bookings
              (id, provider_id, patient_id, slot_date, slot_time, created_at,
               severity, cancelled, completed, token_number)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                booking.id,
                booking.provider_id,
                booking.patient_id,
                booking.slot.date.format(DATE_FORMAT).to_string(),
                booking.slot.time.format(TIME_FORMAT).to_string(),
                booking.created_at.to_rfc3339(),
                severity,
                i64::from(booking.cancelled),
                i64::from(booking.completed),
                booking.token_number,
            ],
        )?;
        Ok(())
    }

    fn update_booking(&self, booking: &Booking) -> Result<(), Self::Error> {
        let severity = Self::severity_json(booking)?;
        let conn = self.conn.lock().expect("Lock failed");
        let updated = conn.execute(
            r"UPDATE bookings
              SET severity = ?1, cancelled = ?2, completed = ?3
              WHERE id = ?4",
            params![
                severity,
                i64::from(booking.cancelled),
                i64::from(booking.completed),
                booking.id,
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("booking {}", booking.id)));
        }
        Ok(())
    }

    fn delete_booking(&self, booking_id: &str) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        conn.execute("DELETE FROM bookings WHERE id = ?1", params![booking_id])?;
        Ok(())
    }

    fn load_booking(&self, booking_id: &str) -> Result<Option<Booking>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let booking = conn
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                params![booking_id],
                Self::row_to_booking,
            )
            .optional()?;
        Ok(booking)
    }

    fn active_bookings(
        &self,
        provider_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let bookings = match date {
            Some(date) => {
                let mut stmt = conn.prepare(&format!(
                    r"SELECT {BOOKING_COLUMNS} FROM bookings
                      WHERE provider_id = ?1 AND cancelled = 0 AND completed = 0
                        AND slot_date = ?2
                      ORDER BY created_at ASC"
                ))?;
                let rows = stmt.query_map(
                    params![provider_id, date.format(DATE_FORMAT).to_string()],
                    Self::row_to_booking,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    r"SELECT {BOOKING_COLUMNS} FROM bookings
                      WHERE provider_id = ?1 AND cancelled = 0 AND completed = 0
                      ORDER BY created_at ASC"
                ))?;
                let rows = stmt.query_map(params![provider_id], Self::row_to_booking)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(bookings)
    }

    fn bookings_for_patient(&self, patient_id: &str) -> Result<Vec<Booking>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");
        let mut stmt = conn.prepare(&format!(
            r"SELECT {BOOKING_COLUMNS} FROM bookings
              WHERE patient_id = ?1
              ORDER BY created_at DESC"
        ))?;
        let bookings = stmt
            .query_map(params![patient_id], Self::row_to_booking)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookings)
    }
}

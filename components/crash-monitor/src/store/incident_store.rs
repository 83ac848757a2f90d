//! Incident Store - responsibility and behavior
//!
//! The store is the only owner of the on-disk incident table. It is an
//! append-only log: rows are inserted with a store-assigned id and UTC
//! timestamp and are never updated or deleted afterwards.
//!
//! - Every insert is auto-committed, nothing is buffered or batched.
//! - Timestamps are written as fixed-width RFC 3339 strings with microsecond
//! precision and a `Z` suffix. Ordering and window filtering go through
//! `julianday()`, so rows written by other tools with second precision or a
//! `+HH:MM` offset still sort and filter chronologically.
//! - Storage failures surface unmodified as `IncidentError::Storage`; there is
//! no retry or partial-write recovery.

// Local crates
use crate::{
    helpers::errors::{IncidentError, IncidentResult},
    store::models::{Incident, NewIncident, SeverityCount},
};

// External crates
use chrono::{DateTime, Datelike, SecondsFormat, TimeDelta, Utc};
use rusqlite::{Connection, Row, params, types::Type};
use std::path::{Path, PathBuf};
use tracing::instrument;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS incidents (
        id              INTEGER PRIMARY KEY,
        timestamp       TEXT NOT NULL,
        severity        TEXT NOT NULL,
        title           TEXT NOT NULL,
        details         TEXT,
        origin          TEXT,
        metadata        TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_incidents_timestamp ON incidents (timestamp);
";

const SELECT_COLUMNS: &str = "id, timestamp, severity, title, details, origin, metadata";

/// Handle on the SQLite-backed incident table.
///
/// The connection is released by [`IncidentStore::close`], or on drop when a
/// caller bails out early.
#[derive(Debug)]
pub struct IncidentStore {
    conn: Connection,
    path: PathBuf,
}

impl IncidentStore {
    /// Open (or create) the incident database at `path`.
    ///
    /// Missing parent directories are created and the schema is applied with
    /// `IF NOT EXISTS`, so opening an existing file leaves its rows untouched.
    #[instrument(
        name = "crash_monitor_store::open",
        target = "store::incident_store::IncidentStore",
        skip_all,
        level = "debug"
    )]
    pub fn open<P: AsRef<Path>>(path: P) -> IncidentResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| {
                tracing::error!(
                    error = %source,
                    directory = %parent.display(),
                    "Failed to create incident database directory"
                );
                IncidentError::StoragePath {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }

        tracing::debug!(db_path = %path.display(), "Opening incident database");
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Location of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one incident stamped with the current UTC time and return its id.
    #[instrument(
        name = "crash_monitor_store::log_incident",
        target = "store::incident_store::IncidentStore",
        skip_all,
        fields(severity = %incident.severity),
        level = "debug"
    )]
    pub fn log_incident(&self, incident: &NewIncident) -> IncidentResult<i64> {
        self.insert_at(incident, Utc::now())
    }

    fn insert_at(&self, incident: &NewIncident, timestamp: DateTime<Utc>) -> IncidentResult<i64> {
        self.conn.execute(
            "INSERT INTO incidents (timestamp, severity, title, details, origin, metadata) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_timestamp(timestamp),
                incident.severity.as_str(),
                incident.title,
                incident.details,
                incident.origin,
                incident.metadata,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(
            incident_id = id,
            severity = %incident.severity,
            origin = incident.origin.as_deref().unwrap_or("-"),
            "Incident recorded"
        );

        Ok(id)
    }

    /// Up to `limit` incidents, most recent first. Equal timestamps fall back
    /// to descending id so the order is stable.
    ///
    /// A `limit` below one is rejected with `IncidentError::Input`.
    #[instrument(
        name = "crash_monitor_store::list_recent",
        target = "store::incident_store::IncidentStore",
        skip(self),
        level = "debug"
    )]
    pub fn list_recent(&self, limit: i64) -> IncidentResult<Vec<Incident>> {
        if limit <= 0 {
            return Err(IncidentError::Input(format!(
                "limit must be a positive number of incidents, got {limit}"
            )));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM incidents ORDER BY julianday(timestamp) DESC, id DESC LIMIT ?1"
        ))?;
        let incidents = stmt
            .query_map(params![limit], row_to_incident)?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(returned = incidents.len(), "Listed recent incidents");
        Ok(incidents)
    }

    /// Per-severity counts of incidents recorded within the last `days` days.
    ///
    /// Severities without matching rows are omitted. Group order follows
    /// SQLite's `GROUP BY` and must not be relied upon.
    #[instrument(
        name = "crash_monitor_store::summary",
        target = "store::incident_store::IncidentStore",
        skip(self),
        level = "debug"
    )]
    pub fn summary(&self, days: i64) -> IncidentResult<Vec<SeverityCount>> {
        if days < 0 {
            return Err(IncidentError::Input(format!(
                "days must not be negative, got {days}"
            )));
        }

        let now = Utc::now();
        // SQLite date functions stop at year 0000; anything earlier is unbounded
        let boundary = TimeDelta::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .filter(|boundary| boundary.year() >= 1)
            .map(format_timestamp);

        let mut stmt = self.conn.prepare(
            "SELECT severity, COUNT(*) AS total FROM incidents
             WHERE ?1 IS NULL OR julianday(timestamp) >= julianday(?1)
             GROUP BY severity",
        )?;
        let groups = stmt
            .query_map(params![boundary], |row| {
                let total: i64 = row.get(1)?;
                Ok(SeverityCount {
                    severity: row.get(0)?,
                    total: u64::try_from(total).unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            boundary = boundary.as_deref().unwrap_or("unbounded"),
            groups = groups.len(),
            "Summarized incidents"
        );
        Ok(groups)
    }

    /// Total number of stored incidents.
    pub fn count(&self) -> IncidentResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    /// Release the database handle, reporting any error SQLite raises while
    /// closing.
    #[instrument(
        name = "crash_monitor_store::close",
        target = "store::incident_store::IncidentStore",
        skip_all,
        level = "debug"
    )]
    pub fn close(self) -> IncidentResult<()> {
        tracing::debug!(db_path = %self.path.display(), "Closing incident database");
        self.conn.close().map_err(|(_, e)| IncidentError::Storage(e))
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_incident(row: &Row<'_>) -> rusqlite::Result<Incident> {
    let raw_timestamp: String = row.get(1)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_timestamp)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(Incident {
        id: row.get(0)?,
        timestamp,
        severity: row.get(2)?,
        title: row.get(3)?,
        details: row.get(4)?,
        origin: row.get(5)?,
        metadata: row.get(6)?,
    })
}

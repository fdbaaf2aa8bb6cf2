//! SQLite implementation of [`PeriodStore`].
//!
//! Dates are stored as ISO `YYYY-MM-DD` text so the sweep pre-filter can
//! compare them lexicographically in SQL; timestamps are RFC 3339 text.
//! Access is serialized behind a mutex; every update is a single-row write.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use evalia_core::period::{Evaluation, EvaluationPeriod, PeriodStatus};

use crate::{PeriodStore, StoreError};

const DATE_FMT: &str = "%Y-%m-%d";

const PERIOD_COLUMNS: &str = "id, name, start_date, end_date, status, created_at, updated_at";

/// SQLite-backed store for periods and evaluations.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL for concurrent readers while a sweep writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (tests, fallback).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS periods (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                start_date TEXT NOT NULL,       -- ISO date, inclusive
                end_date TEXT NOT NULL,         -- ISO date, inclusive
                status TEXT NOT NULL,           -- PLANNED | ACTIVE | FINISHED | CANCELLED
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS evaluations (
                id TEXT PRIMARY KEY,
                period_id TEXT NOT NULL,
                employee TEXT NOT NULL,
                score REAL NOT NULL,
                comments TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (period_id) REFERENCES periods(id)
            );

            CREATE INDEX IF NOT EXISTS idx_periods_status ON periods(status);
            CREATE INDEX IF NOT EXISTS idx_evaluations_period ON evaluations(period_id);
        ",
        )?;
        Ok(())
    }
}

fn read_period(row: &Row<'_>) -> rusqlite::Result<RawPeriod> {
    Ok(RawPeriod {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Raw text columns of a period row, before domain parsing.
struct RawPeriod {
    id: String,
    name: String,
    start_date: String,
    end_date: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl RawPeriod {
    fn into_period(self) -> Result<EvaluationPeriod, StoreError> {
        Ok(EvaluationPeriod {
            id: parse_uuid(&self.id)?,
            name: self.name,
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
            status: PeriodStatus::parse(&self.status)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", self.status)))?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|_| StoreError::Corrupt(format!("invalid uuid '{s}'")))
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|_| StoreError::Corrupt(format!("invalid date '{s}'")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("invalid timestamp '{s}'")))
}

impl PeriodStore for SqliteStore {
    fn insert_period(&self, period: &EvaluationPeriod) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO periods (id, name, start_date, end_date, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                period.id.to_string(),
                period.name,
                period.start_date.format(DATE_FMT).to_string(),
                period.end_date.format(DATE_FMT).to_string(),
                period.status.as_str(),
                period.created_at.to_rfc3339(),
                period.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn period(&self, id: Uuid) -> Result<Option<EvaluationPeriod>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let raw = conn
            .query_row(
                &format!("SELECT {PERIOD_COLUMNS} FROM periods WHERE id = ?1"),
                params![id.to_string()],
                read_period,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StoreError::Sqlite(other)),
            })?;
        raw.map(RawPeriod::into_period).transpose()
    }

    fn period_by_name(&self, name: &str) -> Result<Option<EvaluationPeriod>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let raw = conn
            .query_row(
                &format!("SELECT {PERIOD_COLUMNS} FROM periods WHERE name = ?1"),
                params![name],
                read_period,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StoreError::Sqlite(other)),
            })?;
        raw.map(RawPeriod::into_period).transpose()
    }

    fn list_periods(&self) -> Result<Vec<EvaluationPeriod>, StoreError> {
        self.query_periods(
            &format!("SELECT {PERIOD_COLUMNS} FROM periods ORDER BY start_date"),
            params![],
        )
    }

    fn non_cancelled_periods(&self) -> Result<Vec<EvaluationPeriod>, StoreError> {
        self.query_periods(
            &format!(
                "SELECT {PERIOD_COLUMNS} FROM periods WHERE status != 'CANCELLED' ORDER BY start_date"
            ),
            params![],
        )
    }

    fn due_for_transition(&self, today: NaiveDate) -> Result<Vec<EvaluationPeriod>, StoreError> {
        let day = today.format(DATE_FMT).to_string();
        self.query_periods(
            &format!(
                "SELECT {PERIOD_COLUMNS} FROM periods
                 WHERE (status = 'PLANNED' AND start_date <= ?1 AND end_date >= ?1)
                    OR (status = 'ACTIVE' AND end_date < ?1)
                 ORDER BY start_date"
            ),
            params![day],
        )
    }

    fn update_status(
        &self,
        id: Uuid,
        status: PeriodStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "UPDATE periods SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), updated_at.to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    fn overlapping_periods(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EvaluationPeriod>, StoreError> {
        self.query_periods(
            &format!(
                "SELECT {PERIOD_COLUMNS} FROM periods
                 WHERE status != 'CANCELLED' AND start_date <= ?2 AND end_date >= ?1
                 ORDER BY start_date"
            ),
            params![
                start.format(DATE_FMT).to_string(),
                end.format(DATE_FMT).to_string()
            ],
        )
    }

    fn insert_evaluation(&self, evaluation: &Evaluation) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO evaluations (id, period_id, employee, score, comments, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                evaluation.id.to_string(),
                evaluation.period_id.to_string(),
                evaluation.employee,
                evaluation.score,
                evaluation.comments,
                evaluation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn evaluations_for_period(&self, period_id: Uuid) -> Result<Vec<Evaluation>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, period_id, employee, score, comments, created_at
             FROM evaluations WHERE period_id = ?1 ORDER BY created_at DESC",
        )?;
        let raws: Vec<(String, String, String, f64, Option<String>, String)> = stmt
            .query_map(params![period_id.to_string()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;

        raws.into_iter()
            .map(|(id, pid, employee, score, comments, created_at)| {
                Ok(Evaluation {
                    id: parse_uuid(&id)?,
                    period_id: parse_uuid(&pid)?,
                    employee,
                    score,
                    comments,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}

impl SqliteStore {
    fn query_periods(
        &self,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<EvaluationPeriod>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(sql)?;
        let raws: Vec<RawPeriod> = stmt
            .query_map(args, read_period)?
            .collect::<rusqlite::Result<_>>()?;
        raws.into_iter().map(RawPeriod::into_period).collect()
    }
}

//! SQLite-based storage implementation
//!
//! One store backs all four traits so a single database file carries the
//! whole platform. Every invariant-bearing mutation is a single
//! conditional UPDATE checked through rows_affected; the partial unique
//! index on open debates backstops the claim protocol.

use std::sync::Mutex;

use ateneo_core::AiReport;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    CaseId, CaseRecord, CaseStore, CreditLedger, Debate, DebateId, DebateStore, Profile,
    ProfileKind, ProfileStore, StoreResult,
};
use crate::error::ApiError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-based store implementing ProfileStore, CreditLedger, CaseStore
/// and DebateStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path)?;

        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Run migrations
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ApiError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })?;

        Ok(version)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ApiError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Profiles (volunteers and professionals)
            CREATE TABLE IF NOT EXISTS profiles (
                email TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                waiver_signed INTEGER NOT NULL DEFAULT 0,
                ranking INTEGER NOT NULL DEFAULT 0,
                credits INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- Uploaded cases with their frozen reports
            CREATE TABLE IF NOT EXISTS cases (
                id TEXT PRIMARY KEY,
                volunteer_email TEXT NOT NULL REFERENCES profiles(email),
                report TEXT NOT NULL,
                available INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cases_available ON cases(available);

            -- Debates; the partial unique index enforces at most one
            -- open debate per case
            CREATE TABLE IF NOT EXISTS debates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                case_id TEXT NOT NULL REFERENCES cases(id),
                professional_email TEXT NOT NULL REFERENCES profiles(email),
                started_at TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_debates_open_case
                ON debates(case_id) WHERE completed = 0;
            CREATE INDEX IF NOT EXISTS idx_debates_open_started
                ON debates(started_at) WHERE completed = 0;

            -- Single-row sweeper lease
            CREATE TABLE IF NOT EXISTS sweeper_lease (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                holder TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

// Row mappers. Timestamps are stored as RFC 3339 text; profile and case
// created_at fall back to now on a corrupt column, while a debate's
// started_at is expiry-critical and surfaces as a conversion error.

fn parse_created_at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    let email: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let waiver_signed: i32 = row.get(2)?;
    let ranking: i64 = row.get(3)?;
    let credits: i64 = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Profile {
        email,
        kind: ProfileKind::from_str(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown profile kind: {}", kind).into(),
            )
        })?,
        waiver_signed: waiver_signed != 0,
        ranking,
        credits,
        created_at: parse_created_at(&created_at),
    })
}

fn case_from_row(row: &rusqlite::Row) -> rusqlite::Result<CaseRecord> {
    let id: String = row.get(0)?;
    let volunteer_email: String = row.get(1)?;
    let report: String = row.get(2)?;
    let available: i32 = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(CaseRecord {
        id: CaseId(id),
        volunteer_email,
        report: serde_json::from_str(&report).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        available: available != 0,
        created_at: parse_created_at(&created_at),
    })
}

fn debate_from_row(row: &rusqlite::Row) -> rusqlite::Result<Debate> {
    let id: i64 = row.get(0)?;
    let case_id: String = row.get(1)?;
    let professional_email: String = row.get(2)?;
    let started_at: String = row.get(3)?;
    let completed: i32 = row.get(4)?;
    Ok(Debate {
        id: DebateId(id),
        case_id: CaseId(case_id),
        professional_email,
        started_at: DateTime::parse_from_rfc3339(&started_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        completed: completed != 0,
    })
}

impl ProfileStore for SqliteStore {
    fn create(&self, email: &str, kind: ProfileKind) -> StoreResult<Profile> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO profiles (email, kind, waiver_signed, ranking, credits, created_at)
             VALUES (?1, ?2, 0, 0, 0, ?3)",
            params![normalized, kind.as_str(), now.to_rfc3339()],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::ProfileAlreadyExists;
                }
            }
            e.into()
        })?;

        Ok(Profile {
            email: normalized,
            kind,
            waiver_signed: false,
            ranking: 0,
            credits: 0,
            created_at: now,
        })
    }

    fn get(&self, email: &str) -> StoreResult<Option<Profile>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        let profile = conn
            .query_row(
                "SELECT email, kind, waiver_signed, ranking, credits, created_at
                 FROM profiles WHERE email = ?1",
                params![normalized],
                profile_from_row,
            )
            .optional()?;

        Ok(profile)
    }

    fn mark_waiver(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE profiles SET waiver_signed = 1 WHERE email = ?1",
            params![normalized],
        )?;

        if rows_affected == 0 {
            return Err(ApiError::ProfileNotFound);
        }

        Ok(())
    }

    fn get_credits(&self, email: &str) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT credits FROM profiles WHERE email = ?1",
            params![normalized],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(ApiError::ProfileNotFound)
    }

    fn get_ranking(&self, email: &str) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT ranking FROM profiles WHERE email = ?1",
            params![normalized],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(ApiError::ProfileNotFound)
    }
}

impl CreditLedger for SqliteStore {
    fn add_credits(&self, email: &str, delta: i64) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        // Conditional update: refuses any delta that would take the
        // balance below zero.
        let rows_affected = conn.execute(
            "UPDATE profiles SET credits = credits + ?1
             WHERE email = ?2 AND credits + ?1 >= 0",
            params![delta, normalized],
        )?;

        if rows_affected == 0 {
            // Re-read to distinguish a missing profile from a refused
            // debit; the conditional update above is the actual guard.
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT credits FROM profiles WHERE email = ?1",
                    params![normalized],
                    |row| row.get(0),
                )
                .optional()?;
            return match exists {
                Some(_) => Err(ApiError::InsufficientCredits),
                None => Err(ApiError::ProfileNotFound),
            };
        }

        let balance = conn.query_row(
            "SELECT credits FROM profiles WHERE email = ?1",
            params![normalized],
            |row| row.get(0),
        )?;

        Ok(balance)
    }

    fn adjust_ranking(&self, email: &str, delta: i64) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE profiles SET ranking = ranking + ?1
             WHERE email = ?2 AND ranking + ?1 >= 0",
            params![delta, normalized],
        )?;

        if rows_affected == 0 {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT ranking FROM profiles WHERE email = ?1",
                    params![normalized],
                    |row| row.get(0),
                )
                .optional()?;
            return match exists {
                Some(_) => Err(ApiError::ValidationError(
                    "ranking cannot go below zero".to_string(),
                )),
                None => Err(ApiError::ProfileNotFound),
            };
        }

        let ranking = conn.query_row(
            "SELECT ranking FROM profiles WHERE email = ?1",
            params![normalized],
            |row| row.get(0),
        )?;

        Ok(ranking)
    }
}

impl CaseStore for SqliteStore {
    fn insert(&self, case: &CaseRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Surface an unknown volunteer as NotFound rather than a raw
        // constraint failure.
        let volunteer_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE email = ?1)",
            params![case.volunteer_email],
            |row| row.get(0),
        )?;
        if !volunteer_exists {
            return Err(ApiError::ProfileNotFound);
        }

        let report = serde_json::to_string(&case.report)?;

        conn.execute(
            "INSERT INTO cases (id, volunteer_email, report, available, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                case.id.0,
                case.volunteer_email,
                report,
                case.available as i32,
                case.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::CaseAlreadyExists;
                }
            }
            e.into()
        })?;

        Ok(())
    }

    fn list_available(&self) -> StoreResult<Vec<CaseRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, volunteer_email, report, available, created_at
             FROM cases WHERE available = 1
             ORDER BY created_at DESC, id DESC",
        )?;

        let cases = stmt
            .query_map([], case_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(cases)
    }

    fn get(&self, case_id: &CaseId) -> StoreResult<Option<CaseRecord>> {
        let conn = self.conn.lock().unwrap();

        let case = conn
            .query_row(
                "SELECT id, volunteer_email, report, available, created_at
                 FROM cases WHERE id = ?1",
                params![case_id.0],
                case_from_row,
            )
            .optional()?;

        Ok(case)
    }

    fn get_report(&self, case_id: &CaseId) -> StoreResult<Option<AiReport>> {
        let conn = self.conn.lock().unwrap();

        let raw: Option<String> = conn
            .query_row(
                "SELECT report FROM cases WHERE id = ?1",
                params![case_id.0],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn mark_unavailable(&self, case_id: &CaseId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        // The atomic claim primitive: exactly one row changes only when
        // the case existed and was still available.
        let rows_affected = conn.execute(
            "UPDATE cases SET available = 0 WHERE id = ?1 AND available = 1",
            params![case_id.0],
        )?;

        Ok(rows_affected == 1)
    }

    fn mark_available(&self, case_id: &CaseId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE cases SET available = 1 WHERE id = ?1",
            params![case_id.0],
        )?;

        if rows_affected == 0 {
            return Err(ApiError::CaseNotFound);
        }

        Ok(())
    }
}

impl DebateStore for SqliteStore {
    fn open(
        &self,
        case_id: &CaseId,
        professional_email: &str,
        started_at: DateTime<Utc>,
    ) -> StoreResult<DebateId> {
        let normalized = professional_email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO debates (case_id, professional_email, started_at, completed)
             VALUES (?1, ?2, ?3, 0)",
            params![case_id.0, normalized, started_at.to_rfc3339()],
        )
        .map_err(|e| {
            // The partial unique index rejects a second open debate on
            // the same case.
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::CaseUnavailable;
                }
            }
            e.into()
        })?;

        Ok(DebateId(conn.last_insert_rowid()))
    }

    fn get(&self, debate_id: DebateId) -> StoreResult<Option<Debate>> {
        let conn = self.conn.lock().unwrap();

        let debate = conn
            .query_row(
                "SELECT id, case_id, professional_email, started_at, completed
                 FROM debates WHERE id = ?1",
                params![debate_id.0],
                debate_from_row,
            )
            .optional()?;

        Ok(debate)
    }

    fn complete(&self, debate_id: DebateId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE debates SET completed = 1 WHERE id = ?1 AND completed = 0",
            params![debate_id.0],
        )?;

        Ok(rows_affected == 1)
    }

    fn list_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Debate>> {
        let conn = self.conn.lock().unwrap();

        // RFC 3339 strings in UTC compare lexicographically in time order.
        let mut stmt = conn.prepare(
            "SELECT id, case_id, professional_email, started_at, completed
             FROM debates WHERE completed = 0 AND started_at <= ?1",
        )?;

        let debates = stmt
            .query_map(params![cutoff.to_rfc3339()], debate_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(debates)
    }

    fn list_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Debate>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, case_id, professional_email, started_at, completed
             FROM debates WHERE completed = 0 AND started_at > ?1 AND started_at <= ?2",
        )?;

        let debates = stmt
            .query_map(params![from.to_rfc3339(), to.to_rfc3339()], debate_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(debates)
    }

    fn try_sweep_lease(
        &self,
        holder: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        // Upsert into the well-known row; the WHERE clause lets only the
        // current holder renew or anyone take over an expired lease.
        let rows_affected = conn.execute(
            "INSERT INTO sweeper_lease (id, holder, expires_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                 holder = excluded.holder,
                 expires_at = excluded.expires_at
             WHERE sweeper_lease.holder = excluded.holder
                OR sweeper_lease.expires_at <= ?3",
            params![holder, until.to_rfc3339(), now.to_rfc3339()],
        )?;

        Ok(rows_affected == 1)
    }

    fn release_sweep_lease(&self, holder: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "DELETE FROM sweeper_lease WHERE id = 1 AND holder = ?1",
            params![holder],
        )?;

        Ok(())
    }
}

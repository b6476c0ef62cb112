// 🗄️ SQLite Persistence - Enriched members, run log, audit events
//
// Tables:
//   members  one row per (member_id, year, normalized city), keyed by a
//            SHA-256 hash. Re-runs overwrite the row instead of duplicating it.
//   runs     one row per pipeline run with its resolution fingerprint
//   events   append-only audit trail

use crate::geo::normalize_city;
use crate::records::EnrichedRecord;
use crate::report::RunReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

/// Event for audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// One row of the `runs` table
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub input: Option<String>,
    pub total_records: i64,
    pub resolved_records: i64,
    pub unresolved_records: i64,
    pub latest_year: Option<i32>,
    pub resolution_fingerprint: String,
}

impl From<&RunReport> for RunRecord {
    fn from(report: &RunReport) -> Self {
        RunRecord {
            run_id: report.run_id.clone(),
            started_at: report.generated_at,
            input: report.input.clone(),
            total_records: report.resolution.total_records as i64,
            resolved_records: report.resolution.resolved_records as i64,
            unresolved_records: report.resolution.unresolved_records as i64,
            latest_year: report.summary.diagnostics.latest_year,
            resolution_fingerprint: report.resolution_fingerprint.clone(),
        }
    }
}

/// Outcome of persisting a batch of enriched records
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistStats {
    pub inserted: usize,
    pub refreshed: usize,
    /// Refreshed rows whose province changed
    pub reassigned: usize,
}

/// Stable identity of a membership row: member, year and normalized city
///
/// Fields are length-prefixed so no choice of values can shift a separator.
pub fn record_hash(record: &EnrichedRecord) -> String {
    let r = &record.record;
    let city = r.city.as_deref().and_then(normalize_city).unwrap_or_default();
    let year = r.year.to_string();

    let mut hasher = Sha256::new();
    for field in [r.member_id.as_str(), year.as_str(), city.as_str()] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_hash TEXT UNIQUE NOT NULL,
            member_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            city TEXT,
            region TEXT,
            competitions REAL,
            points REAL,
            age REAL,
            competitive INTEGER NOT NULL,
            province TEXT,
            metropolitan INTEGER,
            run_id TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT UNIQUE NOT NULL,
            started_at TEXT NOT NULL,
            input TEXT,
            total_records INTEGER NOT NULL,
            resolved_records INTEGER NOT NULL,
            unresolved_records INTEGER NOT NULL,
            latest_year INTEGER,
            resolution_fingerprint TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_year_province ON members(year, province)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// MEMBERS
// ============================================================================

/// Insert enriched records; rows already present are overwritten with the
/// latest values of every column.
pub fn insert_enriched_records(
    conn: &Connection,
    records: &[EnrichedRecord],
    run_id: &str,
) -> Result<PersistStats> {
    let tx = conn.unchecked_transaction()?;
    let stats = upsert_members(&tx, records, run_id)?;
    tx.commit()?;

    log_persisted(&stats);
    Ok(stats)
}

/// Persist the enriched records and the run row in one transaction
///
/// Either both land or neither does.
pub fn persist_run(
    conn: &Connection,
    records: &[EnrichedRecord],
    run: &RunRecord,
) -> Result<PersistStats> {
    let tx = conn.unchecked_transaction()?;
    let stats = upsert_members(&tx, records, &run.run_id)?;
    insert_run(&tx, run)?;
    tx.commit()?;

    log_persisted(&stats);
    Ok(stats)
}

fn upsert_members(
    conn: &Connection,
    records: &[EnrichedRecord],
    run_id: &str,
) -> Result<PersistStats> {
    let mut stats = PersistStats::default();
    let now = Utc::now().to_rfc3339();

    for enriched in records {
        let hash = record_hash(enriched);
        let r = &enriched.record;

        let previous: Option<Option<String>> = conn
            .query_row(
                "SELECT province FROM members WHERE record_hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;

        conn.execute(
            "INSERT INTO members (
                record_hash, member_id, year, city, region, competitions, points, age,
                competitive, province, metropolitan, run_id, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(record_hash) DO UPDATE SET
                member_id = excluded.member_id,
                year = excluded.year,
                city = excluded.city,
                region = excluded.region,
                competitions = excluded.competitions,
                points = excluded.points,
                age = excluded.age,
                competitive = excluded.competitive,
                province = excluded.province,
                metropolitan = excluded.metropolitan,
                run_id = excluded.run_id,
                updated_at = excluded.updated_at",
            params![
                hash,
                r.member_id,
                r.year,
                r.city,
                r.region,
                r.competitions,
                r.points,
                r.age,
                r.competitive,
                enriched.province,
                enriched.metropolitan,
                run_id,
                now,
            ],
        )?;

        let Some(previous) = previous else {
            stats.inserted += 1;
            continue;
        };
        stats.refreshed += 1;

        if previous != enriched.province {
            stats.reassigned += 1;
            let event = Event::new(
                "province_reassigned",
                "member",
                &hash,
                serde_json::json!({
                    "member_id": r.member_id,
                    "year": r.year,
                    "from": previous,
                    "to": enriched.province,
                }),
                run_id,
            );
            insert_event(conn, &event)?;
        }
    }

    Ok(stats)
}

fn log_persisted(stats: &PersistStats) {
    info!(
        inserted = stats.inserted,
        refreshed = stats.refreshed,
        reassigned = stats.reassigned,
        "Persisted enriched records"
    );
}

pub fn count_members(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;

    Ok(count)
}

/// Stored province of one membership row, if the row exists
pub fn stored_province(
    conn: &Connection,
    member_id: &str,
    year: i32,
) -> Result<Option<Option<String>>> {
    let province = conn
        .query_row(
            "SELECT province FROM members WHERE member_id = ?1 AND year = ?2
             ORDER BY id LIMIT 1",
            params![member_id, year],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;

    Ok(province)
}

// ============================================================================
// RUNS
// ============================================================================

pub fn insert_run(conn: &Connection, run: &RunRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO runs (
            run_id, started_at, input, total_records, resolved_records,
            unresolved_records, latest_year, resolution_fingerprint
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            run.run_id,
            run.started_at.to_rfc3339(),
            run.input,
            run.total_records,
            run.resolved_records,
            run.unresolved_records,
            run.latest_year,
            run.resolution_fingerprint,
        ],
    )
    .with_context(|| format!("Failed to record run {}", run.run_id))?;

    let event = Event::new(
        "run_completed",
        "run",
        &run.run_id,
        serde_json::json!({
            "total_records": run.total_records,
            "unresolved_records": run.unresolved_records,
            "fingerprint": run.resolution_fingerprint,
        }),
        "pipeline",
    );
    insert_event(conn, &event)?;
    debug!(run_id = %run.run_id, "Run recorded");

    Ok(())
}

/// Runs, most recent first
pub fn get_runs(conn: &Connection) -> Result<Vec<RunRecord>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, started_at, input, total_records, resolved_records,
                unresolved_records, latest_year, resolution_fingerprint
         FROM runs
         ORDER BY started_at DESC, id DESC",
    )?;

    let runs = stmt
        .query_map([], |row| {
            let started_at: String = row.get(1)?;

            Ok(RunRecord {
                run_id: row.get(0)?,
                started_at: parse_timestamp(1, &started_at)?,
                input: row.get(2)?,
                total_records: row.get(3)?,
                resolved_records: row.get(4)?,
                unresolved_records: row.get(5)?,
                latest_year: row.get(6)?,
                resolution_fingerprint: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(runs)
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(1, &timestamp)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

// ============================================================================
// TESTS
// ============================================================================

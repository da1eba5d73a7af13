//! SQLite storage for status history.
//!
//! Every successful refresh cycle is stored as one `snapshots` row and one
//! `area_statuses` row per area. The newest snapshot is reloaded at startup so
//! the last known statuses are served until the first cycle completes.
//! Only the newest [`DEFAULT_HISTORY_SNAPSHOTS`] snapshots are kept unless
//! configured otherwise; older ones are pruned when a new one is recorded.

use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::dashboard::StatusSnapshot;
use crate::model::{CalculatedFloodStatus, FloodStatus, HistoryEntry};

/// Snapshots kept by default: one week at the default ten-minute interval.
pub const DEFAULT_HISTORY_SNAPSHOTS: u32 = 1008;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
    keep_snapshots: u32,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:siaga.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let mut options = SqlitePoolOptions::new().max_connections(5);
        if database_url.contains(":memory:") {
            // In-memory databases live and die with their single connection.
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(database_url).await?;

        let storage = Self {
            pool,
            keep_snapshots: DEFAULT_HISTORY_SNAPSHOTS,
        };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Keep at most `snapshots` snapshots (at least one).
    pub fn with_history_limit(mut self, snapshots: u32) -> Self {
        self.keep_snapshots = snapshots.max(1);
        self
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                computed_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS area_statuses (
                snapshot_id INTEGER NOT NULL REFERENCES snapshots(id),
                area TEXT NOT NULL,
                status TEXT NOT NULL,
                rain_duration INTEGER NOT NULL,
                is_raining INTEGER NOT NULL,
                dependency_met INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Per-area history lookups
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_area_statuses_area
            ON area_statuses(area, snapshot_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store every area status of a snapshot and prune old snapshots, in one
    /// transaction.
    pub async fn record_snapshot(&self, snapshot: &StatusSnapshot) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let snapshot_id = sqlx::query("INSERT INTO snapshots (computed_at) VALUES (?)")
            .bind(snapshot.computed_at.timestamp())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for (area, status) in &snapshot.statuses {
            sqlx::query(
                r#"
                INSERT INTO area_statuses
                    (snapshot_id, area, status, rain_duration, is_raining, dependency_met)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(snapshot_id)
            .bind(area)
            .bind(status.status.label())
            .bind(i64::from(status.current_rain_duration))
            .bind(status.is_raining_now)
            .bind(status.dependency_met)
            .execute(&mut *tx)
            .await?;
        }

        let keep = i64::from(self.keep_snapshots);
        sqlx::query(
            r#"
            DELETE FROM area_statuses WHERE snapshot_id IN (
                SELECT id FROM snapshots ORDER BY id DESC LIMIT -1 OFFSET ?
            )
            "#,
        )
        .bind(keep)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM snapshots WHERE id IN (
                SELECT id FROM snapshots ORDER BY id DESC LIMIT -1 OFFSET ?
            )
            "#,
        )
        .bind(keep)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Load the most recently stored snapshot, without forecasts.
    pub async fn latest_snapshot(&self) -> anyhow::Result<Option<StatusSnapshot>> {
        let row = sqlx::query("SELECT id, computed_at FROM snapshots ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let snapshot_id: i64 = row.get("id");
        let computed_at = from_unix(row.get("computed_at"))?;

        let rows = sqlx::query(
            r#"
            SELECT area, status, rain_duration, is_raining, dependency_met
            FROM area_statuses
            WHERE snapshot_id = ?
            "#,
        )
        .bind(snapshot_id)
        .fetch_all(&self.pool)
        .await?;

        let mut statuses = HashMap::with_capacity(rows.len());
        for row in &rows {
            statuses.insert(row.get::<String, _>("area"), decode_status(row)?);
        }

        Ok(Some(StatusSnapshot {
            computed_at,
            statuses,
            forecasts: HashMap::new(),
        }))
    }

    /// Stored statuses of one area, newest first.
    pub async fn area_history(&self, area: &str, limit: u32) -> anyhow::Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT s.computed_at, a.status, a.rain_duration, a.is_raining, a.dependency_met
            FROM area_statuses a
            JOIN snapshots s ON s.id = a.snapshot_id
            WHERE a.area = ?
            ORDER BY s.id DESC
            LIMIT ?
            "#,
        )
        .bind(area)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<HistoryEntry> {
                Ok(HistoryEntry {
                    computed_at: from_unix(row.get("computed_at"))?,
                    status: decode_status(row)?,
                })
            })
            .collect()
    }
}

fn from_unix(ts: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow!("invalid stored timestamp {ts}"))
}

fn decode_status(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<CalculatedFloodStatus> {
    let label: String = row.get("status");
    let status =
        FloodStatus::parse(&label).ok_or_else(|| anyhow!("unknown stored status '{label}'"))?;
    let duration: i64 = row.get("rain_duration");

    Ok(CalculatedFloodStatus {
        status,
        current_rain_duration: u32::try_from(duration)?,
        is_raining_now: row.get("is_raining"),
        dependency_met: row.get("dependency_met"),
    })
}

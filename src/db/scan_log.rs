use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{format_timestamp, parse_timestamp, StoreError};
use crate::models::{LogEntry, LogKind};

/// How far back an existing entry blocks a new one for the same EPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupScope {
    /// Any entry logged since the given instant (start of the local day).
    Since(DateTime<Utc>),
    /// Any entry still in the log.
    Anywhere,
}

/// Operator-facing error and duplicate logs.
///
/// One table is the only source for both the counts and the tables shown to
/// the operator. Entries are append-only apart from the daily cleanup and
/// single-entry removal.
#[derive(Debug, Clone)]
pub struct ScanLogRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    kind: String,
    epc: String,
    logged_at: String,
}

impl ScanLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends an entry unless one for the same EPC already exists within
    /// `scope`. Returns whether a row was inserted.
    pub async fn record(
        &self,
        kind: LogKind,
        epc: &str,
        scope: DedupScope,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = match scope {
            DedupScope::Since(since) => {
                sqlx::query_scalar(
                    "SELECT id FROM scan_logs WHERE kind = ? AND epc = ? AND logged_at >= ? LIMIT 1",
                )
                .bind(kind.as_str())
                .bind(epc)
                .bind(format_timestamp(&since))
                .fetch_optional(&mut *tx)
                .await?
            }
            DedupScope::Anywhere => {
                sqlx::query_scalar("SELECT id FROM scan_logs WHERE kind = ? AND epc = ? LIMIT 1")
                    .bind(kind.as_str())
                    .bind(epc)
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };

        if existing.is_some() {
            return Ok(false);
        }

        sqlx::query("INSERT INTO scan_logs (kind, epc, logged_at) VALUES (?, ?, ?)")
            .bind(kind.as_str())
            .bind(epc)
            .bind(format_timestamp(&now))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn count(&self, kind: LogKind) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_logs WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Entries of one log, oldest first.
    pub async fn list(&self, kind: LogKind) -> Result<Vec<LogEntry>, StoreError> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, kind, epc, logged_at FROM scan_logs WHERE kind = ? ORDER BY logged_at, id",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate).collect()
    }

    /// Removes one entry of the given log. Returns false if it did not exist.
    pub async fn remove(&self, kind: LogKind, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM scan_logs WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Drops every entry, of both logs, logged before `cutoff`.
    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM scan_logs WHERE logged_at < ?")
            .bind(format_timestamp(&cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn hydrate(row: LogRow) -> Result<LogEntry, StoreError> {
    Ok(LogEntry {
        id: row.id,
        kind: row.kind.parse().map_err(StoreError::Corrupt)?,
        epc: row.epc,
        logged_at: parse_timestamp(&row.logged_at)?,
    })
}

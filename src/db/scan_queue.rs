use sqlx::SqlitePool;

use super::{format_timestamp, parse_timestamp, StoreError};
use crate::models::{Epc, NewScan, RecordId, ScanRecord, SyncState};

/// Local durable queue of scans that have not reached the central database.
///
/// The queue is the single source of truth for "has this scan reached the
/// server yet". A record is flipped to `synced` before it becomes eligible
/// for removal, so a crash between `mark_synced` and `purge_synced` leaves it
/// out of `list_pending` and it is never resent.
#[derive(Debug, Clone)]
pub struct ScanQueue {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ScanRow {
    id: i64,
    epc: String,
    station_no: String,
    sync_state: String,
    created_at: String,
}

impl ScanQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, scan: &NewScan) -> Result<ScanRecord, StoreError> {
        let created_at = format_timestamp(&scan.created_at);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO scan_queue (epc, station_no, sync_state, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(scan.epc.as_str())
        .bind(&scan.station_no)
        .bind(SyncState::Pending.as_str())
        .bind(&created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(ScanRecord {
            id: RecordId(id),
            epc: scan.epc.clone(),
            station_no: scan.station_no.clone(),
            sync_state: SyncState::Pending,
            created_at: scan.created_at,
        })
    }

    /// Pending records, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<ScanRecord>, StoreError> {
        let rows: Vec<ScanRow> = sqlx::query_as(
            "SELECT id, epc, station_no, sync_state, created_at FROM scan_queue WHERE sync_state = ? ORDER BY created_at, id",
        )
        .bind(SyncState::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate).collect()
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<ScanRecord>, StoreError> {
        let row: Option<ScanRow> = sqlx::query_as(
            "SELECT id, epc, station_no, sync_state, created_at FROM scan_queue WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(hydrate).transpose()
    }

    /// Flips one record to `synced`. Returns false when the record is gone or
    /// already synced; a synced record is never touched again.
    pub async fn mark_synced(&self, id: RecordId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE scan_queue SET sync_state = ? WHERE id = ? AND sync_state = ?")
            .bind(SyncState::Synced.as_str())
            .bind(id.0)
            .bind(SyncState::Pending.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Removes every synced record in one statement. Cleanup only.
    pub async fn purge_synced(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM scan_queue WHERE sync_state = ?")
            .bind(SyncState::Synced.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_pending(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_queue WHERE sync_state = ?")
            .bind(SyncState::Pending.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}

fn hydrate(row: ScanRow) -> Result<ScanRecord, StoreError> {
    let epc = Epc::parse(&row.epc)
        .map_err(|e| StoreError::Corrupt(format!("scan {}: {}", row.id, e)))?;
    let sync_state = row
        .sync_state
        .parse::<SyncState>()
        .map_err(StoreError::Corrupt)?;

    Ok(ScanRecord {
        id: RecordId(row.id),
        epc,
        station_no: row.station_no,
        sync_state,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

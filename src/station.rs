//! The scanning station: the request/response surface the operator
//! interface calls into.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::audit::AuditLog;
use crate::classifier::{classify, OperatorAction, ScanOutcome};
use crate::config::StationConfig;
use crate::connectivity::ConnectivityState;
use crate::db::{DedupScope, ScanLogRepository, ScanQueue, StoreError};
use crate::gateway::{GatewayError, RemoteGateway};
use crate::models::{
    start_of_day, CountQuery, DeleteRecord, DeleteSummary, Epc, EpcError, LogKind, NewScan,
    RecordId, RemoteRecord, UpsertEpc,
};
use crate::sync::{DrainOutcome, SyncReconciler};

/// Rows shown in the recent-records table.
pub const RECENT_RECORDS_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum StationError {
    /// The local store could not save or read; nothing else to fall back on.
    #[error("Data not saved locally: {0}")]
    LocalPersistence(#[from] StoreError),

    /// A remote read or delete failed. Only scans have an offline fallback.
    #[error("Central database unavailable: {0}")]
    Remote(#[from] GatewayError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// What the operator sees after a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFeedback {
    Accepted { epc: Epc },
    /// Tag not paired, or the procedure reported an error.
    Unmatched { epc: Epc, newly_logged: bool },
    /// Tag was already scanned on a previous day.
    ScannedPriorDay { epc: Epc, newly_logged: bool },
    /// The central database was not reachable; the scan is in the local queue.
    SavedOffline { epc: Epc, record_id: RecordId },
    /// Input failed the boundary check and was discarded.
    Invalid { input: String, error: EpcError },
    /// Another scan is still in flight.
    Busy,
}

impl ScanFeedback {
    /// Whether counts and the records table should be refreshed.
    pub fn refreshes_view(&self) -> bool {
        matches!(self, ScanFeedback::Accepted { .. })
    }
}

impl fmt::Display for ScanFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanFeedback::Accepted { epc } => write!(f, "OK: {}", epc),
            ScanFeedback::Unmatched { epc, .. } => {
                write!(f, "Tag not paired or in error: {}", epc)
            }
            ScanFeedback::ScannedPriorDay { epc, .. } => {
                write!(f, "Tag already scanned on a previous day: {}", epc)
            }
            ScanFeedback::SavedOffline { epc, .. } => {
                write!(f, "Offline: data saved locally ({})", epc)
            }
            ScanFeedback::Invalid { error, .. } => write!(f, "Ignored input: {}", error),
            ScanFeedback::Busy => write!(f, "Previous scan still in progress"),
        }
    }
}

/// Local counters for the operator view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalCounts {
    pub errors: u64,
    pub duplicates: u64,
    pub pending: u64,
}

/// Distinct EPCs recorded today, as reported by the central database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoteCounts {
    pub station: u64,
    pub customer: Option<u64>,
}

pub struct Station<G> {
    config: StationConfig,
    queue: ScanQueue,
    logs: ScanLogRepository,
    audit: AuditLog,
    connectivity: ConnectivityState,
    gateway: Arc<G>,
    reconciler: Arc<SyncReconciler<G>>,
    in_flight: Mutex<()>,
}

impl<G: RemoteGateway> Station<G> {
    pub fn new(
        config: StationConfig,
        pool: SqlitePool,
        gateway: G,
        connectivity: ConnectivityState,
        audit: AuditLog,
    ) -> Self {
        let queue = ScanQueue::new(pool.clone());
        let gateway = Arc::new(gateway);
        let reconciler = Arc::new(SyncReconciler::new(
            queue.clone(),
            gateway.clone(),
            connectivity.clone(),
            audit.clone(),
        ));

        Self {
            config,
            queue,
            logs: ScanLogRepository::new(pool),
            audit,
            connectivity,
            gateway,
            reconciler,
            in_flight: Mutex::new(()),
        }
    }

    pub fn station_no(&self) -> &str {
        &self.config.station_no
    }

    pub fn connectivity(&self) -> &ConnectivityState {
        &self.connectivity
    }

    pub fn reconciler(&self) -> Arc<SyncReconciler<G>> {
        self.reconciler.clone()
    }

    /// Validates and records one scan.
    ///
    /// Only a local-store failure is an error. A transport failure is not:
    /// the scan goes to the offline queue instead.
    pub async fn submit_scan(&self, input: &str) -> Result<ScanFeedback, StationError> {
        let epc = match Epc::parse(input) {
            Ok(epc) => epc,
            Err(error) => {
                tracing::debug!("Rejected scanner input {:?}: {}", input, error);
                return Ok(ScanFeedback::Invalid {
                    input: input.to_string(),
                    error,
                });
            }
        };

        let Ok(_in_flight) = self.in_flight.try_lock() else {
            return Ok(ScanFeedback::Busy);
        };

        if !self.connectivity.is_online() {
            return self.queue_offline(epc).await;
        }

        let request = UpsertEpc::new(epc.clone(), self.config.station_no.clone());
        let result = self.gateway.upsert_epc(&request).await;
        if let Err(e) = &result {
            tracing::warn!("Error executing stored procedure for {}: {}", epc, e);
        }

        let now = Local::now();
        match classify(ScanOutcome::from_result(&result)) {
            OperatorAction::ShowSuccess => {
                if let Err(e) = self.audit.scan_success(&epc) {
                    tracing::warn!("Failed to write audit log: {}", e);
                }
                tracing::info!("EPC scan success: {}", epc);
                Ok(ScanFeedback::Accepted { epc })
            }
            OperatorAction::NotifyUnmatched => {
                let scope = DedupScope::Since(start_of_day(&now));
                let newly_logged = self.log_rejection(LogKind::Error, &epc, scope, &now).await;
                Ok(ScanFeedback::Unmatched { epc, newly_logged })
            }
            OperatorAction::NotifyPriorDay => {
                let newly_logged = self
                    .log_rejection(LogKind::Duplicate, &epc, DedupScope::Anywhere, &now)
                    .await;
                Ok(ScanFeedback::ScannedPriorDay { epc, newly_logged })
            }
            OperatorAction::QueueOffline => self.queue_offline(epc).await,
        }
    }

    async fn queue_offline(&self, epc: Epc) -> Result<ScanFeedback, StationError> {
        let scan = NewScan::new(epc.clone(), self.config.station_no.clone());
        let record = self.queue.enqueue(&scan).await.map_err(|e| {
            tracing::error!("Error saving {} to offline queue: {}", epc, e);
            e
        })?;

        tracing::info!("Saved {} to offline queue as record {}", epc, record.id);
        Ok(ScanFeedback::SavedOffline {
            epc,
            record_id: record.id,
        })
    }

    /// The rejection has already been shown; a failing log write only
    /// loses the count entry.
    async fn log_rejection<Tz: TimeZone>(
        &self,
        kind: LogKind,
        epc: &Epc,
        scope: DedupScope,
        now: &DateTime<Tz>,
    ) -> bool {
        match self
            .logs
            .record(kind, epc.as_str(), scope, now.with_timezone(&Utc))
            .await
        {
            Ok(inserted) => {
                if !inserted {
                    tracing::debug!("EPC {} already in {} log", epc, kind);
                }
                inserted
            }
            Err(e) => {
                tracing::warn!("Failed to write {} log for {}: {}", kind, epc, e);
                false
            }
        }
    }

    /// Drains the offline queue now.
    pub async fn sync(&self) -> DrainOutcome {
        self.reconciler.drain().await
    }

    pub async fn local_counts(&self) -> Result<LocalCounts, StationError> {
        Ok(LocalCounts {
            errors: self.logs.count(LogKind::Error).await?,
            duplicates: self.logs.count(LogKind::Duplicate).await?,
            pending: self.queue.count_pending().await?,
        })
    }

    pub async fn remote_counts(&self) -> Result<RemoteCounts, StationError> {
        let station = self
            .gateway
            .count_today(&CountQuery {
                factory_code: self.config.factory_code.clone(),
                station_no: self.config.station_no.clone(),
            })
            .await?;

        let customer = match &self.config.station_no_cus {
            Some(station_no) => Some(
                self.gateway
                    .count_today(&CountQuery {
                        factory_code: self.config.factory_code.clone(),
                        station_no: station_no.clone(),
                    })
                    .await?,
            ),
            None => None,
        };

        Ok(RemoteCounts { station, customer })
    }

    pub async fn recent_records(&self) -> Result<Vec<RemoteRecord>, StationError> {
        Ok(self
            .gateway
            .recent_records(&self.config.station_no, RECENT_RECORDS_LIMIT)
            .await?)
    }

    /// Deletes a record from the primary and backup tables. Failures are
    /// reported, never retried.
    pub async fn delete_record(
        &self,
        matchkeyid: &str,
        epc: &str,
        station_no: Option<&str>,
    ) -> Result<DeleteSummary, StationError> {
        let station_no = station_no.unwrap_or(&self.config.station_no);
        let request =
            DeleteRecord::new(matchkeyid, station_no, epc).map_err(StationError::InvalidRequest)?;

        let summary = self.gateway.delete_record(&request).await.map_err(|e| {
            tracing::error!("Error deleting record {}: {}", request.matchkeyid, e);
            e
        })?;

        if let Err(e) = self.audit.deletion(&request) {
            tracing::warn!("Failed to write delete log: {}", e);
        }
        tracing::info!(
            "Deleted record {} (EPC {}), {} primary / {} backup row(s)",
            request.matchkeyid,
            request.epc,
            summary.primary_deleted,
            summary.backup_deleted
        );

        Ok(summary)
    }

    /// Drops log entries from before the start of `now`'s day.
    pub async fn clean_logs<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<u64, StationError> {
        let removed = self.logs.purge_before(start_of_day(now)).await?;
        if removed > 0 {
            tracing::info!("Removed {} log entr(ies) from previous days", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::testing::{epc, MockGateway};
    use chrono::Duration;
    use tempfile::TempDir;

    struct TestContext {
        station: Station<MockGateway>,
        pool: SqlitePool,
        audit: AuditLog,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    fn station_config() -> StationConfig {
        StationConfig {
            station_no: "A1".to_string(),
            station_no_cus: Some("A1CUS".to_string()),
            factory_code: "F01".to_string(),
        }
    }

    async fn setup(gateway: MockGateway) -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let audit = AuditLog::new(temp_dir.path().join("log"));
        let station = Station::new(
            station_config(),
            pool.clone(),
            gateway,
            ConnectivityState::new(),
            audit.clone(),
        );
        TestContext {
            station,
            pool,
            audit,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_accepted_scan_is_audited() {
        let ctx = setup(MockGateway::new()).await;

        let feedback = ctx.station.submit_scan(epc(1).as_str()).await.unwrap();
        assert_eq!(feedback, ScanFeedback::Accepted { epc: epc(1) });
        assert!(feedback.refreshes_view());

        let audit = std::fs::read_to_string(ctx.audit.success_log_path()).unwrap();
        assert!(audit.contains(&format!("EPC Scan Success: {}", epc(1))));
        assert_eq!(ctx.station.gateway.upserts.lock().unwrap()[0].station_no, "A1");
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_call() {
        let ctx = setup(MockGateway::new()).await;

        let feedback = ctx
            .station
            .submit_scan("1234567890123456789012E")
            .await
            .unwrap();
        assert!(matches!(feedback, ScanFeedback::Invalid { .. }));

        let feedback = ctx
            .station
            .submit_scan("E1234567890123456789012")
            .await
            .unwrap();
        assert!(matches!(
            feedback,
            ScanFeedback::Invalid {
                error: EpcError::WrongLength(23),
                ..
            }
        ));

        assert_eq!(ctx.station.gateway.upsert_count(), 0);
        assert_eq!(ctx.station.local_counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn test_unmatched_logged_once_per_day() {
        let ctx = setup(MockGateway::new().with_code(&epc(1), 0)).await;

        let first = ctx.station.submit_scan(epc(1).as_str()).await.unwrap();
        let second = ctx.station.submit_scan(epc(1).as_str()).await.unwrap();

        assert_eq!(
            first,
            ScanFeedback::Unmatched {
                epc: epc(1),
                newly_logged: true
            }
        );
        assert_eq!(
            second,
            ScanFeedback::Unmatched {
                epc: epc(1),
                newly_logged: false
            }
        );
        assert_eq!(ctx.station.local_counts().await.unwrap().errors, 1);
        assert!(!ctx.audit.success_log_path().exists());
    }

    #[tokio::test]
    async fn test_prior_day_goes_to_duplicate_log() {
        let ctx = setup(MockGateway::new().with_code(&epc(2), -1)).await;

        let feedback = ctx.station.submit_scan(epc(2).as_str()).await.unwrap();
        assert_eq!(
            feedback,
            ScanFeedback::ScannedPriorDay {
                epc: epc(2),
                newly_logged: true
            }
        );
        ctx.station.submit_scan(epc(2).as_str()).await.unwrap();

        let counts = ctx.station.local_counts().await.unwrap();
        assert_eq!(counts.duplicates, 1);
        assert_eq!(counts.errors, 0);
        assert_eq!(counts.pending, 0);
    }

    #[tokio::test]
    async fn test_transport_error_queues_instead_of_rejecting() {
        let ctx = setup(MockGateway::new().with_failure(&epc(3))).await;

        let feedback = ctx.station.submit_scan(epc(3).as_str()).await.unwrap();
        assert!(matches!(feedback, ScanFeedback::SavedOffline { .. }));

        let counts = ctx.station.local_counts().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.errors, 0);
        assert_eq!(counts.duplicates, 0);
    }

    #[tokio::test]
    async fn test_offline_scan_skips_gateway() {
        let ctx = setup(MockGateway::new()).await;
        ctx.station.connectivity().set_online(false);

        let feedback = ctx.station.submit_scan(epc(4).as_str()).await.unwrap();
        assert!(matches!(feedback, ScanFeedback::SavedOffline { .. }));
        assert_eq!(ctx.station.gateway.upsert_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_then_online_round_trip() {
        let ctx = setup(MockGateway::new()).await;
        ctx.station.connectivity().set_online(false);
        ctx.station.submit_scan(epc(5).as_str()).await.unwrap();

        assert_eq!(ctx.station.sync().await, DrainOutcome::Offline);

        ctx.station.connectivity().set_online(true);
        let outcome = ctx.station.sync().await;
        assert!(outcome.success());

        assert_eq!(ctx.station.gateway.upserts_for(&epc(5)), 1);
        assert_eq!(ctx.station.local_counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn test_queue_failure_is_surfaced() {
        let ctx = setup(MockGateway::new()).await;
        ctx.station.connectivity().set_online(false);
        ctx.pool.close().await;

        let result = ctx.station.submit_scan(epc(6).as_str()).await;
        assert!(matches!(result, Err(StationError::LocalPersistence(_))));
    }

    #[tokio::test]
    async fn test_scan_while_in_flight_is_busy() {
        let ctx = setup(MockGateway::new()).await;

        let _held = ctx.station.in_flight.lock().await;
        let feedback = ctx.station.submit_scan(epc(7).as_str()).await.unwrap();
        assert_eq!(feedback, ScanFeedback::Busy);
    }

    #[tokio::test]
    async fn test_remote_counts_include_customer_station() {
        let ctx = setup(MockGateway::new()).await;

        let counts = ctx.station.remote_counts().await.unwrap();
        assert_eq!(counts.station, 17);
        assert_eq!(counts.customer, Some(3));

        let queries = ctx.station.gateway.count_queries.lock().unwrap();
        assert!(queries.iter().all(|q| q.factory_code == "F01"));
    }

    #[tokio::test]
    async fn test_remote_failures_surface_for_reads() {
        let ctx = setup(MockGateway::new()).await;
        ctx.station.gateway.set_fail_all(true);

        assert!(matches!(
            ctx.station.remote_counts().await,
            Err(StationError::Remote(_))
        ));
        assert!(matches!(
            ctx.station.recent_records().await,
            Err(StationError::Remote(_))
        ));
        assert!(matches!(
            ctx.station
                .delete_record("1", epc(1).as_str(), None)
                .await,
            Err(StationError::Remote(_))
        ));
        assert!(!ctx.audit.delete_log_path().exists());
    }

    #[tokio::test]
    async fn test_delete_record_writes_delete_log() {
        let ctx = setup(MockGateway::new()).await;

        let summary = ctx
            .station
            .delete_record("99", epc(8).as_str(), Some("P"))
            .await
            .unwrap();
        assert_eq!(summary.primary_deleted, 1);

        let deletes = ctx.station.gateway.deletes.lock().unwrap().clone();
        assert_eq!(deletes[0].station_no, "P");

        let log = std::fs::read_to_string(ctx.audit.delete_log_path()).unwrap();
        assert!(log.contains(&format!(
            "Matchkeyid Deleted: 99, EPC: {}, stationNo: P",
            epc(8)
        )));
    }

    #[tokio::test]
    async fn test_delete_record_rejects_blank_key() {
        let ctx = setup(MockGateway::new()).await;

        let result = ctx.station.delete_record(" ", epc(8).as_str(), None).await;
        assert!(matches!(result, Err(StationError::InvalidRequest(_))));
        assert!(ctx.station.gateway.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clean_logs_drops_previous_days() {
        let ctx = setup(MockGateway::new()).await;
        let logs = ScanLogRepository::new(ctx.pool.clone());
        let now = Local::now();

        logs.record(
            LogKind::Error,
            epc(1).as_str(),
            DedupScope::Anywhere,
            start_of_day(&now) - Duration::minutes(1),
        )
        .await
        .unwrap();
        logs.record(
            LogKind::Error,
            epc(2).as_str(),
            DedupScope::Anywhere,
            now.with_timezone(&Utc),
        )
        .await
        .unwrap();

        assert_eq!(ctx.station.clean_logs(&now).await.unwrap(), 1);
        let remaining = logs.list(LogKind::Error).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].epc, epc(2).as_str());
        assert_eq!(ctx.station.local_counts().await.unwrap().errors, 1);
    }
}

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::audit::AuditLog;
use crate::classifier::ScanOutcome;
use crate::connectivity::ConnectivityState;
use crate::db::ScanQueue;
use crate::gateway::RemoteGateway;
use crate::models::{ScanRecord, UpsertEpc};

/// Per-record results of one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Records read from the queue
    pub attempted: usize,
    /// Records whose call executed and that are now marked synced
    pub synced: usize,
    /// Records left pending (call failed, or marking failed)
    pub failed: usize,
    /// Synced records the procedure accepted
    pub accepted: usize,
    /// Synced records the procedure rejected (unmatched or prior-day)
    pub rejected: usize,
    /// Synced rows removed by the final cleanup
    pub purged: u64,
}

/// How a drain request ended. Never an error: per-record failures are
/// inside [`DrainReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Not online; nothing was attempted.
    Offline,
    /// Another drain is running; this request was ignored.
    AlreadyRunning,
    /// The queue had no pending records.
    NothingToSync,
    /// The batch ran.
    Completed(DrainReport),
    /// The pending list could not be read.
    Aborted(String),
}

impl DrainOutcome {
    /// Whether the drain ran (or had nothing to do), regardless of how many
    /// individual records synced.
    pub fn success(&self) -> bool {
        matches!(self, DrainOutcome::NothingToSync | DrainOutcome::Completed(_))
    }
}

impl fmt::Display for DrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainOutcome::Offline => write!(f, "Network is offline."),
            DrainOutcome::AlreadyRunning => write!(f, "Sync already in progress."),
            DrainOutcome::NothingToSync => write!(f, "No data to sync."),
            DrainOutcome::Completed(report) if report.failed == 0 => write!(
                f,
                "Sync completed: {} record(s) synced.",
                report.synced
            ),
            DrainOutcome::Completed(report) => write!(
                f,
                "Sync completed: {} record(s) synced, {} still pending.",
                report.synced, report.failed
            ),
            DrainOutcome::Aborted(e) => write!(f, "Sync aborted: {}", e),
        }
    }
}

/// Replays pending scans into the gateway.
///
/// State machine `Idle -> Draining -> Idle`; a drain requested while one is
/// running is ignored, since the running one would otherwise race it over
/// records it is marking synced.
pub struct SyncReconciler<G> {
    queue: ScanQueue,
    gateway: Arc<G>,
    connectivity: ConnectivityState,
    audit: AuditLog,
    draining: AtomicBool,
}

/// Resets the draining flag on every exit path.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<G: RemoteGateway> SyncReconciler<G> {
    pub fn new(
        queue: ScanQueue,
        gateway: Arc<G>,
        connectivity: ConnectivityState,
        audit: AuditLog,
    ) -> Self {
        Self {
            queue,
            gateway,
            connectivity,
            audit,
            draining: AtomicBool::new(false),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub async fn drain(&self) -> DrainOutcome {
        if !self.connectivity.is_online() {
            tracing::info!("Network is still offline. Cannot sync.");
            return DrainOutcome::Offline;
        }

        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            tracing::debug!("Drain already running, ignoring trigger");
            return DrainOutcome::AlreadyRunning;
        };

        let pending = match self.queue.list_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!("Failed to read offline queue: {}", e);
                return DrainOutcome::Aborted(e.to_string());
            }
        };

        if pending.is_empty() {
            tracing::info!("No offline data to sync.");
            return DrainOutcome::NothingToSync;
        }

        tracing::info!("Syncing {} offline record(s)", pending.len());

        let mut report = DrainReport {
            attempted: pending.len(),
            ..DrainReport::default()
        };

        for record in &pending {
            self.sync_record(record, &mut report).await;
        }

        match self.queue.purge_synced().await {
            Ok(purged) => {
                report.purged = purged;
                tracing::info!("Deleted {} synced record(s)", purged);
            }
            // Synced rows are already excluded from the pending list; the
            // next drain removes them.
            Err(e) => tracing::warn!("Failed to purge synced records: {}", e),
        }

        tracing::info!(
            "Sync finished: {} synced, {} failed, {} rejected",
            report.synced,
            report.failed,
            report.rejected
        );

        DrainOutcome::Completed(report)
    }

    async fn sync_record(&self, record: &ScanRecord, report: &mut DrainReport) {
        let request = UpsertEpc::new(record.epc.clone(), record.station_no.clone());

        let code = match self.gateway.upsert_epc(&request).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!("Error syncing record {} ({}): {}", record.id, record.epc, e);
                report.failed += 1;
                return;
            }
        };

        match self.queue.mark_synced(record.id).await {
            Ok(_) => report.synced += 1,
            Err(e) => {
                tracing::warn!("Failed to mark record {} synced: {}", record.id, e);
                report.failed += 1;
                return;
            }
        }

        match ScanOutcome::from_return_code(code) {
            ScanOutcome::Accepted => {
                report.accepted += 1;
                if let Err(e) = self.audit.scan_success(&record.epc) {
                    tracing::warn!("Failed to write audit log: {}", e);
                }
            }
            outcome => {
                report.rejected += 1;
                tracing::warn!("Queued scan {} was {}", record.epc, outcome);
            }
        }
    }
}

/// Drains after every False→True edge of the connectivity flag, waiting
/// `delay` first so the link can settle. Runs until the state is dropped.
///
/// The subscription and the starting value are taken when this is called,
/// not when the returned future is first polled, so an edge that happens
/// before a spawned task gets scheduled is still seen.
pub fn drain_on_reconnect<G: RemoteGateway + 'static>(
    reconciler: Arc<SyncReconciler<G>>,
    delay: Duration,
) -> impl Future<Output = ()> + Send + 'static {
    let mut online = reconciler.connectivity.subscribe();
    let mut was_online = *online.borrow_and_update();

    async move {
        while online.changed().await.is_ok() {
            let now_online = *online.borrow_and_update();
            if now_online && !was_online {
                tracing::info!("Back online, syncing offline data");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let outcome = reconciler.drain().await;
                if outcome.success() {
                    tracing::info!("{}", outcome);
                } else {
                    tracing::warn!("{}", outcome);
                }
            }
            was_online = now_online;
        }
    }
}

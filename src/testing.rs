//! Test doubles shared by the reconciler and station tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::gateway::{GatewayError, RemoteGateway};
use crate::models::{CountQuery, DeleteRecord, DeleteSummary, Epc, RemoteRecord, UpsertEpc};

pub(crate) fn epc(n: u32) -> Epc {
    Epc::parse(&format!("E2801160600002{:010}", n)).unwrap()
}

/// Scripted gateway. Upserts return `1` unless a code was set for the EPC;
/// EPCs in `failing` (or every call when `fail_all` is set) get a
/// connection error.
#[derive(Default)]
pub(crate) struct MockGateway {
    codes: Mutex<HashMap<String, i32>>,
    failing: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    gate: Option<Arc<Notify>>,
    pub upserts: Mutex<Vec<UpsertEpc>>,
    pub deletes: Mutex<Vec<DeleteRecord>>,
    pub count_queries: Mutex<Vec<CountQuery>>,
    pub records: Vec<RemoteRecord>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert waits for a `notify_one` on the gate before answering.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_code(self, epc: &Epc, code: i32) -> Self {
        self.codes
            .lock()
            .unwrap()
            .insert(epc.as_str().to_string(), code);
        self
    }

    pub fn with_failure(self, epc: &Epc) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(epc.as_str().to_string());
        self
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }

    pub fn upserts_for(&self, epc: &Epc) -> usize {
        self.upserts
            .lock()
            .unwrap()
            .iter()
            .filter(|u| &u.epc == epc)
            .count()
    }

    fn check_transport(&self, epc: Option<&str>) -> Result<(), GatewayError> {
        let failing = epc
            .map(|e| self.failing.lock().unwrap().contains(e))
            .unwrap_or(false);
        if failing || self.fail_all.load(Ordering::SeqCst) {
            return Err(GatewayError::Connection("connection refused".to_string()));
        }
        Ok(())
    }
}

impl RemoteGateway for MockGateway {
    async fn upsert_epc(&self, request: &UpsertEpc) -> Result<i32, GatewayError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.upserts.lock().unwrap().push(request.clone());
        self.check_transport(Some(request.epc.as_str()))?;

        let code = self
            .codes
            .lock()
            .unwrap()
            .get(request.epc.as_str())
            .copied()
            .unwrap_or(1);
        Ok(code)
    }

    async fn count_today(&self, query: &CountQuery) -> Result<u64, GatewayError> {
        self.check_transport(None)?;
        self.count_queries.lock().unwrap().push(query.clone());
        Ok(if query.station_no.ends_with("CUS") { 3 } else { 17 })
    }

    async fn recent_records(
        &self,
        _station_no: &str,
        limit: u32,
    ) -> Result<Vec<RemoteRecord>, GatewayError> {
        self.check_transport(None)?;
        Ok(self.records.iter().take(limit as usize).cloned().collect())
    }

    async fn delete_record(&self, request: &DeleteRecord) -> Result<DeleteSummary, GatewayError> {
        self.check_transport(None)?;
        self.deletes.lock().unwrap().push(request.clone());
        Ok(DeleteSummary {
            primary_deleted: 1,
            backup_deleted: 1,
        })
    }
}

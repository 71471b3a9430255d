use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::epc::Epc;

/// Identifier assigned by the local store. Stable across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Pending,
    Synced,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Synced => "synced",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncState::Pending),
            "synced" => Ok(SyncState::Synced),
            _ => Err(format!(
                "Invalid sync state '{}'. Valid options: pending, synced",
                s
            )),
        }
    }
}

/// A scan that has not been confirmed by the central database yet.
#[derive(Debug, Clone)]
pub struct NewScan {
    pub epc: Epc,
    pub station_no: String,
    pub created_at: DateTime<Utc>,
}

impl NewScan {
    pub fn new(epc: Epc, station_no: impl Into<String>) -> Self {
        Self {
            epc,
            station_no: station_no.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A write held by the local queue.
///
/// Once `sync_state` is `Synced` the record is never mutated again; it only
/// waits for `purge_synced`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRecord {
    pub id: RecordId,
    pub epc: Epc,
    pub station_no: String,
    pub sync_state: SyncState,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn is_pending(&self) -> bool {
        self.sync_state == SyncState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_roundtrip_str() {
        for state in [SyncState::Pending, SyncState::Synced] {
            assert_eq!(SyncState::from_str(state.as_str()).unwrap(), state);
        }
        assert_eq!(SyncState::from_str("SYNCED").unwrap(), SyncState::Synced);
        assert!(SyncState::from_str("done").is_err());
    }

    #[test]
    fn test_new_scan_keeps_station() {
        let epc = Epc::parse("E28011606000020A1B2C3D4F").unwrap();
        let scan = NewScan::new(epc.clone(), "A1");
        assert_eq!(scan.epc, epc);
        assert_eq!(scan.station_no, "A1");
    }
}

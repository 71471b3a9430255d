//! Typed parameters for each call made against the central database, and
//! the rows it hands back.

use serde::{Deserialize, Serialize};

use super::epc::Epc;

/// Parameters of the upsert stored procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertEpc {
    #[serde(rename = "EPC")]
    pub epc: Epc,
    #[serde(rename = "StationNo")]
    pub station_no: String,
}

impl UpsertEpc {
    pub fn new(epc: Epc, station_no: impl Into<String>) -> Self {
        Self {
            epc,
            station_no: station_no.into(),
        }
    }
}

/// Distinct EPCs recorded today by one station of one factory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountQuery {
    pub factory_code: String,
    pub station_no: String,
}

/// Removes one matched record from the primary and backup tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteRecord {
    pub matchkeyid: String,
    pub station_no: String,
    pub epc: String,
}

impl DeleteRecord {
    /// Builds the request, rejecting blank keys before anything is sent.
    pub fn new(
        matchkeyid: impl Into<String>,
        station_no: impl Into<String>,
        epc: impl Into<String>,
    ) -> Result<Self, String> {
        let matchkeyid = matchkeyid.into().trim().to_string();
        let station_no = station_no.into().trim().to_string();
        let epc = epc.into().trim().to_uppercase();

        if matchkeyid.is_empty() {
            return Err("matchkeyid must not be empty".to_string());
        }
        if station_no.is_empty() {
            return Err("station number must not be empty".to_string());
        }

        Ok(Self {
            matchkeyid,
            station_no,
            epc,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub primary_deleted: u64,
    pub backup_deleted: u64,
}

/// A row of the station's most recent matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub epc_code: String,
    #[serde(default)]
    pub size_code: Option<String>,
    #[serde(default)]
    pub mo_no: Option<String>,
    pub matchkeyid: String,
}

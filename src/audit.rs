//! Append-only audit files kept next to the station.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::models::{DeleteRecord, Epc};

const SUCCESS_LOG: &str = "epc_success.log";
const DELETE_LOG: &str = "delete.log";

/// Writes one line per accepted scan and one per deleted record.
///
/// The directory is created on demand, so it may be removed while the
/// station runs.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn success_log_path(&self) -> PathBuf {
        self.dir.join(SUCCESS_LOG)
    }

    pub fn delete_log_path(&self) -> PathBuf {
        self.dir.join(DELETE_LOG)
    }

    pub fn scan_success(&self, epc: &Epc) -> io::Result<()> {
        self.scan_success_at(epc, Utc::now())
    }

    pub fn scan_success_at(&self, epc: &Epc, at: DateTime<Utc>) -> io::Result<()> {
        let line = format!("[{}] EPC Scan Success: {}", iso8601(&at), epc);
        self.append(SUCCESS_LOG, &line)
    }

    pub fn deletion(&self, request: &DeleteRecord) -> io::Result<()> {
        self.deletion_at(request, Utc::now())
    }

    pub fn deletion_at(&self, request: &DeleteRecord, at: DateTime<Utc>) -> io::Result<()> {
        let line = format!(
            "[{}] Matchkeyid Deleted: {}, EPC: {}, stationNo: {}",
            iso8601(&at),
            request.matchkeyid,
            request.epc,
            request.station_no
        );
        self.append(DELETE_LOG, &line)
    }

    fn append(&self, file_name: &str, line: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file_name))?;
        writeln!(file, "{}", line)
    }
}

fn iso8601(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

use chrono::{DateTime, LocalResult, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which operator-facing log an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Tag not paired, or the procedure reported an error (return code 0).
    Error,
    /// Tag already scanned on a previous day (return code -1).
    Duplicate,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Error => "error",
            LogKind::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "errors" => Ok(LogKind::Error),
            "duplicate" | "duplicates" => Ok(LogKind::Duplicate),
            _ => Err(format!(
                "Invalid log kind '{}'. Valid options: error, duplicate",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub kind: LogKind,
    pub epc: String,
    pub logged_at: DateTime<Utc>,
}

/// Midnight at the start of `now`'s calendar day in `now`'s own time zone,
/// expressed in UTC.
///
/// When midnight does not exist locally (a DST gap) the earliest valid
/// instant of that day is used.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let mut local = now.date_naive().and_time(NaiveTime::MIN);

    for _ in 0..24 {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => local += chrono::Duration::hours(1),
        }
    }

    now.with_timezone(&Utc)
}

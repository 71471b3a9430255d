mod epc;
mod log_entry;
mod remote;
mod scan_record;

pub use epc::{Epc, EpcError, EPC_LENGTH};
pub use log_entry::{start_of_day, LogEntry, LogKind};
pub use remote::{CountQuery, DeleteRecord, DeleteSummary, RemoteRecord, UpsertEpc};
pub use scan_record::{NewScan, RecordId, ScanRecord, SyncState};

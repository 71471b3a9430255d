//! RFID EPC scanning station.
//!
//! Every scan is validated, written to the central database through a
//! [`gateway::RemoteGateway`], classified by the procedure's return code and
//! reported back to the operator. When the central database cannot be
//! reached the scan is kept in a local SQLite queue ([`db::ScanQueue`]) and
//! replayed by [`sync::SyncReconciler`] once [`connectivity`] reports the
//! network back.

pub mod audit;
pub mod classifier;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod gateway;
pub mod models;
pub mod station;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use station::{LocalCounts, RemoteCounts, ScanFeedback, Station, StationError};

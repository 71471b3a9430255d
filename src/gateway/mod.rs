//! Remote write gateway: one network call against the central database per
//! operation.
//!
//! The gateway never decides what a return code means; it only reports
//! whether the call executed and what came back. Classification lives in
//! [`crate::classifier`].

mod http;

pub use http::HttpGateway;

use std::future::Future;
use thiserror::Error;

use crate::models::{CountQuery, DeleteRecord, DeleteSummary, RemoteRecord, UpsertEpc};

/// The call did not execute, or its response could not be read. Every
/// variant counts as a transport failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Remote database not configured. Add remote.server_url to config.")]
    NotConfigured,

    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Calls against the central database.
///
/// Every call owns its connection for the duration of the call and releases
/// it on every exit path. Implementations must accept a new call immediately
/// after the previous one returned.
pub trait RemoteGateway: Send + Sync {
    /// Runs the upsert stored procedure and returns its raw return code.
    fn upsert_epc(
        &self,
        request: &UpsertEpc,
    ) -> impl Future<Output = Result<i32, GatewayError>> + Send;

    /// Distinct EPCs recorded today for one station.
    fn count_today(
        &self,
        query: &CountQuery,
    ) -> impl Future<Output = Result<u64, GatewayError>> + Send;

    /// The station's most recent records, newest first.
    fn recent_records(
        &self,
        station_no: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<RemoteRecord>, GatewayError>> + Send;

    /// Deletes a record from the primary and backup tables together.
    fn delete_record(
        &self,
        request: &DeleteRecord,
    ) -> impl Future<Output = Result<DeleteSummary, GatewayError>> + Send;
}

//! Reconciliation of the local scan queue with the central database.
//!
//! Scans written while the station was offline sit in
//! [`crate::db::ScanQueue`] until connectivity comes back. The
//! [`SyncReconciler`] then replays them through the remote gateway, oldest
//! first, marking each one synced before any cleanup runs.
//!
//! # Triggers
//!
//! - a False→True edge of [`crate::connectivity::ConnectivityState`]
//!   (see [`drain_on_reconnect`])
//! - startup, when the first probe says online
//! - an explicit `epcscan sync`

mod reconciler;

pub use reconciler::{drain_on_reconnect, DrainOutcome, DrainReport, SyncReconciler};

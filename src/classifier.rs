//! Scan classification: what a remote write's result means for the operator.
//!
//! The line between "queue it offline" and "reject it" is drawn only by
//! whether the call executed. A call that executed and returned `0` or `-1`
//! is a business rejection and is never retried; a call that failed to
//! execute is a transport error and the scan goes to the local queue.

use serde::Serialize;
use std::fmt;

use crate::gateway::GatewayError;

pub const CODE_ACCEPTED: i32 = 1;
pub const CODE_UNMATCHED: i32 = 0;
pub const CODE_DUPLICATE_PRIOR_DAY: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Accepted,
    RejectedUnmatched,
    RejectedDuplicatePriorDay,
    TransportError,
}

impl ScanOutcome {
    /// Maps a stored procedure return code.
    ///
    /// Codes other than `1`, `0` and `-1` are treated as `RejectedUnmatched`:
    /// the procedure ran but did not confirm the record, so the operator is
    /// told the tag needs attention instead of being shown a success.
    pub fn from_return_code(code: i32) -> Self {
        match code {
            CODE_ACCEPTED => ScanOutcome::Accepted,
            CODE_DUPLICATE_PRIOR_DAY => ScanOutcome::RejectedDuplicatePriorDay,
            CODE_UNMATCHED => ScanOutcome::RejectedUnmatched,
            other => {
                tracing::warn!("Unknown upsert return code {}, treating as unmatched", other);
                ScanOutcome::RejectedUnmatched
            }
        }
    }

    /// Outcome of a gateway call, whether it executed or not.
    pub fn from_result(result: &Result<i32, GatewayError>) -> Self {
        match result {
            Ok(code) => Self::from_return_code(*code),
            Err(_) => ScanOutcome::TransportError,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ScanOutcome::RejectedUnmatched | ScanOutcome::RejectedDuplicatePriorDay
        )
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::Accepted => write!(f, "accepted"),
            ScanOutcome::RejectedUnmatched => write!(f, "rejected (unmatched)"),
            ScanOutcome::RejectedDuplicatePriorDay => write!(f, "rejected (scanned on a previous day)"),
            ScanOutcome::TransportError => write!(f, "transport error"),
        }
    }
}

/// What the station does with a classified scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorAction {
    /// Show success feedback, then refresh counts and the records table.
    ShowSuccess,
    /// "Tag not paired / error" notice, and an error-log entry (once per day).
    NotifyUnmatched,
    /// "Already scanned on a previous day" notice, and a duplicate-log entry.
    NotifyPriorDay,
    /// Put the original write in the local queue; no rejection is shown.
    QueueOffline,
}

pub fn classify(outcome: ScanOutcome) -> OperatorAction {
    match outcome {
        ScanOutcome::Accepted => OperatorAction::ShowSuccess,
        ScanOutcome::RejectedUnmatched => OperatorAction::NotifyUnmatched,
        ScanOutcome::RejectedDuplicatePriorDay => OperatorAction::NotifyPriorDay,
        ScanOutcome::TransportError => OperatorAction::QueueOffline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_codes() {
        assert_eq!(ScanOutcome::from_return_code(1), ScanOutcome::Accepted);
        assert_eq!(ScanOutcome::from_return_code(0), ScanOutcome::RejectedUnmatched);
        assert_eq!(
            ScanOutcome::from_return_code(-1),
            ScanOutcome::RejectedDuplicatePriorDay
        );
    }

    #[test]
    fn test_unknown_code_is_not_accepted() {
        assert_eq!(ScanOutcome::from_return_code(2), ScanOutcome::RejectedUnmatched);
        assert_eq!(ScanOutcome::from_return_code(-7), ScanOutcome::RejectedUnmatched);
    }

    #[test]
    fn test_failed_call_is_transport_error() {
        let result: Result<i32, GatewayError> = Err(GatewayError::Timeout);
        assert_eq!(ScanOutcome::from_result(&result), ScanOutcome::TransportError);
        assert_eq!(ScanOutcome::from_result(&Ok(0)), ScanOutcome::RejectedUnmatched);
    }

    #[test]
    fn test_actions() {
        assert_eq!(classify(ScanOutcome::Accepted), OperatorAction::ShowSuccess);
        assert_eq!(
            classify(ScanOutcome::RejectedUnmatched),
            OperatorAction::NotifyUnmatched
        );
        assert_eq!(
            classify(ScanOutcome::RejectedDuplicatePriorDay),
            OperatorAction::NotifyPriorDay
        );
        assert_eq!(
            classify(ScanOutcome::TransportError),
            OperatorAction::QueueOffline
        );
    }

    #[test]
    fn test_transport_error_is_not_a_rejection() {
        assert!(!ScanOutcome::TransportError.is_rejection());
        assert!(!ScanOutcome::Accepted.is_rejection());
        assert!(ScanOutcome::RejectedUnmatched.is_rejection());
        assert!(ScanOutcome::RejectedDuplicatePriorDay.is_rejection());
    }
}

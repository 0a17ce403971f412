//! Named per-iteration assertions, tallied for reporting.

use crate::probe::ProbeOutcome;

/// Name of the exact-status check.
pub const STATUS_IS_200: &str = "status is 200";

/// Name of the transport-level check.
pub const NO_CONNECTION_ERROR: &str = "no connection error";

/// A named boolean assertion evaluated against every probe outcome.
#[derive(Debug, Clone, Copy)]
pub struct Check {
    /// Name the tallies are reported under.
    pub name: &'static str,
    predicate: fn(&ProbeOutcome) -> bool,
}

impl Check {
    /// Evaluate the check against one outcome.
    pub fn evaluate(&self, outcome: &ProbeOutcome) -> bool {
        (self.predicate)(outcome)
    }
}

/// The two standard checks, in reporting order.
///
/// Every iteration records both; a failing first check never short-circuits
/// the second. The checks overlap on purpose: a non-200 response fails only
/// `status is 200`, while a connection failure fails both, so reporting keeps
/// "wrong status" and "no connection at all" distinguishable.
pub fn standard_checks() -> [Check; 2] {
    [
        Check {
            name: STATUS_IS_200,
            predicate: |outcome| matches!(outcome.status(), Some(status) if status.as_u16() == 200),
        },
        Check {
            name: NO_CONNECTION_ERROR,
            predicate: |outcome| !outcome.is_connection_failure(),
        },
    ]
}

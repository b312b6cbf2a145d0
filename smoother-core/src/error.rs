//! Error taxonomy for smoothing requests.

use thiserror::Error;

use crate::backend::{BackendError, SolveStatus};

/// Convenience alias for operations that can fail a smoothing request.
pub type SmootherResult<T> = Result<T, SmootherError>;

/// Everything that can fail a smoothing request.
///
/// Validation variants are raised before any backend contact; the remaining
/// variants carry the diagnostic detail of a failed or non-converged run.
/// All failures are local to one request and never panic.
#[derive(Debug, Error)]
pub enum SmootherError {
    #[error("reference points empty, solver early terminates")]
    EmptyReferenceLine,

    #[error("reference points and bounds size not equal, solver early terminates: {points} vs {bounds}")]
    BoundsLengthMismatch { points: usize, bounds: usize },

    #[error("reference points size smaller than 3, solver early terminates: {0}")]
    TooFewPoints(usize),

    #[error("reference points size too large, solver early terminates: {0}")]
    TooManyPoints(usize),

    /// Session creation or an incremental update failed inside the backend.
    #[error("qp backend error: {0}")]
    Backend(#[from] BackendError),

    /// The backend finished with an unacceptable status. Iteration 0 is the
    /// initial solve.
    #[error("qp solve failed at iteration {iteration} with status: {status}")]
    SolveFailed {
        iteration: usize,
        status: SolveStatus,
    },

    /// The outer loop exhausted its budget without meeting the tolerance;
    /// the last computed solution is discarded.
    #[error("objective not converged with eps {eps} over tolerance {tolerance}")]
    NotConverged { eps: f64, tolerance: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_the_failing_sizes() {
        let err = SmootherError::BoundsLengthMismatch {
            points: 5,
            bounds: 4,
        };
        assert_eq!(
            err.to_string(),
            "reference points and bounds size not equal, solver early terminates: 5 vs 4"
        );
    }

    #[test]
    fn test_solve_failure_message() {
        let err = SmootherError::SolveFailed {
            iteration: 3,
            status: SolveStatus::PrimalInfeasible,
        };
        assert_eq!(
            err.to_string(),
            "qp solve failed at iteration 3 with status: primal infeasible"
        );
    }
}

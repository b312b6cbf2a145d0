//! QP backend boundary.
//!
//! The driver talks to the solver through [`QpBackend`]: create a session
//! seeded with one full problem, warm-start it, solve, and push incremental
//! value/bounds updates between solves. A session owns all solver state for
//! one smoothing request and releases it on drop; there is no separate
//! teardown call. Any conforming convex-QP solver can sit behind the trait
//! without the assembly or driver code changing.

use thiserror::Error;

use crate::qp::QuadraticProblem;

pub mod clarabel;

/// Solver-facing subset of the request configuration, passed through
/// unchanged.
#[derive(Debug, Clone)]
pub struct QpSettings {
    /// Iteration cap for a single solve.
    pub max_iter: usize,
    /// Wall-clock cap in seconds for a single solve; 0 disables it.
    pub time_limit: f64,
    pub verbose: bool,
    /// Terminate on scaled residuals where the solver supports it.
    pub scaled_termination: bool,
    /// Start from the supplied primal guess where the solver supports it.
    pub warm_start: bool,
}

/// Outcome classification of one backend solve.
///
/// The numeric codes follow the embedded-solver convention the rest of the
/// pipeline is written against: 1 and 2 for the two acceptable outcomes,
/// everything else a failure even when its code is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Solved,
    SolvedInaccurate,
    PrimalInfeasible,
    PrimalInfeasibleInaccurate,
    DualInfeasible,
    DualInfeasibleInaccurate,
    MaxIterationsReached,
    TimeLimitReached,
    NumericalError,
    Unsolved,
}

impl SolveStatus {
    /// Status code in the embedded-solver convention.
    pub fn code(self) -> i32 {
        match self {
            SolveStatus::Solved => 1,
            SolveStatus::SolvedInaccurate => 2,
            SolveStatus::PrimalInfeasibleInaccurate => 3,
            SolveStatus::DualInfeasibleInaccurate => 4,
            SolveStatus::MaxIterationsReached => -2,
            SolveStatus::PrimalInfeasible => -3,
            SolveStatus::DualInfeasible => -4,
            SolveStatus::TimeLimitReached => -6,
            SolveStatus::NumericalError => -7,
            SolveStatus::Unsolved => -10,
        }
    }

    /// Only `solved` and `solved inaccurate` count as success.
    pub fn is_acceptable(self) -> bool {
        matches!(self, SolveStatus::Solved | SolveStatus::SolvedInaccurate)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SolveStatus::Solved => "solved",
            SolveStatus::SolvedInaccurate => "solved inaccurate",
            SolveStatus::PrimalInfeasible => "primal infeasible",
            SolveStatus::PrimalInfeasibleInaccurate => "primal infeasible inaccurate",
            SolveStatus::DualInfeasible => "dual infeasible",
            SolveStatus::DualInfeasibleInaccurate => "dual infeasible inaccurate",
            SolveStatus::MaxIterationsReached => "maximum iterations reached",
            SolveStatus::TimeLimitReached => "run time limit reached",
            SolveStatus::NumericalError => "numerical error",
            SolveStatus::Unsolved => "unsolved",
        };
        f.write_str(name)
    }
}

/// Result of one backend solve.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Objective value at the returned primal, in the `(1/2) x'Px + q'x`
    /// convention.
    pub objective: f64,
    /// Primal solution over the full variable vector.
    pub primal: Vec<f64>,
}

/// Faults raised by a backend outside the status channel.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend setup failed: {0}")]
    Setup(String),

    #[error("backend update size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// One QP solver behind a uniform calling convention.
pub trait QpBackend {
    /// Per-request solver state; dropping it releases the solver resources.
    type Session;

    /// Builds a session seeded with the full problem and settings.
    fn setup(
        &self,
        problem: &QuadraticProblem,
        settings: &QpSettings,
    ) -> Result<Self::Session, BackendError>;

    /// Supplies the primal starting guess for the next solve.
    fn warm_start(
        &self,
        session: &mut Self::Session,
        guess: &[f64],
    ) -> Result<(), BackendError>;

    fn solve(&self, session: &mut Self::Session) -> Result<SolveOutcome, BackendError>;

    /// Replaces the constraint-matrix values; the sparsity pattern must stay
    /// unchanged.
    fn update_constraint_values(
        &self,
        session: &mut Self::Session,
        values: &[f64],
    ) -> Result<(), BackendError>;

    /// Replaces both bound vectors wholesale.
    fn update_bounds(
        &self,
        session: &mut Self::Session,
        lower: &[f64],
        upper: &[f64],
    ) -> Result<(), BackendError>;
}

//! Default backend: the Clarabel interior-point solver.
//!
//! Clarabel solves conic problems `min (1/2) x'Px + q'x` subject to
//! `Ax + s = b, s in K`, so the session keeps the box-form `(A, l, u)`
//! buffers and on every solve converts them into an equality block (rows
//! with `l == u`) followed by a nonnegative block (one conic row per finite
//! side of the remaining rows, lower sides negated). Rebuilding the solver
//! from the session buffers is what makes the incremental update calls take
//! effect; the shape handed to Clarabel never changes between solves of one
//! request.
//!
//! Clarabel has no primal warm-start entry point and no scaled-termination
//! toggle. The session accepts both and leaves them inert so that backends
//! honoring them can sit behind the same trait.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT,
    SupportedConeT::{NonnegativeConeT, ZeroConeT},
};

use super::{BackendError, QpBackend, QpSettings, SolveOutcome, SolveStatus as Status};
use crate::qp::{ColumnArena, QuadraticProblem, INFINITE_BOUND};

/// Stateless backend handle; all per-request state lives in the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClarabelBackend;

impl ClarabelBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Solver state for one smoothing request.
pub struct ClarabelSession {
    num_vars: usize,
    num_rows: usize,
    kernel: CscMatrix<f64>,
    offset: Vec<f64>,
    constraint_col_ptrs: Vec<usize>,
    constraint_row_indices: Vec<usize>,
    constraint_values: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    settings: QpSettings,
    warm_guess: Option<Vec<f64>>,
}

impl ClarabelSession {
    /// Latest primal guess supplied through the warm-start call. Kept for
    /// interface parity; Clarabel starts from its own initialization.
    pub fn warm_start_guess(&self) -> Option<&[f64]> {
        self.warm_guess.as_deref()
    }

    /// Splits the box rows into Clarabel's equality-then-nonnegative form.
    ///
    /// Rows whose bounds are both beyond [`INFINITE_BOUND`] drop out; rows
    /// with `l == u` become one equality row; every remaining finite side
    /// becomes one nonnegative row (`Ax <= u`, or `-Ax <= -l`). The box
    /// matrix carries one entry per column, so per-column emission order
    /// stays sorted.
    fn conic_rows(&self) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        #[derive(Clone, Copy)]
        enum RowTarget {
            Skip,
            Equality(usize),
            Inequality {
                upper: Option<usize>,
                lower: Option<usize>,
            },
        }

        let mut targets = vec![RowTarget::Skip; self.num_rows];
        let mut num_eq = 0usize;
        for (row, target) in targets.iter_mut().enumerate() {
            let l = self.lower[row];
            let u = self.upper[row];
            if l <= -INFINITE_BOUND && u >= INFINITE_BOUND {
                continue;
            }
            if l == u {
                *target = RowTarget::Equality(num_eq);
                num_eq += 1;
            }
        }

        let mut num_ineq = 0usize;
        for (row, target) in targets.iter_mut().enumerate() {
            if !matches!(target, RowTarget::Skip) {
                continue;
            }
            let l = self.lower[row];
            let u = self.upper[row];
            if l <= -INFINITE_BOUND && u >= INFINITE_BOUND {
                continue;
            }
            let upper_row = (u < INFINITE_BOUND).then(|| {
                let idx = num_eq + num_ineq;
                num_ineq += 1;
                idx
            });
            let lower_row = (l > -INFINITE_BOUND).then(|| {
                let idx = num_eq + num_ineq;
                num_ineq += 1;
                idx
            });
            *target = RowTarget::Inequality {
                upper: upper_row,
                lower: lower_row,
            };
        }

        let mut b = vec![0.0; num_eq + num_ineq];
        for (row, target) in targets.iter().enumerate() {
            match *target {
                RowTarget::Skip => {}
                RowTarget::Equality(new_row) => b[new_row] = self.upper[row],
                RowTarget::Inequality { upper, lower } => {
                    if let Some(new_row) = upper {
                        b[new_row] = self.upper[row];
                    }
                    if let Some(new_row) = lower {
                        b[new_row] = -self.lower[row];
                    }
                }
            }
        }

        let mut arena = ColumnArena::new(self.num_vars);
        for col in 0..self.num_vars {
            for idx in self.constraint_col_ptrs[col]..self.constraint_col_ptrs[col + 1] {
                let row = self.constraint_row_indices[idx];
                let value = self.constraint_values[idx];
                match targets[row] {
                    RowTarget::Skip => {}
                    RowTarget::Equality(new_row) => arena.push(col, new_row, value),
                    RowTarget::Inequality { upper, lower } => {
                        if let Some(new_row) = upper {
                            arena.push(col, new_row, value);
                        }
                        if let Some(new_row) = lower {
                            arena.push(col, new_row, -value);
                        }
                    }
                }
            }
        }
        let csc = arena.compress(self.num_vars, 1.0);
        let matrix = CscMatrix::new(
            num_eq + num_ineq,
            self.num_vars,
            csc.col_ptrs,
            csc.row_indices,
            csc.values,
        );

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if num_eq > 0 {
            cones.push(ZeroConeT(num_eq));
        }
        if num_ineq > 0 {
            cones.push(NonnegativeConeT(num_ineq));
        }
        (matrix, b, cones)
    }
}

fn build_settings(settings: &QpSettings) -> Result<DefaultSettings<f64>, BackendError> {
    let mut builder = DefaultSettingsBuilder::<f64>::default();
    builder.max_iter(settings.max_iter as u32);
    builder.verbose(settings.verbose);
    if settings.time_limit > 0.0 {
        builder.time_limit(settings.time_limit);
    }
    builder
        .build()
        .map_err(|e| BackendError::Setup(format!("invalid solver settings: {e}")))
}

fn map_status(status: SolverStatus) -> Status {
    match status {
        SolverStatus::Solved => Status::Solved,
        SolverStatus::AlmostSolved => Status::SolvedInaccurate,
        SolverStatus::PrimalInfeasible => Status::PrimalInfeasible,
        SolverStatus::AlmostPrimalInfeasible => Status::PrimalInfeasibleInaccurate,
        SolverStatus::DualInfeasible => Status::DualInfeasible,
        SolverStatus::AlmostDualInfeasible => Status::DualInfeasibleInaccurate,
        SolverStatus::MaxIterations => Status::MaxIterationsReached,
        SolverStatus::MaxTime => Status::TimeLimitReached,
        SolverStatus::Unsolved => Status::Unsolved,
        _ => Status::NumericalError,
    }
}

impl QpBackend for ClarabelBackend {
    type Session = ClarabelSession;

    fn setup(
        &self,
        problem: &QuadraticProblem,
        settings: &QpSettings,
    ) -> Result<ClarabelSession, BackendError> {
        let n = problem.dims.num_vars;

        // The kernel arrives with one column per position variable; pad the
        // pointer array so the empty slack columns exist for the solver.
        let mut kernel_col_ptrs = problem.kernel.col_ptrs.clone();
        let nnz = kernel_col_ptrs
            .last()
            .copied()
            .ok_or_else(|| BackendError::Setup("empty kernel column pointers".into()))?;
        kernel_col_ptrs.resize(n + 1, nnz);

        let kernel = CscMatrix::new(
            n,
            n,
            kernel_col_ptrs,
            problem.kernel.row_indices.clone(),
            problem.kernel.values.clone(),
        );

        // Fail on unusable settings now rather than on the first solve.
        build_settings(settings)?;

        Ok(ClarabelSession {
            num_vars: n,
            num_rows: problem.dims.num_constraints,
            kernel,
            offset: problem.offset.clone(),
            constraint_col_ptrs: problem.constraints.col_ptrs.clone(),
            constraint_row_indices: problem.constraints.row_indices.clone(),
            constraint_values: problem.constraints.values.clone(),
            lower: problem.lower.clone(),
            upper: problem.upper.clone(),
            settings: settings.clone(),
            warm_guess: None,
        })
    }

    fn warm_start(
        &self,
        session: &mut ClarabelSession,
        guess: &[f64],
    ) -> Result<(), BackendError> {
        if guess.len() != session.num_vars {
            return Err(BackendError::SizeMismatch {
                expected: session.num_vars,
                actual: guess.len(),
            });
        }
        session.warm_guess = Some(guess.to_vec());
        Ok(())
    }

    fn solve(&self, session: &mut ClarabelSession) -> Result<SolveOutcome, BackendError> {
        let (constraints, b, cones) = session.conic_rows();
        let settings = build_settings(&session.settings)?;

        match DefaultSolver::new(
            &session.kernel,
            &session.offset,
            &constraints,
            &b,
            &cones,
            settings,
        ) {
            Ok(mut solver) => {
                solver.solve();
                let solution = &solver.solution;
                Ok(SolveOutcome {
                    status: map_status(solution.status),
                    objective: solution.obj_val,
                    primal: solution.x.clone(),
                })
            }
            Err(e) => Err(BackendError::Setup(format!("{e:?}"))),
        }
    }

    fn update_constraint_values(
        &self,
        session: &mut ClarabelSession,
        values: &[f64],
    ) -> Result<(), BackendError> {
        if values.len() != session.constraint_values.len() {
            return Err(BackendError::SizeMismatch {
                expected: session.constraint_values.len(),
                actual: values.len(),
            });
        }
        session.constraint_values.copy_from_slice(values);
        Ok(())
    }

    fn update_bounds(
        &self,
        session: &mut ClarabelSession,
        lower: &[f64],
        upper: &[f64],
    ) -> Result<(), BackendError> {
        if lower.len() != session.num_rows {
            return Err(BackendError::SizeMismatch {
                expected: session.num_rows,
                actual: lower.len(),
            });
        }
        if upper.len() != session.num_rows {
            return Err(BackendError::SizeMismatch {
                expected: session.num_rows,
                actual: upper.len(),
            });
        }
        session.lower.copy_from_slice(lower);
        session.upper.copy_from_slice(upper);
        Ok(())
    }
}

//! The outer SQP loop.
//!
//! One smoothing request runs validate → assemble → initial solve → bounded
//! re-solve loop. Each pass re-linearizes the curvature rows around the
//! latest solution, pushes the constraint values and bounds into the
//! session, warm-starts from the previous primal, and re-solves; the loop
//! ends when the relative objective change drops under the tolerance. An
//! exhausted budget fails the request and the last solution is discarded.

use std::time::Instant;

use crate::backend::{QpBackend, QpSettings, SolveOutcome};
use crate::error::{SmootherError, SmootherResult};
use crate::problem::{Point2, SmoothInfo, SmoothResult, SmootherSettings, SmoothingProblem};
use crate::qp::{self, QuadraticProblem};

/// Mutable per-request state threaded through the loop.
///
/// The constraint buffers start as copies of the assembled problem and are
/// what re-linearization may rewrite before each push to the backend.
struct SqpContext {
    constraint_values: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    warm_start: Vec<f64>,
    solution: Vec<f64>,
    prev_objective: f64,
    num_points: usize,
}

impl SqpContext {
    fn new(problem: &QuadraticProblem, points: &[Point2]) -> Self {
        // Identity warm start: the optimizer starts at the unsmoothed
        // input, slack tail zero.
        let mut warm_start = vec![0.0; problem.dims.num_vars];
        for (i, point) in points.iter().enumerate() {
            warm_start[2 * i] = point.x;
            warm_start[2 * i + 1] = point.y;
        }
        Self {
            constraint_values: problem.constraints.values.clone(),
            lower: problem.lower.clone(),
            upper: problem.upper.clone(),
            warm_start,
            solution: Vec::new(),
            prev_objective: 0.0,
            num_points: points.len(),
        }
    }

    /// Stores an accepted solve and reuses its primal as the next warm
    /// start.
    fn absorb(&mut self, outcome: SolveOutcome) {
        self.solution = outcome.primal;
        self.warm_start.clone_from(&self.solution);
    }

    /// Rewrites the curvature rows of the constraint buffers around the
    /// latest solution.
    ///
    /// The sparsity pattern and value count must stay fixed; only numbers
    /// may change. Today nothing changes: the curvature rows stay
    /// structurally empty and every pass re-sends the same buffers, so
    /// successive solves repeat the initial QP.
    // TODO: write the first-order expansion of the curvature magnitude
    // around `solution` into the curvature rows once that formula is
    // settled.
    fn relinearize_curvature(&mut self) {}

    fn extract_points(&self) -> Vec<Point2> {
        (0..self.num_points)
            .map(|i| Point2::new(self.solution[2 * i], self.solution[2 * i + 1]))
            .collect()
    }
}

/// Relative objective change between consecutive accepted solves.
///
/// The ratio cancels any uniform scaling of the penalty weights, so the
/// convergence test is scale-invariant.
fn relative_objective_change(previous: f64, current: f64) -> f64 {
    ((previous - current) / previous).abs()
}

/// Runs one smoothing request against `backend`.
///
/// The session lives for exactly this call; every exit path drops it.
pub fn smooth_with_backend<B: QpBackend>(
    backend: &B,
    problem: &SmoothingProblem,
    settings: &SmootherSettings,
) -> SmootherResult<SmoothResult> {
    problem.validate()?;

    let started = Instant::now();
    let quadratic = qp::assemble(problem);
    let mut context = SqpContext::new(&quadratic, &problem.reference_points);
    let qp_settings = QpSettings {
        max_iter: settings.max_iter,
        time_limit: settings.time_limit,
        verbose: settings.verbose,
        scaled_termination: settings.scaled_termination,
        warm_start: settings.warm_start,
    };

    let mut session = backend.setup(&quadratic, &qp_settings)?;

    backend.warm_start(&mut session, &context.warm_start)?;
    let outcome = backend.solve(&mut session)?;
    if !outcome.status.is_acceptable() {
        log::error!("initial iteration solving fails, status: {}", outcome.status);
        return Err(SmootherError::SolveFailed {
            iteration: 0,
            status: outcome.status,
        });
    }
    let initial_objective = outcome.objective;
    context.prev_objective = outcome.objective;
    context.absorb(outcome);

    let mut iteration = 1usize;
    let mut eps = 1.0f64;
    let mut final_objective = initial_objective;
    let mut converged = false;

    while iteration < settings.sqp_max_iter {
        context.relinearize_curvature();
        backend.update_constraint_values(&mut session, &context.constraint_values)?;
        backend.update_bounds(&mut session, &context.lower, &context.upper)?;
        backend.warm_start(&mut session, &context.warm_start)?;

        let outcome = backend.solve(&mut session)?;
        if !outcome.status.is_acceptable() {
            log::error!(
                "iteration {} solving fails with max iter {}, status: {}",
                iteration,
                settings.sqp_max_iter,
                outcome.status
            );
            return Err(SmootherError::SolveFailed {
                iteration,
                status: outcome.status,
            });
        }

        let objective = outcome.objective;
        context.absorb(outcome);
        final_objective = objective;

        eps = relative_objective_change(context.prev_objective, objective);
        if eps < settings.sqp_convergence_tolerance {
            log::debug!(
                "objective value converges to {} with eps {} under tolerance {}",
                objective,
                eps,
                settings.sqp_convergence_tolerance
            );
            converged = true;
            break;
        }

        context.prev_objective = objective;
        iteration += 1;
    }

    if !converged {
        log::error!(
            "objective not converged with eps {} over tolerance {}",
            eps,
            settings.sqp_convergence_tolerance
        );
        return Err(SmootherError::NotConverged {
            eps,
            tolerance: settings.sqp_convergence_tolerance,
        });
    }

    Ok(SmoothResult {
        points: context.extract_points(),
        info: SmoothInfo {
            sqp_iterations: iteration,
            initial_objective,
            final_objective,
            final_eps: eps,
            solve_time_ms: started.elapsed().as_millis() as u64,
        },
    })
}

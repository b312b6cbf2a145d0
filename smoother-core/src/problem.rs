//! Request data model, configuration, and results.

use crate::error::SmootherError;

/// Largest accepted reference-line length, the index domain of the embedded
/// solver convention the problem sizes are defined in.
pub const MAX_POINTS: usize = i32::MAX as usize;

/// A 2D point on the reference line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Scalar weights of the four penalty terms in the smoothing objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyWeights {
    /// Second-difference finite-element term between each interior point and
    /// the midpoint of its neighbors.
    pub fem_deviation: f64,
    /// First-difference path-length term between consecutive points.
    pub path_length: f64,
    /// Deviation of each point from its reference coordinate.
    pub ref_deviation: f64,
    /// Linear penalty on the curvature slack variables.
    pub curvature_slack: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            fem_deviation: 1.0e5,
            path_length: 1.0,
            ref_deviation: 1.0,
            curvature_slack: 1.0e2,
        }
    }
}

/// One smoothing request: an ordered reference line, a box radius per point,
/// and the penalty weights defining the objective.
///
/// The point order is the trajectory order; adjacency defines the
/// finite-element and curvature terms.
#[derive(Debug, Clone)]
pub struct SmoothingProblem {
    pub reference_points: Vec<Point2>,
    /// Per-point radius `r`; the smoothed point must stay inside
    /// `[x - r, x + r] x [y - r, y + r]` around its reference.
    pub bounds: Vec<f64>,
    pub weights: PenaltyWeights,
}

impl SmoothingProblem {
    pub fn new(reference_points: Vec<Point2>, bounds: Vec<f64>) -> Self {
        Self {
            reference_points,
            bounds,
            weights: PenaltyWeights::default(),
        }
    }

    /// Checks the request before any solver work is done.
    ///
    /// Checked in order: non-empty points, bounds length matching, at least
    /// three points (fewer cannot define a curvature term), and the
    /// [`MAX_POINTS`] size cap.
    pub fn validate(&self) -> Result<(), SmootherError> {
        if self.reference_points.is_empty() {
            return Err(SmootherError::EmptyReferenceLine);
        }
        if self.reference_points.len() != self.bounds.len() {
            return Err(SmootherError::BoundsLengthMismatch {
                points: self.reference_points.len(),
                bounds: self.bounds.len(),
            });
        }
        if self.reference_points.len() < 3 {
            return Err(SmootherError::TooFewPoints(self.reference_points.len()));
        }
        if self.reference_points.len() > MAX_POINTS {
            return Err(SmootherError::TooManyPoints(self.reference_points.len()));
        }
        Ok(())
    }
}

/// Solver and outer-loop configuration.
///
/// The first five fields are passed through to the QP backend unchanged; the
/// last two govern the outer SQP loop.
#[derive(Debug, Clone)]
pub struct SmootherSettings {
    /// Backend iteration cap for a single solve.
    pub max_iter: usize,
    /// Backend wall-clock cap in seconds for a single solve; 0 disables it.
    /// The outer loop itself has no wall-clock cap.
    pub time_limit: f64,
    /// Backend verbosity.
    pub verbose: bool,
    /// Let the backend terminate on scaled residuals.
    pub scaled_termination: bool,
    /// Let the backend start from the supplied primal guess.
    pub warm_start: bool,
    /// Outer-loop bound. The counter starts at 1 and each pass performs one
    /// re-solve, so at most `sqp_max_iter - 1` re-solves happen; a value of
    /// 1 or 0 means no re-solve can confirm convergence and the request
    /// fails closed.
    pub sqp_max_iter: usize,
    /// Relative objective-change threshold that ends the outer loop.
    pub sqp_convergence_tolerance: f64,
}

impl Default for SmootherSettings {
    fn default() -> Self {
        Self {
            max_iter: 4000,
            time_limit: 0.0,
            verbose: false,
            scaled_termination: true,
            warm_start: true,
            sqp_max_iter: 100,
            sqp_convergence_tolerance: 1e-4,
        }
    }
}

/// Successful smoothing outcome.
#[derive(Debug, Clone)]
pub struct SmoothResult {
    /// Smoothed points, same length and order as the reference points.
    pub points: Vec<Point2>,
    pub info: SmoothInfo,
}

/// Diagnostics accumulated over one request.
#[derive(Debug, Clone, Default)]
pub struct SmoothInfo {
    /// Re-solves performed by the outer loop; the initial solve is not
    /// counted.
    pub sqp_iterations: usize,
    /// Objective value of the initial solve.
    pub initial_objective: f64,
    /// Objective value of the accepted solution.
    pub final_objective: f64,
    /// Relative objective change at the accepted iteration.
    pub final_eps: f64,
    /// Wall time of the whole request, validation excluded.
    pub solve_time_ms: u64,
}

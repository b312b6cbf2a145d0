//! Fem-smoother: an SQP trajectory smoother over a conic QP backend
//!
//! This library smooths a discretized 2D reference line by solving a sequence
//! of convex quadratic programs. It provides:
//!
//! - **Finite-element deviation smoothing**: penalizes the discrete second
//!   difference of consecutive points
//! - **Per-point box constraints**: every smoothed point stays within a
//!   square box around its reference point
//! - **Curvature slack variables**: one nonnegative slack per interior point,
//!   reserved for the linearized curvature limit
//! - **Pluggable QP backends**: the loop talks to a small session trait;
//!   Clarabel is the bundled implementation
//!
//! # Algorithm
//!
//! The smoother builds one QP in the canonical form
//! `min 0.5 x'Px + q'x  s.t.  l <= Ax <= u` and drives it with a bounded
//! **sequential quadratic programming** loop:
//!
//! - **Warm starting** from the reference line, then from each primal
//! - **In-place updates** of constraint values and bounds between passes
//! - **Scale-invariant convergence** on the relative objective change
//! - **Fail-closed termination**: an exhausted budget discards the solution
//!
//! # Example
//!
//! ```ignore
//! use smoother_core::{smooth, Point2, SmootherSettings, SmoothingProblem};
//!
//! let problem = SmoothingProblem::new(
//!     vec![
//!         Point2::new(0.0, 0.0),
//!         Point2::new(1.0, 0.3),
//!         Point2::new(2.0, -0.2),
//!         Point2::new(3.0, 0.0),
//!     ],
//!     vec![0.25; 4],
//! );
//!
//! let result = smooth(&problem, &SmootherSettings::default())?;
//!
//! println!("iterations: {}", result.info.sqp_iterations);
//! println!("objective:  {}", result.info.final_objective);
//! for point in &result.points {
//!     println!("({}, {})", point.x, point.y);
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod problem;
pub mod qp;
pub mod sqp;

// Re-export main types
pub use backend::clarabel::ClarabelBackend;
pub use backend::{QpBackend, QpSettings, SolveOutcome, SolveStatus};
pub use error::{SmootherError, SmootherResult};
pub use problem::{
    PenaltyWeights, Point2, SmoothInfo, SmoothResult, SmootherSettings, SmoothingProblem,
};
pub use sqp::smooth_with_backend;

/// Main smoothing entry point.
///
/// Runs the SQP loop against the bundled Clarabel backend.
///
/// # Example
///
/// ```ignore
/// use smoother_core::{smooth, Point2, SmootherSettings, SmoothingProblem};
///
/// let problem = SmoothingProblem::new(
///     vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.5), Point2::new(2.0, 0.0)],
///     vec![0.2; 3],
/// );
/// let result = smooth(&problem, &SmootherSettings::default())?;
/// ```
pub fn smooth(
    problem: &SmoothingProblem,
    settings: &SmootherSettings,
) -> SmootherResult<SmoothResult> {
    smooth_with_backend(&ClarabelBackend::new(), problem, settings)
}

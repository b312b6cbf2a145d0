//! Sparse assembly of the smoothing QP.
//!
//! Translates a reference line, per-point box radii, and penalty weights
//! into the backend's canonical form `min (1/2) x'Px + q'x` subject to
//! `l <= Ax <= u`. The variable vector is all point coordinates interleaved
//! `(x0, y0, x1, y1, ...)` followed by one curvature slack per interior
//! point. Everything here is a pure function of its inputs.

use crate::problem::{PenaltyWeights, Point2, SmoothingProblem};

/// Bound magnitude treated as infinite by backends; lower bounds use the
/// negated value as an "unbounded below" sentinel.
pub const INFINITE_BOUND: f64 = 1e20;

/// Variable and constraint counts derived from the point count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemDims {
    pub num_points: usize,
    /// Two coordinates per point.
    pub num_pos_vars: usize,
    /// One curvature slack per interior point.
    pub num_slack_vars: usize,
    /// Full variable count, positions then slacks.
    pub num_vars: usize,
    /// One box row per variable.
    pub num_variable_constraints: usize,
    /// One linearized curvature row per interior point.
    pub num_curvature_constraints: usize,
    pub num_constraints: usize,
}

impl ProblemDims {
    /// Panics for fewer than three points; every derived count assumes at
    /// least one interior point.
    pub fn for_points(num_points: usize) -> Self {
        assert!(
            num_points >= 3,
            "need at least 3 points, got {num_points}"
        );
        let num_pos_vars = num_points * 2;
        let num_slack_vars = num_points - 2;
        let num_vars = num_pos_vars + num_slack_vars;
        let num_curvature_constraints = num_points - 2;
        Self {
            num_points,
            num_pos_vars,
            num_slack_vars,
            num_vars,
            num_variable_constraints: num_vars,
            num_curvature_constraints,
            num_constraints: num_vars + num_curvature_constraints,
        }
    }
}

/// Raw compressed-sparse-column arrays, exactly as handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CscData {
    pub values: Vec<f64>,
    pub row_indices: Vec<usize>,
    pub col_ptrs: Vec<usize>,
}

impl CscData {
    pub fn num_cols(&self) -> usize {
        self.col_ptrs.len().saturating_sub(1)
    }

    pub fn nnz(&self) -> usize {
        self.col_ptrs.last().copied().unwrap_or(0)
    }
}

/// Per-column `(row, value)` accumulator.
///
/// Keeps assembly linear in the number of points; compression preserves the
/// per-column insertion order, so callers that insert rows in ascending
/// order get sorted CSC columns.
pub(crate) struct ColumnArena {
    columns: Vec<Vec<(usize, f64)>>,
}

impl ColumnArena {
    pub(crate) fn new(num_cols: usize) -> Self {
        Self {
            columns: vec![Vec::new(); num_cols],
        }
    }

    pub(crate) fn push(&mut self, col: usize, row: usize, value: f64) {
        self.columns[col].push((row, value));
    }

    /// Compresses the first `num_cols` columns, scaling every value.
    pub(crate) fn compress(&self, num_cols: usize, scale: f64) -> CscData {
        let mut values = Vec::new();
        let mut row_indices = Vec::new();
        let mut col_ptrs = Vec::with_capacity(num_cols + 1);
        let mut nnz = 0usize;
        for column in &self.columns[..num_cols] {
            col_ptrs.push(nnz);
            for &(row, value) in column {
                values.push(value * scale);
                row_indices.push(row);
                nnz += 1;
            }
        }
        col_ptrs.push(nnz);
        CscData {
            values,
            row_indices,
            col_ptrs,
        }
    }
}

/// One QP instance: objective matrices, constraint system, and dimensions.
///
/// Built once per request; the driver copies the constraint values and
/// bounds into its loop state and pushes updates through the backend.
#[derive(Debug, Clone)]
pub struct QuadraticProblem {
    pub dims: ProblemDims,
    /// Upper triangle of P over the position variables; exactly
    /// `num_pos_vars` columns, since slack variables carry no quadratic
    /// term. Backends that want the full column count pad the pointers.
    pub kernel: CscData,
    /// Linear term over the full variable vector.
    pub offset: Vec<f64>,
    /// Identity over the full variable vector embedded in an
    /// `num_constraints x num_vars` matrix; the curvature rows at the
    /// bottom stay structurally empty until re-linearization fills them.
    pub constraints: CscData,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Builds the full QP for a validated problem.
pub fn assemble(problem: &SmoothingProblem) -> QuadraticProblem {
    let dims = ProblemDims::for_points(problem.reference_points.len());
    let kernel = build_kernel(&dims, &problem.weights);
    let offset = build_offset(&dims, &problem.weights, &problem.reference_points);
    let (constraints, lower, upper) =
        build_constraints(&dims, &problem.reference_points, &problem.bounds);
    QuadraticProblem {
        dims,
        kernel,
        offset,
        constraints,
        lower,
        upper,
    }
}

/// Upper-triangle kernel of the three quadratic penalties.
///
/// Block structure over per-point 2x2 identity blocks, with X = w_fem * I,
/// Y = w_len * I, Z = w_ref * I (six points shown):
///
/// ```text
/// | X+Y+Z  -2X-Y   X                              |
/// |        5X+2Y+Z -4X-Y   X                      |
/// |                6X+2Y+Z -4X-Y   X              |
/// |                        6X+2Y+Z -4X-Y   X      |
/// |                                5X+2Y+Z -2X-Y  |
/// |                                        X+Y+Z  |
/// ```
///
/// With three points the middle point is second and second-to-last at once
/// and sits in a single finite-element window, so its diagonal is
/// 4X+2Y+Z with a single -2X-Y coupling; the emitted column count stays
/// `2 * num_points` for every length.
///
/// Values are emitted scaled by 2.0 because the backend objective carries a
/// 1/2 factor on the quadratic term.
fn build_kernel(dims: &ProblemDims, weights: &PenaltyWeights) -> CscData {
    let n = dims.num_points;
    let w_f = weights.fem_deviation;
    let w_l = weights.path_length;
    let w_r = weights.ref_deviation;

    let mut arena = ColumnArena::new(dims.num_vars);
    let mut col_count = 0usize;

    for point in 0..n {
        // Entries for both of this point's columns: two columns back, the
        // previous column pair, and the diagonal.
        let (two_back, previous, diagonal) = match point {
            0 => (None, None, w_f + w_l + w_r),
            1 if n == 3 => (
                None,
                Some(-2.0 * w_f - w_l),
                4.0 * w_f + 2.0 * w_l + w_r,
            ),
            1 => (
                None,
                Some(-2.0 * w_f - w_l),
                5.0 * w_f + 2.0 * w_l + w_r,
            ),
            p if p == n - 1 => (
                Some(w_f),
                Some(-2.0 * w_f - w_l),
                w_f + w_l + w_r,
            ),
            p if p == n - 2 => (
                Some(w_f),
                Some(-4.0 * w_f - w_l),
                5.0 * w_f + 2.0 * w_l + w_r,
            ),
            _ => (
                Some(w_f),
                Some(-4.0 * w_f - w_l),
                6.0 * w_f + 2.0 * w_l + w_r,
            ),
        };
        for col in (2 * point)..(2 * point + 2) {
            if let Some(value) = two_back {
                arena.push(col, col - 4, value);
            }
            if let Some(value) = previous {
                arena.push(col, col - 2, value);
            }
            arena.push(col, col, diagonal);
            col_count += 1;
        }
    }

    assert_eq!(col_count, dims.num_pos_vars);
    arena.compress(dims.num_pos_vars, 2.0)
}

/// Linear term: completes the reference-deviation penalty for each
/// coordinate and prices the curvature slacks.
fn build_offset(dims: &ProblemDims, weights: &PenaltyWeights, points: &[Point2]) -> Vec<f64> {
    let mut offset = vec![0.0; dims.num_vars];
    for (i, point) in points.iter().enumerate() {
        offset[2 * i] = -2.0 * weights.ref_deviation * point.x;
        offset[2 * i + 1] = -2.0 * weights.ref_deviation * point.y;
    }
    for slack in 0..dims.num_slack_vars {
        offset[dims.num_pos_vars + slack] = weights.curvature_slack;
    }
    offset
}

/// Identity constraint matrix with box bounds.
///
/// Every variable is bounded by its own row: position rows get the box
/// around the reference point, slack-variable rows keep the zero fill and
/// pin every slack to zero. The trailing curvature rows carry the constant
/// part of the linearized curvature inequality and have no matrix entries
/// until re-linearization writes the coefficients.
fn build_constraints(
    dims: &ProblemDims,
    points: &[Point2],
    bounds: &[f64],
) -> (CscData, Vec<f64>, Vec<f64>) {
    let mut arena = ColumnArena::new(dims.num_vars);
    for var in 0..dims.num_vars {
        arena.push(var, var, 1.0);
    }
    let constraints = arena.compress(dims.num_vars, 1.0);

    let mut lower = vec![0.0; dims.num_constraints];
    let mut upper = vec![0.0; dims.num_constraints];
    for (i, point) in points.iter().enumerate() {
        upper[2 * i] = point.x + bounds[i];
        upper[2 * i + 1] = point.y + bounds[i];
        lower[2 * i] = point.x - bounds[i];
        lower[2 * i + 1] = point.y - bounds[i];
    }
    for i in 0..dims.num_curvature_constraints {
        let row = dims.num_variable_constraints + i;
        upper[row] = 1.0;
        lower[row] = -INFINITE_BOUND;
    }
    (constraints, lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::SmoothingProblem;

    fn weights(w_f: f64, w_l: f64, w_r: f64, w_s: f64) -> PenaltyWeights {
        PenaltyWeights {
            fem_deviation: w_f,
            path_length: w_l,
            ref_deviation: w_r,
            curvature_slack: w_s,
        }
    }

    fn line(n: usize) -> Vec<Point2> {
        (0..n).map(|i| Point2::new(i as f64, 0.0)).collect()
    }

    fn column(kernel: &CscData, col: usize) -> Vec<(usize, f64)> {
        (kernel.col_ptrs[col]..kernel.col_ptrs[col + 1])
            .map(|idx| (kernel.row_indices[idx], kernel.values[idx]))
            .collect()
    }

    /// Dense per-point coefficient matrix of the three penalty sums,
    /// accumulated window by window, independent of the banded emission.
    fn dense_penalty_blocks(n: usize, w_f: f64, w_l: f64, w_r: f64) -> Vec<Vec<f64>> {
        let mut m = vec![vec![0.0; n]; n];
        for window in 1..n - 1 {
            let coeffs = [(window - 1, 1.0), (window, -2.0), (window + 1, 1.0)];
            for &(p, cp) in &coeffs {
                for &(q, cq) in &coeffs {
                    m[p][q] += w_f * cp * cq;
                }
            }
        }
        for segment in 0..n - 1 {
            let coeffs = [(segment, -1.0), (segment + 1, 1.0)];
            for &(p, cp) in &coeffs {
                for &(q, cq) in &coeffs {
                    m[p][q] += w_l * cp * cq;
                }
            }
        }
        for p in 0..n {
            m[p][p] += w_r;
        }
        m
    }

    #[test]
    fn test_dims_for_three_points() {
        let dims = ProblemDims::for_points(3);
        assert_eq!(dims.num_pos_vars, 6);
        assert_eq!(dims.num_slack_vars, 1);
        assert_eq!(dims.num_vars, 7);
        assert_eq!(dims.num_variable_constraints, 7);
        assert_eq!(dims.num_curvature_constraints, 1);
        assert_eq!(dims.num_constraints, 8);
    }

    #[test]
    #[should_panic(expected = "at least 3 points")]
    fn test_dims_require_three_points() {
        ProblemDims::for_points(2);
    }

    #[test]
    fn test_kernel_column_count() {
        for n in [3usize, 4, 5, 7, 12] {
            let dims = ProblemDims::for_points(n);
            let kernel = build_kernel(&dims, &weights(1.0, 1.0, 1.0, 1.0));
            assert_eq!(kernel.col_ptrs.len(), 2 * n + 1, "n = {n}");
            assert_eq!(kernel.num_cols(), dims.num_pos_vars, "n = {n}");
            assert_eq!(kernel.nnz(), kernel.values.len(), "n = {n}");
            assert_eq!(kernel.values.len(), kernel.row_indices.len(), "n = {n}");
        }
    }

    #[test]
    fn test_kernel_bands_for_four_points() {
        let dims = ProblemDims::for_points(4);
        let kernel = build_kernel(&dims, &weights(3.0, 5.0, 7.0, 0.0));

        // First point: diagonal only, 2 * (w_f + w_l + w_r).
        assert_eq!(column(&kernel, 0), vec![(0, 30.0)]);
        assert_eq!(column(&kernel, 1), vec![(1, 30.0)]);
        // Second point: -2w_f - w_l coupling, 5w_f + 2w_l + w_r diagonal.
        assert_eq!(column(&kernel, 2), vec![(0, -22.0), (2, 64.0)]);
        assert_eq!(column(&kernel, 3), vec![(1, -22.0), (3, 64.0)]);
        // Second-to-last point: w_f two back, -4w_f - w_l coupling.
        assert_eq!(column(&kernel, 4), vec![(0, 6.0), (2, -34.0), (4, 64.0)]);
        assert_eq!(column(&kernel, 5), vec![(1, 6.0), (3, -34.0), (5, 64.0)]);
        // Last point: endpoint diagonal with both couplings.
        assert_eq!(column(&kernel, 6), vec![(2, 6.0), (4, -22.0), (6, 30.0)]);
        assert_eq!(column(&kernel, 7), vec![(3, 6.0), (5, -22.0), (7, 30.0)]);
    }

    #[test]
    fn test_kernel_degenerate_middle() {
        let dims = ProblemDims::for_points(3);
        let kernel = build_kernel(&dims, &weights(3.0, 5.0, 7.0, 0.0));

        assert_eq!(column(&kernel, 0), vec![(0, 30.0)]);
        // Middle point sits in one finite-element window: 4w_f + 2w_l + w_r.
        assert_eq!(column(&kernel, 2), vec![(0, -22.0), (2, 58.0)]);
        assert_eq!(column(&kernel, 4), vec![(0, 6.0), (2, -22.0), (4, 30.0)]);
    }

    #[test]
    fn test_kernel_matches_dense_hessian() {
        for n in [3usize, 4, 5, 8] {
            let (w_f, w_l, w_r) = (3.0, 5.0, 7.0);
            let dims = ProblemDims::for_points(n);
            let kernel = build_kernel(&dims, &weights(w_f, w_l, w_r, 0.0));
            let blocks = dense_penalty_blocks(n, w_f, w_l, w_r);

            let mut dense = vec![vec![0.0; 2 * n]; 2 * n];
            for col in 0..kernel.num_cols() {
                for idx in kernel.col_ptrs[col]..kernel.col_ptrs[col + 1] {
                    dense[kernel.row_indices[idx]][col] = kernel.values[idx];
                }
            }

            for row in 0..2 * n {
                for col in 0..2 * n {
                    let expected = if row <= col && row % 2 == col % 2 {
                        2.0 * blocks[row / 2][col / 2]
                    } else {
                        0.0
                    };
                    assert!(
                        (dense[row][col] - expected).abs() < 1e-12,
                        "n = {n}, entry ({row}, {col}): got {}, want {expected}",
                        dense[row][col]
                    );
                }
            }
        }
    }

    #[test]
    fn test_offset_layout() {
        let dims = ProblemDims::for_points(4);
        let points = vec![
            Point2::new(1.0, 2.0),
            Point2::new(3.0, 4.0),
            Point2::new(5.0, 6.0),
            Point2::new(7.0, 8.0),
        ];
        let offset = build_offset(&dims, &weights(0.0, 0.0, 7.0, 0.25), &points);

        assert_eq!(offset.len(), dims.num_vars);
        assert_eq!(
            &offset[..8],
            &[-14.0, -28.0, -42.0, -56.0, -70.0, -84.0, -98.0, -112.0]
        );
        assert_eq!(&offset[8..], &[0.25, 0.25]);
    }

    #[test]
    fn test_identity_constraints() {
        let dims = ProblemDims::for_points(4);
        let (constraints, _, _) = build_constraints(&dims, &line(4), &[0.1; 4]);

        assert_eq!(constraints.col_ptrs.len(), dims.num_vars + 1);
        assert_eq!(constraints.values, vec![1.0; dims.num_vars]);
        assert_eq!(
            constraints.row_indices,
            (0..dims.num_vars).collect::<Vec<_>>()
        );
        for (col, ptr) in constraints.col_ptrs.iter().enumerate() {
            assert_eq!(*ptr, col);
        }
    }

    #[test]
    fn test_bound_rows_by_block() {
        let dims = ProblemDims::for_points(4);
        let points = vec![
            Point2::new(0.0, 10.0),
            Point2::new(1.0, 11.0),
            Point2::new(2.0, 12.0),
            Point2::new(3.0, 13.0),
        ];
        let radii = [0.1, 0.2, 0.3, 0.4];
        let (_, lower, upper) = build_constraints(&dims, &points, &radii);

        assert_eq!(lower.len(), dims.num_constraints);
        assert_eq!(upper.len(), dims.num_constraints);

        // Position rows: the box around each reference, point-major.
        for (i, point) in points.iter().enumerate() {
            assert_eq!(upper[2 * i], point.x + radii[i]);
            assert_eq!(upper[2 * i + 1], point.y + radii[i]);
            assert_eq!(lower[2 * i], point.x - radii[i]);
            assert_eq!(lower[2 * i + 1], point.y - radii[i]);
        }
        // Slack-variable rows keep the zero fill: slacks pinned to zero.
        for i in 0..dims.num_slack_vars {
            let row = dims.num_pos_vars + i;
            assert_eq!(lower[row], 0.0);
            assert_eq!(upper[row], 0.0);
        }
        // Curvature rows carry the linearization constant term.
        for i in 0..dims.num_curvature_constraints {
            let row = dims.num_variable_constraints + i;
            assert_eq!(upper[row], 1.0);
            assert_eq!(lower[row], -INFINITE_BOUND);
        }
    }

    #[test]
    fn test_assemble_consistency() {
        let problem = SmoothingProblem {
            reference_points: line(5),
            bounds: vec![0.2; 5],
            weights: weights(1.0, 1.0, 1.0, 0.01),
        };
        let qp = assemble(&problem);

        assert_eq!(qp.dims.num_points, 5);
        assert_eq!(qp.kernel.num_cols(), qp.dims.num_pos_vars);
        assert_eq!(qp.offset.len(), qp.dims.num_vars);
        assert_eq!(qp.constraints.num_cols(), qp.dims.num_vars);
        assert_eq!(qp.lower.len(), qp.dims.num_constraints);
        assert_eq!(qp.upper.len(), qp.dims.num_constraints);
    }
}

//! Benchmarking CLI for the SQP smoother.

use smoother_core::qp::ProblemDims;
use smoother_core::{smooth, Point2, SmootherSettings, SmoothingProblem};
use std::time::Instant;

/// Generate a straight reference line with random lateral noise:
/// n points at unit spacing, y jittered in [-amplitude, amplitude],
/// box radius `bound` around every point.
fn generate_noisy_line(n: usize, amplitude: f64, bound: f64, seed: u64) -> SmoothingProblem {
    // Simple LCG random number generator
    let mut rng_state = seed;
    let mut rand = || -> f64 {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((rng_state >> 33) as f64) / (u32::MAX as f64)
    };

    let points: Vec<Point2> = (0..n)
        .map(|i| Point2::new(i as f64, (2.0 * rand() - 1.0) * amplitude))
        .collect();

    SmoothingProblem::new(points, vec![bound; n])
}

/// Generate a circular arc sampled at roughly unit spacing.
///
/// Curved references keep the finite-element term active along the whole
/// line instead of only at the noise spikes.
fn generate_arc_line(n: usize, radius: f64, bound: f64) -> SmoothingProblem {
    let step = 1.0 / radius;
    let points: Vec<Point2> = (0..n)
        .map(|i| {
            let angle = i as f64 * step;
            Point2::new(radius * angle.sin(), radius * (1.0 - angle.cos()))
        })
        .collect();

    SmoothingProblem::new(points, vec![bound; n])
}

fn run_benchmark(name: &str, problem: &SmoothingProblem, settings: &SmootherSettings) {
    let n = problem.reference_points.len();
    let dims = ProblemDims::for_points(n);

    println!("\n{}", "=".repeat(60));
    println!("{}", name);
    println!("{}", "=".repeat(60));
    println!("Points:           {}", n);
    println!("Variables:        {}", dims.num_vars);
    println!("Constraints:      {}", dims.num_constraints);
    println!();

    let start = Instant::now();
    let result = smooth(problem, settings);
    let elapsed = start.elapsed();

    match result {
        Ok(res) => {
            let max_deviation = res
                .points
                .iter()
                .zip(&problem.reference_points)
                .map(|(p, r)| (p.x - r.x).hypot(p.y - r.y))
                .fold(0.0f64, f64::max);
            let total_solves = res.info.sqp_iterations + 1;

            println!("SQP iterations:   {}", res.info.sqp_iterations);
            println!("Objective:        {:.6e}", res.info.final_objective);
            println!("Final eps:        {:.6e}", res.info.final_eps);
            println!("Max deviation:    {:.4} m", max_deviation);
            println!("Solve time:       {:.3} ms", elapsed.as_secs_f64() * 1000.0);
            println!(
                "Time/solve:       {:.3} ms",
                elapsed.as_secs_f64() * 1000.0 / total_solves as f64
            );
        }
        Err(e) => {
            println!("ERROR: {}", e);
        }
    }
}

fn main() {
    println!("Fem Smoother Benchmarks");
    println!("=======================\n");

    let settings = SmootherSettings {
        verbose: false,
        sqp_max_iter: 20,
        ..Default::default()
    };

    // Short noisy line
    let prob = generate_noisy_line(100, 0.1, 0.2, 12345);
    run_benchmark("Noisy line (n=100)", &prob, &settings);

    // Medium noisy line
    let prob = generate_noisy_line(1000, 0.1, 0.2, 12345);
    run_benchmark("Noisy line (n=1000)", &prob, &settings);

    // Long noisy line
    let prob = generate_noisy_line(5000, 0.1, 0.2, 12345);
    run_benchmark("Noisy line (n=5000)", &prob, &settings);

    // Tight boxes leave the solver little room
    let prob = generate_noisy_line(1000, 0.1, 0.05, 98765);
    run_benchmark("Noisy line, tight boxes (n=1000)", &prob, &settings);

    // Constant-curvature arc, most of a circle
    let prob = generate_arc_line(500, 100.0, 0.2);
    run_benchmark("Arc line (n=500, r=100)", &prob, &settings);

    println!("\n{}", "=".repeat(60));
    println!("Benchmarks complete");
    println!("{}", "=".repeat(60));
}

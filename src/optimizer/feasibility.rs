//! Phase-one feasibility restoration via linear programming
//!
//! Finds the point of the feasible polytope closest to the starting vector
//! in L1 distance. Using auxiliary variables `d_i >= |x_i - x0_i|`:
//!
//! ```text
//! minimise   Σ d_i
//! subject to d_i >= x_i - x0_i
//!            d_i >= x0_i - x_i
//!            Σ x[group] = target          (one row per group)
//!            0 <= x_i <= upper_i
//! ```

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};

use super::OptimizeError;
use crate::pipeline::GroupConstraint;

/// Solve the phase-one LP with HiGHS and return the repaired vector
pub fn restore_feasibility(
    start: &[f64],
    upper: &[f64],
    constraints: &[GroupConstraint],
) -> Result<Vec<f64>, OptimizeError> {
    let mut vars = ProblemVariables::new();

    let xs: Vec<Variable> = upper
        .iter()
        .map(|&u| vars.add(variable().min(0.0).max(u)))
        .collect();
    let ds: Vec<Variable> = (0..start.len())
        .map(|_| vars.add(variable().min(0.0)))
        .collect();

    let distance: Expression = ds.iter().copied().sum();
    let mut problem = vars.minimise(distance).using(default_solver);

    for ((&x, &d), &x0) in xs.iter().zip(&ds).zip(start) {
        problem = problem.with(constraint!(d - x >= -x0));
        problem = problem.with(constraint!(d + x >= x0));
    }

    for group in constraints {
        let total: Expression = group.indices.iter().map(|&i| xs[i]).sum();
        let target = group.target_sum;
        problem = problem.with(constraint!(total == target));
    }

    let solution = problem.solve().map_err(|e| match e {
        ResolutionError::Infeasible => OptimizeError::PhaseOneInfeasible,
        other => OptimizeError::PhaseOne(other.to_string()),
    })?;

    // Solver output can sit a hair outside the box
    Ok(xs
        .iter()
        .zip(upper)
        .map(|(&x, &u)| solution.value(x).clamp(0.0, u))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_capacity_start_is_repaired() {
        let start = [10.0, 20.0, 5.0];
        let upper = [15.0, 15.0, 50.0];
        let constraints = [
            GroupConstraint {
                group: "A".to_string(),
                indices: vec![0, 1],
                target_sum: 30.0,
            },
            GroupConstraint {
                group: "B".to_string(),
                indices: vec![2],
                target_sum: 5.0,
            },
        ];

        let x = restore_feasibility(&start, &upper, &constraints).unwrap();
        assert!((x[0] - 15.0).abs() < 1e-6);
        assert!((x[1] - 15.0).abs() < 1e-6);
        assert!((x[2] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_moves_only_what_it_must() {
        // Only the first member is over its bound; the L1-nearest repair
        // moves the excess onto one other member and leaves the rest alone
        let start = [12.0, 3.0, 3.0];
        let upper = [10.0, 10.0, 10.0];
        let constraints = [GroupConstraint {
            group: "A".to_string(),
            indices: vec![0, 1, 2],
            target_sum: 18.0,
        }];

        let x = restore_feasibility(&start, &upper, &constraints).unwrap();
        assert!((x[0] - 10.0).abs() < 1e-6);
        assert!((x.iter().sum::<f64>() - 18.0).abs() < 1e-6);
        let moved: f64 = x.iter().zip(&start).map(|(a, b)| (a - b).abs()).sum();
        assert!((moved - 4.0).abs() < 1e-6);
    }
}

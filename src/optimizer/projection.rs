//! Euclidean projection onto the box + group-sum polytope
//!
//! Groups are disjoint, so the projection separates into one problem per
//! group: find λ with `Σ clamp(y_i - λ, 0, u_i) = target`. The left side is
//! monotone non-increasing in λ, so bisection on λ is exact up to the
//! iteration budget. Whatever residual remains after bisection is pushed onto
//! members that still have room, which makes the group sum exact.

use crate::pipeline::GroupConstraint;

const BISECTION_STEPS: usize = 100;

/// Project `y` onto `{x : 0 <= x <= upper, Σ x[group] = target for each group}`.
///
/// Every group must be feasible (`0 <= target <= Σ upper[group]`); the caller
/// checks this before projecting.
pub fn project(y: &[f64], upper: &[f64], constraints: &[GroupConstraint]) -> Vec<f64> {
    let mut x: Vec<f64> = y
        .iter()
        .zip(upper)
        .map(|(&v, &u)| v.clamp(0.0, u))
        .collect();

    for constraint in constraints {
        project_group(y, upper, constraint, &mut x);
    }
    x
}

fn project_group(y: &[f64], upper: &[f64], constraint: &GroupConstraint, x: &mut [f64]) {
    let indices = &constraint.indices;
    let target = constraint.target_sum;

    if let [only] = indices.as_slice() {
        x[*only] = target;
        return;
    }

    let sum_at = |lambda: f64| -> f64 {
        indices
            .iter()
            .map(|&i| (y[i] - lambda).clamp(0.0, upper[i]))
            .sum()
    };

    let mut lo = indices
        .iter()
        .map(|&i| y[i] - upper[i])
        .fold(f64::INFINITY, f64::min);
    let mut hi = indices.iter().map(|&i| y[i]).fold(f64::NEG_INFINITY, f64::max);

    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if sum_at(mid) > target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON * hi.abs().max(1.0) {
            break;
        }
    }

    let lambda = 0.5 * (lo + hi);
    for &i in indices {
        x[i] = (y[i] - lambda).clamp(0.0, upper[i]);
    }
    absorb_residual(x, upper, indices, target);
}

/// Spread `target - Σ x[indices]` over members with slack in the needed direction
fn absorb_residual(x: &mut [f64], upper: &[f64], indices: &[usize], target: f64) {
    let mut residual = target - indices.iter().map(|&i| x[i]).sum::<f64>();

    for &i in indices {
        if residual == 0.0 {
            break;
        }
        let shift = if residual > 0.0 {
            residual.min(upper[i] - x[i])
        } else {
            residual.max(-x[i])
        };
        x[i] += shift;
        residual -= shift;
    }
}

/// Largest violation of the box bounds or of any group sum
pub fn max_violation(x: &[f64], upper: &[f64], constraints: &[GroupConstraint]) -> f64 {
    let bound = x
        .iter()
        .zip(upper)
        .map(|(&v, &u)| (-v).max(v - u).max(0.0))
        .fold(0.0, f64::max);
    let equality = constraints
        .iter()
        .map(|c| c.residual(x).abs())
        .fold(0.0, f64::max);
    bound.max(equality)
}

//! Projected SQP iteration with a scaled-identity Hessian model
//!
//! With `B = I/α` the quadratic subproblem
//!
//! ```text
//! min  g·d + ||d||² / (2α)   s.t.  x + d feasible
//! ```
//!
//! is solved exactly by `d = P(x - αg) - x`, where `P` is the projection onto
//! the feasible polytope. The step is then shortened by Armijo backtracking
//! and `α` follows the Barzilai–Borwein rule. Every iterate is feasible.

use rayon::prelude::*;

use super::projection::{max_violation, project};
use super::{CostOracle, OptimizationResult, OptimizeError, OptimizerConfig, SolverStatus};
use crate::pipeline::{DecisionUnit, GroupConstraint, PipelineError};
use crate::utils::iteration_spinner;

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 30;
const ALPHA_MIN: f64 = 1e-12;
const ALPHA_MAX: f64 = 1e12;

struct Objective<'a, O: ?Sized> {
    oracle: &'a O,
    units: &'a [DecisionUnit],
}

impl<O: CostOracle + ?Sized> Objective<'_, O> {
    /// Full re-encode and re-predict of every unit
    fn value(&self, x: &[f64]) -> Result<f64, PipelineError> {
        Ok(self.oracle.unit_costs(self.units, x)?.iter().sum())
    }

    /// Forward-difference gradient, one parallel evaluation per component.
    /// A step that would leave the box is flipped backwards, or shortened to
    /// the wider side when neither full step fits.
    fn gradient(&self, x: &[f64], fx: f64, upper: &[f64], step: f64) -> Result<Vec<f64>, PipelineError> {
        (0..x.len())
            .into_par_iter()
            .map(|i| {
                let h = step * x[i].abs().max(1.0);
                let room_up = upper[i] - x[i];
                let room_down = x[i];
                let signed = if room_up >= h {
                    h
                } else if room_down >= h {
                    -h
                } else if room_up >= room_down {
                    room_up
                } else {
                    -room_down
                };
                if signed == 0.0 {
                    return Ok(0.0);
                }

                let mut probe = x.to_vec();
                probe[i] += signed;
                Ok((self.value(&probe)? - fx) / signed)
            })
            .collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// Run the iteration from a feasible `start`
pub(super) fn minimize<O: CostOracle + ?Sized>(
    oracle: &O,
    units: &[DecisionUnit],
    constraints: &[GroupConstraint],
    upper: &[f64],
    start: Vec<f64>,
    config: &OptimizerConfig,
) -> Result<OptimizationResult, OptimizeError> {
    let objective = Objective { oracle, units };
    let n = start.len();

    let mut x = start;
    let mut fx = objective.value(&x)?;
    let mut evaluations = 1;
    let mut iterations = 0;
    let mut status = SolverStatus::IterationLimit;

    let pb = iteration_spinner(config.show_progress);

    if config.max_iterations > 0 {
        let mut g = objective.gradient(&x, fx, upper, config.gradient_step)?;
        evaluations += n;

        let mean_upper = upper.iter().sum::<f64>() / n.max(1) as f64;
        let g_max = norm_inf(&g);
        let mut alpha = if g_max > 0.0 {
            (0.1 * mean_upper.max(1.0) / g_max).clamp(ALPHA_MIN, ALPHA_MAX)
        } else {
            1.0
        };

        while iterations < config.max_iterations {
            iterations += 1;
            pb.set_position(iterations as u64);

            let trial: Vec<f64> = x.iter().zip(&g).map(|(xi, gi)| xi - alpha * gi).collect();
            let target = project(&trial, upper, constraints);
            let d: Vec<f64> = target.iter().zip(&x).map(|(p, xi)| p - xi).collect();

            if norm_inf(&d) <= config.tolerance * norm_inf(&x).max(1.0) {
                status = SolverStatus::Converged;
                break;
            }
            let slope = dot(&g, &d);
            if slope >= 0.0 {
                status = SolverStatus::Converged;
                break;
            }

            // Armijo backtracking; x + t·d stays inside the convex feasible set
            let mut accepted = None;
            let mut t = 1.0;
            for _ in 0..MAX_BACKTRACKS {
                let candidate: Vec<f64> = x
                    .iter()
                    .zip(&d)
                    .zip(upper)
                    .map(|((xi, di), &u)| (xi + t * di).clamp(0.0, u))
                    .collect();
                let f_candidate = objective.value(&candidate)?;
                evaluations += 1;
                if f_candidate <= fx + ARMIJO_C * t * slope {
                    accepted = Some((candidate, f_candidate));
                    break;
                }
                t *= 0.5;
            }

            let Some((x_new, f_new)) = accepted else {
                status = SolverStatus::Converged;
                break;
            };

            let g_new = objective.gradient(&x_new, f_new, upper, config.gradient_step)?;
            evaluations += n;

            // Barzilai–Borwein: α = sᵀs / sᵀy
            let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            alpha = if sy > 0.0 {
                (dot(&s, &s) / sy).clamp(ALPHA_MIN, ALPHA_MAX)
            } else {
                ALPHA_MAX.min(alpha * 2.0)
            };

            let relative_change = (fx - f_new).abs() / fx.abs().max(1.0);
            x = x_new;
            fx = f_new;
            g = g_new;
            pb.set_message(format!("objective {:.4}", fx));

            if relative_change <= config.tolerance {
                status = SolverStatus::Converged;
                break;
            }
        }
    }

    pb.finish_and_clear();

    let violation = max_violation(&x, upper, constraints);
    Ok(OptimizationResult {
        status,
        optimized: x,
        objective: fx,
        initial_objective: fx,
        iterations,
        evaluations,
        max_violation: violation,
        phase_one: false,
        infeasible_groups: Vec::new(),
    })
}

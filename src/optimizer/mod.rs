//! Equality-constrained minimization of predicted logistics cost
//!
//! The decision vector holds one shipment volume per decision unit. Each
//! value is boxed by `[0, max_capacity]` and every supplier's volumes must
//! keep summing to the supplier's original total. The cost model is treated
//! as a black box: it is only ever evaluated, never differentiated, so the
//! solver works from finite-difference gradients (see [`sqp`]).

mod feasibility;
mod projection;
mod sqp;

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::{
    check_alignment, decision_vector, DecisionUnit, FittedPipeline, GroupConstraint, PipelineError,
};

pub use feasibility::restore_feasibility;
pub use projection::{max_violation, project};

/// Solver settings
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Hard cap on SQP iterations
    pub max_iterations: usize,
    /// Convergence tolerance on the projected step and relative objective change
    pub tolerance: f64,
    /// Allowed bound/equality violation before phase one kicks in
    pub constraint_tolerance: f64,
    /// Relative finite-difference step: `h_i = gradient_step * max(1, |x_i|)`
    pub gradient_step: f64,
    /// Show a spinner with the running objective
    pub show_progress: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            constraint_tolerance: 1e-6,
            gradient_step: 1e-3,
            show_progress: false,
        }
    }
}

/// Outcome class of an optimization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverStatus {
    Converged,
    IterationLimit,
    Infeasible,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::Converged => write!(f, "converged"),
            SolverStatus::IterationLimit => write!(f, "iteration limit"),
            SolverStatus::Infeasible => write!(f, "infeasible"),
        }
    }
}

/// A group whose target sum cannot be met within its members' bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfeasibleGroup {
    pub group: String,
    pub target_sum: f64,
    pub capacity: f64,
}

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("group '{group}' cannot reach its target of {target_sum} (capacity {capacity})")]
    Infeasible {
        group: String,
        target_sum: f64,
        capacity: f64,
    },

    #[error("phase-one feasibility LP failed: {0}")]
    PhaseOne(String),

    #[error("phase-one feasibility LP has no solution")]
    PhaseOneInfeasible,
}

/// Result of [`optimize`]
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub status: SolverStatus,
    /// Optimized decision vector, aligned with the input units. Empty when
    /// the problem is infeasible.
    pub optimized: Vec<f64>,
    /// Predicted total cost at `optimized`
    pub objective: f64,
    /// Predicted total cost at the original decision vector
    pub initial_objective: f64,
    pub iterations: usize,
    /// Number of full objective evaluations (each re-encodes every unit)
    pub evaluations: usize,
    /// Largest bound or equality violation of `optimized`
    pub max_violation: f64,
    /// Whether the starting point had to be repaired by the phase-one LP
    pub phase_one: bool,
    pub infeasible_groups: Vec<InfeasibleGroup>,
}

impl OptimizationResult {
    /// `initial_objective - objective`; positive means cheaper
    pub fn improvement(&self) -> f64 {
        self.initial_objective - self.objective
    }

    /// The optimized vector, or the first offending group when infeasible
    pub fn into_allocation(self) -> Result<Vec<f64>, OptimizeError> {
        if self.status == SolverStatus::Infeasible {
            let first = self.infeasible_groups.into_iter().next();
            return Err(match first {
                Some(g) => OptimizeError::Infeasible {
                    group: g.group,
                    target_sum: g.target_sum,
                    capacity: g.capacity,
                },
                None => OptimizeError::Infeasible {
                    group: String::new(),
                    target_sum: f64::NAN,
                    capacity: f64::NAN,
                },
            });
        }
        Ok(self.optimized)
    }
}

/// Anything that can price a candidate allocation.
///
/// Implementations must be pure: the same units and decision vector always
/// produce the same costs. The optimizer evaluates gradient components
/// from several threads at once.
pub trait CostOracle: Sync {
    /// Predicted cost of every unit with decision values taken from `decision`
    fn unit_costs(&self, units: &[DecisionUnit], decision: &[f64]) -> Result<Vec<f64>, PipelineError>;
}

impl CostOracle for FittedPipeline {
    fn unit_costs(&self, units: &[DecisionUnit], decision: &[f64]) -> Result<Vec<f64>, PipelineError> {
        self.predict(units, decision)
    }
}

/// Minimize the summed predicted cost over all feasible reallocations.
///
/// Alignment and encoding problems are errors. An unreachable group target
/// is not: it yields a result with status [`SolverStatus::Infeasible`] and
/// no vector, without clipping anything.
pub fn optimize<O: CostOracle + ?Sized>(
    oracle: &O,
    units: &[DecisionUnit],
    constraints: &[GroupConstraint],
    config: &OptimizerConfig,
) -> Result<OptimizationResult, OptimizeError> {
    check_alignment(units, constraints)?;

    let original = decision_vector(units);
    let initial_objective = oracle.unit_costs(units, &original)?.iter().sum::<f64>();

    let unreachable: Vec<&GroupConstraint> =
        constraints.iter().filter(|c| !c.is_feasible(units)).collect();
    if !unreachable.is_empty() {
        return Ok(infeasible_result(&unreachable, units, initial_objective));
    }

    let upper: Vec<f64> = units.iter().map(|u| u.bounds().1).collect();

    let needs_repair = max_violation(&original, &upper, constraints) > config.constraint_tolerance;
    let start = if needs_repair {
        let repaired = match restore_feasibility(&original, &upper, constraints) {
            Ok(x) => x,
            // Targets at capacity can still defeat the LP's primal tolerance
            Err(OptimizeError::PhaseOneInfeasible) => {
                let tight = tight_groups(constraints, units, config.constraint_tolerance);
                return Ok(infeasible_result(&tight, units, initial_objective));
            }
            Err(e) => return Err(e),
        };
        // Polish the LP output so the group sums hold to rounding
        project(&repaired, &upper, constraints)
    } else {
        original
    };

    let mut result = sqp::minimize(oracle, units, constraints, &upper, start, config)?;
    result.initial_objective = initial_objective;
    result.evaluations += 1;
    result.phase_one = needs_repair;
    Ok(result)
}

/// Groups whose target sits within `tolerance` (relative) of their capacity,
/// or every group when none does
fn tight_groups<'a>(
    constraints: &'a [GroupConstraint],
    units: &[DecisionUnit],
    tolerance: f64,
) -> Vec<&'a GroupConstraint> {
    let tight: Vec<&GroupConstraint> = constraints
        .iter()
        .filter(|c| {
            let capacity = c.capacity(units);
            capacity - c.target_sum <= tolerance * capacity.abs().max(1.0)
        })
        .collect();
    if tight.is_empty() {
        constraints.iter().collect()
    } else {
        tight
    }
}

fn infeasible_result(
    groups: &[&GroupConstraint],
    units: &[DecisionUnit],
    initial_objective: f64,
) -> OptimizationResult {
    OptimizationResult {
        status: SolverStatus::Infeasible,
        optimized: Vec::new(),
        objective: initial_objective,
        initial_objective,
        iterations: 0,
        evaluations: 1,
        max_violation: f64::NAN,
        phase_one: false,
        infeasible_groups: groups
            .iter()
            .map(|c| InfeasibleGroup {
                group: c.group.clone(),
                target_sum: c.target_sum,
                capacity: c.capacity(units),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Σ (x_i - ideal_i)²
    struct Quadratic {
        ideal: Vec<f64>,
    }

    impl CostOracle for Quadratic {
        fn unit_costs(&self, _units: &[DecisionUnit], decision: &[f64]) -> Result<Vec<f64>, PipelineError> {
            Ok(decision
                .iter()
                .zip(&self.ideal)
                .map(|(x, c)| (x - c).powi(2))
                .collect())
        }
    }

    fn unit(supplier: &str, week: u32, volume: f64, capacity: f64) -> DecisionUnit {
        DecisionUnit {
            supplier: supplier.to_string(),
            year: 2024,
            week,
            fuel_surcharge: 1.0,
            max_capacity: capacity,
            logistics_cost: 0.0,
            packages_ordered: volume,
            record_count: 1,
        }
    }

    fn constraint(group: &str, indices: Vec<usize>, target_sum: f64) -> GroupConstraint {
        GroupConstraint {
            group: group.to_string(),
            indices,
            target_sum,
        }
    }

    #[test]
    fn test_quadratic_converges_to_equal_marginal_cost() {
        let units = vec![
            unit("A", 1, 30.0, 100.0),
            unit("A", 2, 30.0, 100.0),
            unit("A", 3, 30.0, 100.0),
        ];
        let constraints = vec![constraint("A", vec![0, 1, 2], 90.0)];
        let oracle = Quadratic {
            ideal: vec![10.0, 20.0, 30.0],
        };

        let result = optimize(&oracle, &units, &constraints, &OptimizerConfig::default()).unwrap();

        assert_eq!(result.status, SolverStatus::Converged);
        assert!(!result.phase_one);
        let x = &result.optimized;
        assert!((x[0] - 20.0).abs() < 0.1);
        assert!((x[1] - 30.0).abs() < 0.1);
        assert!((x[2] - 40.0).abs() < 0.1);
        assert!((x.iter().sum::<f64>() - 90.0).abs() < 1e-6);
        assert!(result.objective < result.initial_objective);
        assert!((result.initial_objective - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_over_capacity_start_is_repaired_then_optimized() {
        let units = vec![
            unit("A", 1, 10.0, 15.0),
            unit("A", 2, 20.0, 15.0),
            unit("B", 1, 5.0, 50.0),
        ];
        let constraints = vec![constraint("A", vec![0, 1], 30.0), constraint("B", vec![2], 5.0)];
        let oracle = Quadratic {
            ideal: vec![0.0, 0.0, 0.0],
        };

        let result = optimize(&oracle, &units, &constraints, &OptimizerConfig::default()).unwrap();

        assert!(result.phase_one);
        let x = result.into_allocation().unwrap();
        assert!((x[0] + x[1] - 30.0).abs() < 1e-3);
        assert_eq!(x[2], 5.0);
        assert!(x.iter().zip(&units).all(|(v, u)| *v >= 0.0 && *v <= u.max_capacity));
    }

    #[test]
    fn test_unreachable_target_is_infeasible() {
        let units = vec![unit("A", 1, 20.0, 25.0), unit("A", 2, 80.0, 25.0)];
        let constraints = vec![constraint("A", vec![0, 1], 100.0)];
        let oracle = Quadratic {
            ideal: vec![0.0, 0.0],
        };

        let result = optimize(&oracle, &units, &constraints, &OptimizerConfig::default()).unwrap();

        assert_eq!(result.status, SolverStatus::Infeasible);
        assert!(result.optimized.is_empty());
        assert_eq!(
            result.infeasible_groups,
            vec![InfeasibleGroup {
                group: "A".to_string(),
                target_sum: 100.0,
                capacity: 50.0,
            }]
        );
        match result.into_allocation() {
            Err(OptimizeError::Infeasible { group, capacity, .. }) => {
                assert_eq!(group, "A");
                assert_eq!(capacity, 50.0);
            }
            other => panic!("expected infeasible error, got {:?}", other),
        }
    }

    #[test]
    fn test_target_just_above_capacity_is_infeasible() {
        // Within constraint_tolerance of capacity, but still unreachable
        let units = vec![unit("A", 1, 30.0, 25.0), unit("A", 2, 20.0000005, 25.0)];
        let constraints = vec![constraint("A", vec![0, 1], 50.0000005)];
        let oracle = Quadratic {
            ideal: vec![0.0, 0.0],
        };

        let result = optimize(&oracle, &units, &constraints, &OptimizerConfig::default()).unwrap();

        assert_eq!(result.status, SolverStatus::Infeasible);
        assert!(result.optimized.is_empty());
        assert_eq!(result.infeasible_groups.len(), 1);
        assert_eq!(result.infeasible_groups[0].capacity, 50.0);
        assert!(matches!(
            result.into_allocation(),
            Err(OptimizeError::Infeasible { ref group, .. }) if group == "A"
        ));
    }

    #[test]
    fn test_tight_groups_prefers_groups_at_capacity() {
        let units = vec![
            unit("A", 1, 25.0, 25.0),
            unit("A", 2, 25.0, 25.0),
            unit("B", 1, 5.0, 50.0),
        ];
        let constraints = vec![constraint("A", vec![0, 1], 50.0), constraint("B", vec![2], 5.0)];

        let tight = tight_groups(&constraints, &units, 1e-6);
        assert_eq!(tight.len(), 1);
        assert_eq!(tight[0].group, "A");

        let slack = vec![constraint("B", vec![2], 5.0)];
        assert_eq!(tight_groups(&slack, &units, 1e-6).len(), 1);
    }

    #[test]
    fn test_single_member_group_keeps_target() {
        let units = vec![unit("S", 1, 12.5, 40.0)];
        let constraints = vec![constraint("S", vec![0], 12.5)];
        let oracle = Quadratic { ideal: vec![0.0] };

        let result = optimize(&oracle, &units, &constraints, &OptimizerConfig::default()).unwrap();
        assert_eq!(result.optimized, vec![12.5]);
    }

    #[test]
    fn test_optimal_start_is_left_in_place() {
        let units = vec![unit("A", 1, 20.0, 100.0), unit("A", 2, 30.0, 100.0)];
        let constraints = vec![constraint("A", vec![0, 1], 50.0)];
        let oracle = Quadratic {
            ideal: vec![15.0, 25.0],
        };

        let result = optimize(&oracle, &units, &constraints, &OptimizerConfig::default()).unwrap();
        assert_eq!(result.status, SolverStatus::Converged);
        assert!((result.optimized[0] - 20.0).abs() < 1e-3);
        assert!((result.optimized[1] - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_iterations_hits_limit() {
        let units = vec![unit("A", 1, 30.0, 100.0), unit("A", 2, 30.0, 100.0)];
        let constraints = vec![constraint("A", vec![0, 1], 60.0)];
        let oracle = Quadratic {
            ideal: vec![0.0, 60.0],
        };
        let config = OptimizerConfig {
            max_iterations: 0,
            ..OptimizerConfig::default()
        };

        let result = optimize(&oracle, &units, &constraints, &config).unwrap();
        assert_eq!(result.status, SolverStatus::IterationLimit);
        assert_eq!(result.optimized, vec![30.0, 30.0]);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_misaligned_constraints_rejected() {
        let units = vec![unit("A", 1, 1.0, 10.0), unit("B", 1, 1.0, 10.0)];
        let constraints = vec![constraint("A", vec![0, 1], 2.0)];
        let oracle = Quadratic {
            ideal: vec![0.0, 0.0],
        };

        let err = optimize(&oracle, &units, &constraints, &OptimizerConfig::default()).unwrap_err();
        assert!(matches!(err, OptimizeError::Pipeline(PipelineError::Misaligned(_))));
    }
}

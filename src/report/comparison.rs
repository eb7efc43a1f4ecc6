//! Re-scoring of original vs optimized allocations

use serde::Serialize;

use crate::optimizer::CostOracle;
use crate::pipeline::{check_alignment, decision_vector, DecisionUnit, GroupConstraint, PipelineError};

/// Predicted cost figures for one supplier group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub group: String,
    pub units: usize,
    pub original_cost: f64,
    pub optimized_cost: f64,
    /// `original_cost - optimized_cost`, negative when the reallocation costs more
    pub savings: f64,
    pub mean_original_cost: f64,
    pub mean_optimized_cost: f64,
    pub original_volume: f64,
    pub optimized_volume: f64,
}

impl GroupComparison {
    /// Savings as a percentage of the original cost
    pub fn savings_pct(&self) -> f64 {
        if self.original_cost.abs() > f64::EPSILON {
            self.savings / self.original_cost * 100.0
        } else {
            0.0
        }
    }
}

/// Per-group and total comparison, groups sorted by savings descending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub groups: Vec<GroupComparison>,
    pub total_original_cost: f64,
    pub total_optimized_cost: f64,
    pub total_savings: f64,
    /// Predicted cost per unit at the original allocation, unit order
    #[serde(skip)]
    pub original_unit_costs: Vec<f64>,
    /// Predicted cost per unit at the optimized allocation, unit order
    #[serde(skip)]
    pub optimized_unit_costs: Vec<f64>,
}

impl ComparisonReport {
    pub fn total_savings_pct(&self) -> f64 {
        if self.total_original_cost.abs() > f64::EPSILON {
            self.total_savings / self.total_original_cost * 100.0
        } else {
            0.0
        }
    }
}

/// Price both allocations through the same encode + predict path and
/// aggregate the figures per group.
pub fn compare<O: CostOracle + ?Sized>(
    oracle: &O,
    units: &[DecisionUnit],
    constraints: &[GroupConstraint],
    optimized: &[f64],
) -> Result<ComparisonReport, PipelineError> {
    check_alignment(units, constraints)?;

    let original = decision_vector(units);
    let original_unit_costs = oracle.unit_costs(units, &original)?;
    let optimized_unit_costs = oracle.unit_costs(units, optimized)?;

    let mut groups: Vec<GroupComparison> = constraints
        .iter()
        .map(|c| {
            let sum = |values: &[f64]| c.indices.iter().map(|&i| values[i]).sum::<f64>();
            let count = c.indices.len();
            let original_cost = sum(&original_unit_costs);
            let optimized_cost = sum(&optimized_unit_costs);
            GroupComparison {
                group: c.group.clone(),
                units: count,
                original_cost,
                optimized_cost,
                savings: original_cost - optimized_cost,
                mean_original_cost: original_cost / count as f64,
                mean_optimized_cost: optimized_cost / count as f64,
                original_volume: sum(&original),
                optimized_volume: sum(optimized),
            }
        })
        .collect();

    groups.sort_by(|a, b| b.savings.total_cmp(&a.savings).then_with(|| a.group.cmp(&b.group)));

    let total_original_cost: f64 = original_unit_costs.iter().sum();
    let total_optimized_cost: f64 = optimized_unit_costs.iter().sum();

    Ok(ComparisonReport {
        groups,
        total_original_cost,
        total_optimized_cost,
        total_savings: total_original_cost - total_optimized_cost,
        original_unit_costs,
        optimized_unit_costs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cost equals volume squared
    struct Squared;

    impl CostOracle for Squared {
        fn unit_costs(&self, _units: &[DecisionUnit], decision: &[f64]) -> Result<Vec<f64>, PipelineError> {
            Ok(decision.iter().map(|x| x * x).collect())
        }
    }

    fn unit(supplier: &str, week: u32, volume: f64) -> DecisionUnit {
        DecisionUnit {
            supplier: supplier.to_string(),
            year: 2024,
            week,
            fuel_surcharge: 1.0,
            max_capacity: 100.0,
            logistics_cost: 0.0,
            packages_ordered: volume,
            record_count: 1,
        }
    }

    fn fixture() -> (Vec<DecisionUnit>, Vec<GroupConstraint>) {
        let units = vec![unit("A", 1, 10.0), unit("A", 2, 20.0), unit("B", 1, 5.0)];
        let constraints = crate::pipeline::build_group_constraints(&units);
        (units, constraints)
    }

    #[test]
    fn test_group_figures_and_ordering() {
        let (units, constraints) = fixture();
        let report = compare(&Squared, &units, &constraints, &[15.0, 15.0, 5.0]).unwrap();

        // A: 100 + 400 = 500 -> 225 + 225 = 450; B unchanged
        assert_eq!(report.groups[0].group, "A");
        assert_eq!(report.groups[0].original_cost, 500.0);
        assert_eq!(report.groups[0].optimized_cost, 450.0);
        assert_eq!(report.groups[0].savings, 50.0);
        assert_eq!(report.groups[0].mean_optimized_cost, 225.0);
        assert_eq!(report.groups[0].original_volume, 30.0);
        assert_eq!(report.groups[0].optimized_volume, 30.0);
        assert_eq!(report.groups[1].savings, 0.0);
        assert_eq!(report.total_savings, 50.0);
        assert_eq!(report.total_savings_pct(), 50.0 / 525.0 * 100.0);
    }

    #[test]
    fn test_negative_savings_reported_as_observed() {
        let (units, constraints) = fixture();
        let report = compare(&Squared, &units, &constraints, &[0.0, 30.0, 5.0]).unwrap();
        assert_eq!(report.groups[0].group, "B");
        assert_eq!(report.groups[1].savings, 500.0 - 900.0);
        assert!(report.total_savings < 0.0);
    }

    #[test]
    fn test_compare_is_repeatable() {
        let (units, constraints) = fixture();
        let a = compare(&Squared, &units, &constraints, &[12.0, 18.0, 5.0]).unwrap();
        let b = compare(&Squared, &units, &constraints, &[12.0, 18.0, 5.0]).unwrap();
        assert_eq!(a, b);
    }
}

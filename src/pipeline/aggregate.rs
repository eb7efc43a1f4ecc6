//! Weekly aggregation of shipment records into decision units
//!
//! Records are grouped by (supplier, year, week). Additive quantities are
//! summed, rate-like quantities are averaged. The output ordering is sorted by
//! the grouping key so that decision indices are reproducible run to run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::loader::ShipmentRecord;

/// One (supplier, week) decision row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionUnit {
    pub supplier: String,
    pub year: i32,
    pub week: u32,
    /// Mean fuel surcharge over the aggregated records
    pub fuel_surcharge: f64,
    /// Mean capacity, used as the upper bound of the decision value
    pub max_capacity: f64,
    /// Summed logistics cost (training target)
    pub logistics_cost: f64,
    /// Summed shipment volume - the decision value
    pub packages_ordered: f64,
    /// Number of raw records folded into this unit
    pub record_count: usize,
}

impl DecisionUnit {
    /// Bounds of the decision value
    pub fn bounds(&self) -> (f64, f64) {
        (0.0, self.max_capacity)
    }
}

/// Equality constraint tying a supplier's decision values to a fixed total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConstraint {
    pub group: String,
    /// Indices into the decision vector, ascending
    pub indices: Vec<usize>,
    pub target_sum: f64,
}

impl GroupConstraint {
    /// `sum(x[indices]) - target_sum`
    pub fn residual(&self, x: &[f64]) -> f64 {
        self.indices.iter().map(|&i| x[i]).sum::<f64>() - self.target_sum
    }

    /// Sum of the members' upper bounds
    pub fn capacity(&self, units: &[DecisionUnit]) -> f64 {
        self.indices.iter().map(|&i| units[i].max_capacity).sum()
    }

    /// Whether the target is reachable within the members' bounds. No slack:
    /// the phase-one LP enforces the bounds and the sum exactly.
    pub fn is_feasible(&self, units: &[DecisionUnit]) -> bool {
        self.target_sum >= 0.0 && self.target_sum <= self.capacity(units)
    }
}

/// Output of an aggregation pass
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub units: Vec<DecisionUnit>,
    pub constraints: Vec<GroupConstraint>,
}

impl Aggregation {
    /// The original decision vector, aligned with `units`
    pub fn decision_vector(&self) -> Vec<f64> {
        decision_vector(&self.units)
    }
}

#[derive(Default)]
struct Accumulator {
    fuel_sum: f64,
    capacity_sum: f64,
    cost_sum: f64,
    packages_sum: f64,
    count: usize,
}

/// Group raw records into decision units and per-supplier volume constraints
pub fn aggregate(records: &[ShipmentRecord]) -> Result<Aggregation, PipelineError> {
    if records.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let mut groups: BTreeMap<(String, i32, u32), Accumulator> = BTreeMap::new();
    for record in records {
        let acc = groups
            .entry((record.supplier.clone(), record.year, record.week))
            .or_default();
        acc.fuel_sum += record.fuel_surcharge;
        acc.capacity_sum += record.max_capacity;
        acc.cost_sum += record.logistics_cost;
        acc.packages_sum += record.packages_ordered;
        acc.count += 1;
    }

    let units: Vec<DecisionUnit> = groups
        .into_iter()
        .map(|((supplier, year, week), acc)| {
            let n = acc.count as f64;
            DecisionUnit {
                supplier,
                year,
                week,
                fuel_surcharge: acc.fuel_sum / n,
                max_capacity: acc.capacity_sum / n,
                logistics_cost: acc.cost_sum,
                packages_ordered: acc.packages_sum,
                record_count: acc.count,
            }
        })
        .collect();

    let constraints = build_group_constraints(&units);

    Ok(Aggregation { units, constraints })
}

/// One constraint per supplier, preserving that supplier's current total volume
pub fn build_group_constraints(units: &[DecisionUnit]) -> Vec<GroupConstraint> {
    let mut by_supplier: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, unit) in units.iter().enumerate() {
        by_supplier.entry(unit.supplier.as_str()).or_default().push(i);
    }

    by_supplier
        .into_iter()
        .map(|(supplier, indices)| {
            let target_sum = indices.iter().map(|&i| units[i].packages_ordered).sum();
            GroupConstraint {
                group: supplier.to_string(),
                indices,
                target_sum,
            }
        })
        .collect()
}

/// Extract the current decision values in unit order
pub fn decision_vector(units: &[DecisionUnit]) -> Vec<f64> {
    units.iter().map(|u| u.packages_ordered).collect()
}

/// Overwrite each unit's decision value with the optimized allocation
pub fn apply_allocation(units: &mut [DecisionUnit], allocation: &[f64]) -> Result<(), PipelineError> {
    if units.len() != allocation.len() {
        return Err(PipelineError::Misaligned(format!(
            "allocation has {} entries but there are {} decision units",
            allocation.len(),
            units.len()
        )));
    }
    for (unit, &value) in units.iter_mut().zip(allocation) {
        unit.packages_ordered = value;
    }
    Ok(())
}

/// Verify that constraints and units agree on indexing.
///
/// Every unit index must belong to exactly one group, and a group's key must
/// match the supplier of each unit it references.
pub fn check_alignment(
    units: &[DecisionUnit],
    constraints: &[GroupConstraint],
) -> Result<(), PipelineError> {
    let mut owner: Vec<Option<&str>> = vec![None; units.len()];

    for constraint in constraints {
        if constraint.indices.is_empty() {
            return Err(PipelineError::Misaligned(format!(
                "group '{}' has no members",
                constraint.group
            )));
        }
        for &i in &constraint.indices {
            let unit = units.get(i).ok_or_else(|| {
                PipelineError::Misaligned(format!(
                    "group '{}' references index {} but there are {} units",
                    constraint.group,
                    i,
                    units.len()
                ))
            })?;
            if unit.supplier != constraint.group {
                return Err(PipelineError::Misaligned(format!(
                    "index {} belongs to supplier '{}' but is listed under group '{}'",
                    i, unit.supplier, constraint.group
                )));
            }
            if let Some(previous) = owner[i] {
                return Err(PipelineError::Misaligned(format!(
                    "index {} is claimed by both '{}' and '{}'",
                    i, previous, constraint.group
                )));
            }
            owner[i] = Some(constraint.group.as_str());
        }
    }

    if let Some(i) = owner.iter().position(Option::is_none) {
        return Err(PipelineError::Misaligned(format!(
            "unit {} ('{}', {}-W{}) is not covered by any group",
            i, units[i].supplier, units[i].year, units[i].week
        )));
    }

    Ok(())
}

//! Feature encoding for decision units
//!
//! Layout of an encoded row:
//! `year, week, fuel_surcharge, packages_ordered, supplier_<id>...`
//!
//! The supplier vocabulary is fixed at fit time. The policy for suppliers
//! outside that vocabulary is stored with the fitted encoder so that training
//! and optimization-time re-encoding can never disagree.

use serde::{Deserialize, Serialize};

use super::aggregate::DecisionUnit;
use super::error::PipelineError;

/// Numeric columns preceding the supplier indicators
const NUMERIC_COLUMNS: [&str; 4] = ["year", "week", "fuel_surcharge", "packages_ordered"];

/// Column index of the decision value within an encoded row
pub const DECISION_COLUMN: usize = 3;

/// How to encode a supplier that was not seen at fit time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownCategoryPolicy {
    /// Reject the record (default)
    #[default]
    Error,
    /// Encode an all-zero indicator block
    ZeroFill,
}

impl std::fmt::Display for UnknownCategoryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnknownCategoryPolicy::Error => write!(f, "error"),
            UnknownCategoryPolicy::ZeroFill => write!(f, "zero-fill"),
        }
    }
}

impl std::str::FromStr for UnknownCategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(UnknownCategoryPolicy::Error),
            "zero-fill" | "zero_fill" | "zero" => Ok(UnknownCategoryPolicy::ZeroFill),
            _ => Err(format!(
                "Unknown category policy: '{}'. Use 'error' or 'zero-fill'.",
                s
            )),
        }
    }
}

/// Dense row-major feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build from row-major data; `data.len()` must be a multiple of `n_cols`
    pub fn new(n_cols: usize, data: Vec<f64>) -> Result<Self, PipelineError> {
        if n_cols == 0 || data.len() % n_cols != 0 {
            return Err(PipelineError::Misaligned(format!(
                "{} values cannot form rows of width {}",
                data.len(),
                n_cols
            )));
        }
        Ok(Self { n_cols, data })
    }

    /// Build from a slice of equally sized rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, PipelineError> {
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(PipelineError::Misaligned(format!(
                "row {} has {} columns, expected {}",
                i,
                row.len(),
                n_cols
            )));
        }
        Self::new(n_cols, rows.concat())
    }

    pub fn n_rows(&self) -> usize {
        self.data.len() / self.n_cols
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }
}

/// One-hot supplier encoder with pass-through numeric covariates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    /// Sorted supplier vocabulary
    vocabulary: Vec<String>,
    policy: UnknownCategoryPolicy,
}

impl FeatureEncoder {
    /// Learn the supplier vocabulary from the training units
    pub fn fit(units: &[DecisionUnit], policy: UnknownCategoryPolicy) -> Result<Self, PipelineError> {
        if units.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }
        let mut vocabulary: Vec<String> = units.iter().map(|u| u.supplier.clone()).collect();
        vocabulary.sort();
        vocabulary.dedup();
        Ok(Self { vocabulary, policy })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    /// Width of an encoded row
    pub fn n_features(&self) -> usize {
        NUMERIC_COLUMNS.len() + self.vocabulary.len()
    }

    /// Encode units using their own current decision values
    pub fn encode_units(&self, units: &[DecisionUnit]) -> Result<FeatureMatrix, PipelineError> {
        let decision: Vec<f64> = units.iter().map(|u| u.packages_ordered).collect();
        self.encode(units, &decision)
    }

    /// Encode units with the decision value of row `i` taken from `decision[i]`
    pub fn encode(&self, units: &[DecisionUnit], decision: &[f64]) -> Result<FeatureMatrix, PipelineError> {
        if units.len() != decision.len() {
            return Err(PipelineError::Misaligned(format!(
                "decision vector has {} entries but there are {} decision units",
                decision.len(),
                units.len()
            )));
        }

        let width = self.n_features();
        let mut data = Vec::with_capacity(units.len() * width);

        for (unit, &value) in units.iter().zip(decision) {
            data.push(unit.year as f64);
            data.push(unit.week as f64);
            data.push(unit.fuel_surcharge);
            data.push(value);

            let slot = self.category_slot(&unit.supplier)?;
            let start = data.len();
            data.resize(start + self.vocabulary.len(), 0.0);
            if let Some(k) = slot {
                data[start + k] = 1.0;
            }
        }

        FeatureMatrix::new(width, data)
    }

    /// Indicator position of a supplier, or `None` for a zero-filled unknown
    fn category_slot(&self, supplier: &str) -> Result<Option<usize>, PipelineError> {
        match self.vocabulary.binary_search_by(|v| v.as_str().cmp(supplier)) {
            Ok(k) => Ok(Some(k)),
            Err(_) => match self.policy {
                UnknownCategoryPolicy::ZeroFill => Ok(None),
                UnknownCategoryPolicy::Error => Err(PipelineError::UnknownCategory {
                    supplier: supplier.to_string(),
                    vocabulary: self.vocabulary.clone(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(supplier: &str, week: u32, packages: f64) -> DecisionUnit {
        DecisionUnit {
            supplier: supplier.to_string(),
            year: 2024,
            week,
            fuel_surcharge: 0.15,
            max_capacity: 500.0,
            logistics_cost: 1000.0,
            packages_ordered: packages,
            record_count: 1,
        }
    }

    #[test]
    fn test_fit_sorts_and_dedups_vocabulary() {
        let units = vec![unit("C", 1, 1.0), unit("A", 1, 1.0), unit("C", 2, 1.0)];
        let encoder = FeatureEncoder::fit(&units, UnknownCategoryPolicy::Error).unwrap();
        assert_eq!(encoder.vocabulary(), &["A".to_string(), "C".to_string()]);
        assert_eq!(encoder.n_features(), 6);
    }

    #[test]
    fn test_encode_layout() {
        let units = vec![unit("A", 3, 10.0), unit("B", 4, 20.0)];
        let encoder = FeatureEncoder::fit(&units, UnknownCategoryPolicy::Error).unwrap();
        let x = encoder.encode(&units, &[11.0, 22.0]).unwrap();

        assert_eq!(x.n_rows(), 2);
        assert_eq!(x.row(0), &[2024.0, 3.0, 0.15, 11.0, 1.0, 0.0]);
        assert_eq!(x.row(1), &[2024.0, 4.0, 0.15, 22.0, 0.0, 1.0]);
        assert_eq!(x.get(1, DECISION_COLUMN), 22.0);
    }

    #[test]
    fn test_unknown_supplier_error_policy() {
        let encoder = FeatureEncoder::fit(&[unit("A", 1, 1.0)], UnknownCategoryPolicy::Error).unwrap();
        let err = encoder.encode_units(&[unit("Z", 1, 1.0)]).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCategory { .. }));
    }

    #[test]
    fn test_unknown_supplier_zero_fill_policy() {
        let encoder = FeatureEncoder::fit(&[unit("A", 1, 1.0)], UnknownCategoryPolicy::ZeroFill).unwrap();
        let x = encoder.encode_units(&[unit("Z", 1, 5.0)]).unwrap();
        assert_eq!(x.row(0), &[2024.0, 1.0, 0.15, 5.0, 0.0]);
    }

    #[test]
    fn test_encode_rejects_misaligned_decision_vector() {
        let units = vec![unit("A", 1, 1.0), unit("A", 2, 1.0)];
        let encoder = FeatureEncoder::fit(&units, UnknownCategoryPolicy::Error).unwrap();
        assert!(matches!(
            encoder.encode(&units, &[1.0]),
            Err(PipelineError::Misaligned(_))
        ));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("error".parse::<UnknownCategoryPolicy>().unwrap(), UnknownCategoryPolicy::Error);
        assert_eq!("Zero-Fill".parse::<UnknownCategoryPolicy>().unwrap(), UnknownCategoryPolicy::ZeroFill);
        assert!("drop".parse::<UnknownCategoryPolicy>().is_err());
    }

    #[test]
    fn test_feature_matrix_from_rows_rejects_ragged() {
        assert!(FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
        let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }
}

use crate::error::{CalculatorError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Team-size category selecting one column of the rate table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TeamSizeBucket {
    pub id: String,
    pub label: String,
}

impl TeamSizeBucket {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

/// Savings rates indexed by `[bracket][team size]`, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SavingsRateTable {
    rows: Vec<Vec<f64>>,
}

impl SavingsRateTable {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Missing cells read as 0 so lookups stay total on an unvalidated table.
    pub fn rate(&self, bracket: usize, team_size: usize) -> f64 {
        self.rows
            .get(bracket)
            .and_then(|row| row.get(team_size))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// True when rates never decrease moving up a bracket or a team size.
    pub fn is_monotonic(&self) -> bool {
        let rows_ok = self
            .rows
            .iter()
            .all(|row| row.windows(2).all(|pair| pair[0] <= pair[1]));
        let columns_ok = self.rows.windows(2).all(|pair| {
            pair[0]
                .iter()
                .zip(pair[1].iter())
                .all(|(lower, upper)| lower <= upper)
        });
        rows_ok && columns_ok
    }

    pub(crate) fn validate(&self, bracket_count: usize, team_size_count: usize) -> Result<()> {
        if self.rows.len() != bracket_count {
            return Err(CalculatorError::rates(format!(
                "expected {bracket_count} rows (one per bracket), found {}",
                self.rows.len()
            )));
        }
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != team_size_count {
                return Err(CalculatorError::rates(format!(
                    "row {index} has {} rates, expected {team_size_count} (one per team size)",
                    row.len()
                )));
            }
            if let Some(rate) = row
                .iter()
                .find(|rate| !rate.is_finite() || **rate < 0.0 || **rate > 1.0)
            {
                return Err(CalculatorError::rates(format!(
                    "row {index} contains rate {rate} outside [0, 1]"
                )));
            }
        }
        if !self.is_monotonic() {
            log::warn!("savings rate table is not monotonic in budget and team size");
        }
        Ok(())
    }
}

use crate::bracket::{clamp_budget, find_bracket, validate_brackets, BudgetBracket};
use crate::error::{CalculatorError, Result};
use crate::rates::{SavingsRateTable, TeamSizeBucket};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Brackets, team sizes and the rate table shared by the savings and cost pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SavingsConfig {
    /// Rows follow `brackets`, columns follow `team_sizes`.
    pub rates: SavingsRateTable,
    pub brackets: Vec<BudgetBracket>,
    pub team_sizes: Vec<TeamSizeBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsInput {
    pub annual_budget_usd: f64,
    pub team_size: String,
}

impl SavingsInput {
    pub fn new(annual_budget_usd: f64, team_size: &str) -> Self {
        Self {
            annual_budget_usd,
            team_size: team_size.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsEstimate {
    pub bracket_id: String,
    pub rate: f64,
    pub annual_savings_usd: f64,
    pub monthly_savings_usd: f64,
}

/// Current spend next to what the same work costs through the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CostComparison {
    pub bracket_id: String,
    pub rate: f64,
    pub current_annual_cost_usd: f64,
    pub exchange_annual_cost_usd: f64,
    pub annual_savings_usd: f64,
    pub monthly_cost_usd: f64,
}

impl SavingsConfig {
    pub fn validate(&self) -> Result<()> {
        validate_brackets(&self.brackets)?;
        ensure_unique("bracket", self.brackets.iter().map(|b| b.id.as_str()))?;
        if self.team_sizes.is_empty() {
            return Err(CalculatorError::rates("at least one team size is required"));
        }
        ensure_unique("team size", self.team_sizes.iter().map(|t| t.id.as_str()))?;
        self.rates
            .validate(self.brackets.len(), self.team_sizes.len())
    }

    /// Column for `id`; unknown team sizes use the first (smallest) column.
    pub fn team_size_index(&self, id: &str) -> usize {
        self.team_sizes
            .iter()
            .position(|team| team.id == id)
            .unwrap_or(0)
    }

    fn lookup(&self, budget: f64, team_size: &str) -> (String, f64) {
        let bracket = find_bracket(&self.brackets, budget);
        let bracket_id = self
            .brackets
            .get(bracket)
            .map(|b| b.id.clone())
            .unwrap_or_default();
        let rate = self.rates.rate(bracket, self.team_size_index(team_size));
        (bracket_id, rate)
    }

    /// Brand savings: `budget × rate` per year, a twelfth of that per month.
    pub fn brand_savings(&self, input: &SavingsInput) -> SavingsEstimate {
        let budget = clamp_budget(input.annual_budget_usd);
        let (bracket_id, rate) = self.lookup(budget, &input.team_size);
        let annual_savings_usd = budget * rate;
        SavingsEstimate {
            bracket_id,
            rate,
            annual_savings_usd,
            monthly_savings_usd: annual_savings_usd / MONTHS_PER_YEAR,
        }
    }

    pub fn cost_comparison(&self, input: &SavingsInput) -> CostComparison {
        let budget = clamp_budget(input.annual_budget_usd);
        let (bracket_id, rate) = self.lookup(budget, &input.team_size);
        let exchange_annual_cost_usd = budget * (1.0 - rate);
        CostComparison {
            bracket_id,
            rate,
            current_annual_cost_usd: budget,
            exchange_annual_cost_usd,
            annual_savings_usd: budget - exchange_annual_cost_usd,
            monthly_cost_usd: exchange_annual_cost_usd / MONTHS_PER_YEAR,
        }
    }
}

pub(crate) fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CalculatorError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

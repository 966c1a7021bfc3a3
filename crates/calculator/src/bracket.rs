use crate::error::{CalculatorError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A half-open budget range `[min, max)` selecting one row of the rate table.
///
/// `max = None` marks the unbounded top bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BudgetBracket {
    pub id: String,
    pub label: String,
    pub min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl BudgetBracket {
    pub fn new(id: &str, label: &str, min: f64, max: Option<f64>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            min,
            max,
        }
    }

    /// `min` inclusive, `max` exclusive.
    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min && self.max.map_or(true, |max| amount < max)
    }
}

/// Clamp a raw budget to the calculator's domain: negative and NaN become 0.
pub fn clamp_budget(amount: f64) -> f64 {
    if amount.is_nan() || amount < 0.0 {
        0.0
    } else {
        amount
    }
}

/// Index of the bracket containing `amount`, by linear scan.
///
/// Falls back to the lowest bracket when nothing matches. A validated bracket list
/// covers `[0, ∞)` so the fallback is unreachable for clamped input.
pub fn find_bracket(brackets: &[BudgetBracket], amount: f64) -> usize {
    let amount = clamp_budget(amount);
    brackets
        .iter()
        .position(|bracket| bracket.contains(amount))
        .unwrap_or(0)
}

pub(crate) fn validate_brackets(brackets: &[BudgetBracket]) -> Result<()> {
    let Some(first) = brackets.first() else {
        return Err(CalculatorError::brackets("at least one bracket is required"));
    };
    if first.min != 0.0 {
        return Err(CalculatorError::brackets(format!(
            "first bracket '{}' must start at 0 (starts at {})",
            first.id, first.min
        )));
    }

    let last_index = brackets.len() - 1;
    for (index, bracket) in brackets.iter().enumerate() {
        if !bracket.min.is_finite() {
            return Err(CalculatorError::brackets(format!(
                "bracket '{}' has a non-finite min",
                bracket.id
            )));
        }
        match (bracket.max, index == last_index) {
            (None, true) => {}
            (None, false) => {
                return Err(CalculatorError::brackets(format!(
                    "only the last bracket may be unbounded ('{}' is not last)",
                    bracket.id
                )));
            }
            (Some(_), true) => {
                return Err(CalculatorError::brackets(format!(
                    "last bracket '{}' must be unbounded",
                    bracket.id
                )));
            }
            (Some(max), false) => {
                if !max.is_finite() || max <= bracket.min {
                    return Err(CalculatorError::brackets(format!(
                        "bracket '{}' is empty or inverted ({}..{})",
                        bracket.id, bracket.min, max
                    )));
                }
                let next = &brackets[index + 1];
                if next.min != max {
                    return Err(CalculatorError::brackets(format!(
                        "bracket '{}' ends at {} but '{}' starts at {}",
                        bracket.id, max, next.id, next.min
                    )));
                }
            }
        }
    }

    Ok(())
}

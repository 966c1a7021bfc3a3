use crate::error::{CalculatorError, Result};
use crate::savings::{ensure_unique, MONTHS_PER_YEAR};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// A stage of the marketing workflow; `weight` is its share of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WorkflowPhase {
    pub id: String,
    pub label: String,
    pub weight: f64,
}

/// Slider bounds for a client-count input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SliderBounds {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

/// A client-size category used to project query volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClientTier {
    pub id: String,
    pub label: String,
    pub active_users_per_client: f64,
    pub avg_queries_per_user_per_month: f64,
    pub slider: SliderBounds,
}

impl ClientTier {
    pub fn queries_per_client(&self) -> f64 {
        self.active_users_per_client * self.avg_queries_per_user_per_month
    }
}

/// Per-page constants of the provider earnings calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EarningsConfig {
    pub id: String,
    pub currency: String,
    pub payout_per_query: f64,
    #[serde(default = "default_multiplier")]
    pub currency_multiplier: f64,
    /// Fraction of requested queries answerable from the provider's data.
    pub useful_data_factor: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl EarningsConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| CalculatorError::InvalidEarnings {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        for (name, value) in [
            ("payout_per_query", self.payout_per_query),
            ("currency_multiplier", self.currency_multiplier),
            ("useful_data_factor", self.useful_data_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(&format!("{name} must be a finite non-negative number")));
            }
        }
        if self.useful_data_factor > 1.0 {
            return Err(invalid("useful_data_factor must be within [0, 1]"));
        }
        if self.currency.trim().is_empty() {
            return Err(invalid("currency must be non-empty"));
        }
        Ok(())
    }
}

/// Which phases are toggled on. Accepts either a list of ids or an id → bool map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PhaseSelection {
    Ids(BTreeSet<String>),
    Toggles(BTreeMap<String, bool>),
}

impl Default for PhaseSelection {
    fn default() -> Self {
        Self::Ids(BTreeSet::new())
    }
}

impl PhaseSelection {
    pub fn is_selected(&self, id: &str) -> bool {
        match self {
            Self::Ids(ids) => ids.contains(id),
            Self::Toggles(toggles) => toggles.get(id).copied().unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct EarningsInput {
    #[serde(default)]
    pub selected_phases: PhaseSelection,
    #[serde(default)]
    pub client_counts: BTreeMap<String, u32>,
}

impl EarningsInput {
    pub fn new<'a>(
        phases: impl IntoIterator<Item = &'a str>,
        counts: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Self {
        Self {
            selected_phases: PhaseSelection::Ids(
                phases.into_iter().map(str::to_string).collect(),
            ),
            client_counts: counts
                .into_iter()
                .map(|(tier, count)| (tier.to_string(), count))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EarningsEstimate {
    pub variant: String,
    pub currency: String,
    pub phase_factor: f64,
    pub expected_monthly_queries: f64,
    pub gross_payout: f64,
    pub estimated_monthly: f64,
    pub estimated_annual: f64,
}

/// Sum of the weights of the selected phases, 0 when none are on.
pub fn phase_factor(phases: &[WorkflowPhase], selection: &PhaseSelection) -> f64 {
    phases
        .iter()
        .filter(|phase| selection.is_selected(&phase.id))
        .map(|phase| phase.weight)
        .sum()
}

/// Projected monthly queries across tiers; ids without a tier contribute nothing.
pub fn expected_monthly_queries(tiers: &[ClientTier], counts: &BTreeMap<String, u32>) -> f64 {
    tiers
        .iter()
        .map(|tier| {
            let count = counts.get(&tier.id).copied().unwrap_or(0);
            f64::from(count) * tier.queries_per_client()
        })
        .sum()
}

pub fn estimate_earnings(
    phases: &[WorkflowPhase],
    tiers: &[ClientTier],
    config: &EarningsConfig,
    input: &EarningsInput,
) -> EarningsEstimate {
    let phase_factor = phase_factor(phases, &input.selected_phases);
    let expected_monthly_queries = expected_monthly_queries(tiers, &input.client_counts);
    let gross_payout =
        expected_monthly_queries * config.payout_per_query * config.currency_multiplier;
    let usable_payout = gross_payout * config.useful_data_factor;
    let estimated_monthly = usable_payout * phase_factor;

    EarningsEstimate {
        variant: config.id.clone(),
        currency: config.currency.clone(),
        phase_factor,
        expected_monthly_queries,
        gross_payout,
        estimated_monthly,
        estimated_annual: estimated_monthly * MONTHS_PER_YEAR,
    }
}

pub(crate) fn validate_phases(phases: &[WorkflowPhase]) -> Result<()> {
    if phases.is_empty() {
        return Err(CalculatorError::phases("at least one phase is required"));
    }
    ensure_unique("phase", phases.iter().map(|p| p.id.as_str()))?;
    if let Some(phase) = phases
        .iter()
        .find(|p| !p.weight.is_finite() || p.weight < 0.0 || p.weight > 1.0)
    {
        return Err(CalculatorError::phases(format!(
            "phase '{}' has weight {} outside [0, 1]",
            phase.id, phase.weight
        )));
    }
    let total: f64 = phases.iter().map(|p| p.weight).sum();
    if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(CalculatorError::phases(format!(
            "weights must sum to 1.0, found {total}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_tiers(tiers: &[ClientTier]) -> Result<()> {
    ensure_unique("tier", tiers.iter().map(|t| t.id.as_str()))?;
    for tier in tiers {
        let invalid = |reason: &str| CalculatorError::InvalidTier {
            id: tier.id.clone(),
            reason: reason.to_string(),
        };
        if !tier.active_users_per_client.is_finite() || tier.active_users_per_client < 0.0 {
            return Err(invalid("active_users_per_client must be finite and non-negative"));
        }
        if !tier.avg_queries_per_user_per_month.is_finite()
            || tier.avg_queries_per_user_per_month < 0.0
        {
            return Err(invalid(
                "avg_queries_per_user_per_month must be finite and non-negative",
            ));
        }
        if tier.slider.min > tier.slider.max || tier.slider.step == 0 {
            return Err(invalid("slider bounds need min <= max and a non-zero step"));
        }
    }
    Ok(())
}
